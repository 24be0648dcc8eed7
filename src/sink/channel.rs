use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kanal::{AsyncSender, SendError};
use tracing::warn;

use crate::traits::EventSink;
use crate::types::LedgerEvent;

/// Sink that forwards events to a UI task over a kanal channel.
///
/// Once the receiving side is gone every further event is counted as
/// dropped and reported as an error; the flows that emitted them carry on.
pub struct ChannelSink {
    sender: AsyncSender<LedgerEvent>,
    dropped: AtomicU64,
}

impl ChannelSink {
    pub fn new(sender: AsyncSender<LedgerEvent>) -> Self {
        Self {
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    /// Events that could not be delivered so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        let Err(e) = self.sender.send(event.clone()).await else {
            return Ok(());
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped == 1 {
            warn!("Event channel stopped accepting events; dropping from now on");
        }
        Err(match e {
            SendError::ReceiveClosed => anyhow!(
                "event receiver dropped, {} event(s) lost so far",
                dropped
            ),
            SendError::Closed => anyhow!("event channel closed, {} event(s) lost so far", dropped),
        })
    }
}
