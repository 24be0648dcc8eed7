use anyhow::Result;
use async_trait::async_trait;
use tracing::trace;

use crate::traits::EventSink;
use crate::types::LedgerEvent;

/// Sink for headless use: events are only traced, keyed by account.
pub struct BlackholeSink;

impl BlackholeSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlackholeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for BlackholeSink {
    fn name(&self) -> &'static str {
        "blackhole"
    }

    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        trace!(account = %event.account(), "Discarding event {:?}", event);
        Ok(())
    }
}
