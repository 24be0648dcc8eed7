use anyhow::Result;
use async_trait::async_trait;
use kanal::AsyncSender;

use super::blackhole::BlackholeSink;
use super::channel::ChannelSink;
use super::mock::MockSink;
use crate::traits::EventSink;
use crate::types::LedgerEvent;

/// Enum representing all possible event sink implementations.
pub enum EventSinkVariant {
    Channel(ChannelSink),
    Blackhole(BlackholeSink),
    Mock(MockSink),
}

impl EventSinkVariant {
    /// Create a channel sink with a custom sender.
    pub fn new_channel(sender: AsyncSender<LedgerEvent>) -> Self {
        EventSinkVariant::Channel(ChannelSink::new(sender))
    }
}

#[async_trait]
impl EventSink for EventSinkVariant {
    fn name(&self) -> &'static str {
        match self {
            EventSinkVariant::Channel(inner) => inner.name(),
            EventSinkVariant::Blackhole(inner) => inner.name(),
            EventSinkVariant::Mock(inner) => inner.name(),
        }
    }

    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        match self {
            EventSinkVariant::Channel(inner) => inner.publish(event).await,
            EventSinkVariant::Blackhole(inner) => inner.publish(event).await,
            EventSinkVariant::Mock(inner) => inner.publish(event).await,
        }
    }
}
