use anyhow::Result;
use async_trait::async_trait;

use crate::types::LedgerEvent;

/// Receiver for results the orchestrators emit (state transitions, sealed
/// operations, invalidated cache entries).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &'static str;

    async fn publish(&self, event: &LedgerEvent) -> Result<()>;
}
