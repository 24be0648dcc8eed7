use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use crate::reward::RewardState;
use crate::traits::EventSink;
use crate::types::{Address, LedgerEvent, QueryKind};

/// Mock sink for testing; clones share the recorded events.
#[derive(Clone, Default)]
pub struct MockSink {
    pub events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<LedgerEvent> {
        self.recorded().clone()
    }

    /// Events concerning `account`, in publication order.
    pub fn events_for(&self, account: Address) -> Vec<LedgerEvent> {
        self.recorded()
            .iter()
            .filter(|e| e.account() == account)
            .cloned()
            .collect()
    }

    /// Reward states announced so far, in order.
    pub fn reward_states(&self) -> Vec<RewardState> {
        self.recorded()
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::RewardTransition { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Query kinds invalidated so far, in order.
    pub fn invalidated_kinds(&self) -> Vec<QueryKind> {
        self.recorded()
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::CacheInvalidated { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    // A panicking assertion elsewhere must not hide what was recorded.
    fn recorded(&self) -> MutexGuard<'_, Vec<LedgerEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventSink for MockSink {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        self.recorded().push(event.clone());
        Ok(())
    }
}
