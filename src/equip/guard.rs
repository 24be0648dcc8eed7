use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{Address, AssetId};

type Slot = (Address, AssetId);

/// Set of (account, asset) pairs with an equip operation in flight.
///
/// Reservation is synchronous so a second caller is turned away before it
/// reaches any suspension point.
#[derive(Clone, Default)]
pub struct InFlightTable {
    slots: Arc<Mutex<HashSet<Slot>>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the pair, or `None` if it is already reserved.
    pub fn try_acquire(&self, account: Address, asset: AssetId) -> Option<InFlightGuard> {
        if !self.lock().insert((account, asset)) {
            return None;
        }
        Some(InFlightGuard {
            table: self.clone(),
            slot: (account, asset),
        })
    }

    pub fn contains(&self, account: Address, asset: AssetId) -> bool {
        self.lock().contains(&(account, asset))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its reservation on drop.
pub struct InFlightGuard {
    table: InFlightTable,
    slot: Slot,
}

impl InFlightGuard {
    pub fn asset(&self) -> AssetId {
        self.slot.1
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.table.lock().remove(&self.slot);
    }
}
