use serde::{Deserialize, Serialize};

use crate::cache::KeyPattern;
use crate::error::ClassifiedError;
use crate::types::{AccessoryId, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardState {
    Idle,
    Committing,
    CommitSealed,
    Revealing,
    Completed,
    Failed,
}

impl RewardState {
    /// A transaction for this session may be outstanding on the ledger.
    pub fn is_in_flight(self) -> bool {
        matches!(self, RewardState::Committing | RewardState::Revealing)
    }

    /// Where a session resumes given whether the account holds a Receipt.
    pub fn derived(receipt_exists: bool) -> Self {
        if receipt_exists {
            RewardState::CommitSealed
        } else {
            RewardState::Idle
        }
    }
}

/// Snapshot of one account's reward session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSession {
    pub state: RewardState,
    pub last_error: Option<ClassifiedError>,
    /// The most recently submitted commit or reveal.
    pub transaction_id: Option<TransactionId>,
}

impl RewardSession {
    pub fn resumed(receipt_exists: bool) -> Self {
        Self {
            state: RewardState::derived(receipt_exists),
            last_error: None,
            transaction_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardCompletion {
    pub transaction: TransactionId,
    /// Accessories that appeared in the account's holdings with the reveal.
    pub awarded: Vec<AccessoryId>,
    pub invalidated: Vec<KeyPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Completed(RewardCompletion),
    /// Another `start` on this session has not finished; nothing was submitted.
    InFlight,
    /// The Receipt was gone at reveal time; the session is back at Idle.
    Reset(ClassifiedError),
    Failed(ClassifiedError),
}

impl StartOutcome {
    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            StartOutcome::Reset(e) | StartOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}
