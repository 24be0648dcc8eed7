//! Two-phase commit/reveal reward flow.
//!
//! - `session`: the per-account session state machine and its outcomes
//! - `orchestrator`: drives commit, reveal and recovery against the ledger
//! - `tests`: unit tests for state derivation and transitions

pub mod orchestrator;
pub mod session;

pub use orchestrator::RewardSessionOrchestrator;
pub use session::{RewardCompletion, RewardSession, RewardState, StartOutcome};
