//! Equip and unequip of accessories on moments.
//!
//! - `guard`: per-(account, asset) in-flight reservations
//! - `coordinator`: precondition check, single-transaction swap, invalidation
//! - `tests`: unit tests for the guard and the coordinator

pub mod coordinator;
pub mod guard;

pub use coordinator::{EquipAction, EquipCoordinator, EquipOutcome, EquipTicket};
pub use guard::{InFlightGuard, InFlightTable};

#[cfg(test)]
mod tests;
