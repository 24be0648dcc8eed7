//! MomentSmith application context.
//!
//! - `core`: shared ledger context and the `MomentSmith` entry point that
//!   hands out reward sessions, the equip coordinator and panel views
//! - `tests`: unit tests for the wiring

pub mod core;

pub use core::{LedgerContext, MomentSmith};
