pub mod noop;
pub mod simulated;
pub mod variant;

pub use noop::NoopLedger;
pub use simulated::{SimulatedLedger, Submission};
pub use variant::LedgerGatewayVariant;
