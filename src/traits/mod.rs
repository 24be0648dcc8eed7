pub mod event_sink;
pub mod ledger_gateway;

pub use event_sink::EventSink;
pub use ledger_gateway::LedgerGateway;
