// Library exports for testing and external use

pub mod cache;
pub mod classifier;
pub mod config;
pub mod equip;
pub mod error;
pub mod ledger;
pub mod momentsmith;
pub mod poller;
pub mod reward;
pub mod sink;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod view;

// Re-export commonly used types and traits
pub use cache::{CacheKey, KeyPattern, QueryCache};
pub use classifier::classify;
pub use config::{BaseConfig, LedgerType};
pub use equip::{EquipAction, EquipCoordinator, EquipOutcome, EquipTicket};
pub use error::{ClassifiedError, EquipError, ErrorKind, LedgerError};
pub use momentsmith::{LedgerContext, MomentSmith};
pub use poller::{PollPolicy, StatusEvent, StatusPoller, StatusWatch};
pub use reward::{RewardCompletion, RewardSession, RewardSessionOrchestrator, RewardState, StartOutcome};
pub use traits::{EventSink, LedgerGateway};
pub use types::{
    AccessoryId, Address, AssetId, EquipmentView, HoldingKind, LedgerEvent, Query, QueryKind,
    QueryResult, StatusReport, TransactionId, TransactionKind, TransactionStatus,
};
pub use view::{resolve_media_url, EquipPanel, ModalVisibility};

// Re-export variant enums for convenience
pub use ledger::{LedgerGatewayVariant, NoopLedger, SimulatedLedger};
pub use sink::{BlackholeSink, ChannelSink, EventSinkVariant, MockSink};
