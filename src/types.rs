use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ClassifiedError;
use crate::reward::RewardState;

/// Opaque numeric id of a primary asset ("moment").
pub type AssetId = u64;

/// Opaque numeric id of a modifier asset ("accessory").
pub type AccessoryId = u64;

/// Ledger account address: 8 bytes, rendered as `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must be 16 hex characters, got {0}")]
    Length(usize),

    #[error("invalid hex in address: {0}")]
    Hex(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        if raw.len() != 16 {
            return Err(AddressParseError::Length(raw.len()));
        }
        let bytes = hex::decode(raw).map_err(|e| AddressParseError::Hex(e.to_string()))?;
        let mut out = [0u8; 8];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

/// Identifier the ledger hands back for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; 32]);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Ledger-side transaction status, ordered by confirmation depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    Unknown = 0,
    Pending = 1,
    Finalized = 2,
    Executed = 3,
    Sealed = 4,
    Expired = 5,
}

impl TransactionStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Pending),
            2 => Some(Self::Finalized),
            3 => Some(Self::Executed),
            4 => Some(Self::Sealed),
            5 => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sealed | Self::Expired)
    }
}

/// One answer from `poll_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: TransactionStatus,
    /// Execution error reported alongside the status, if the transaction aborted.
    pub error_message: Option<String>,
}

impl StatusReport {
    pub fn ok(status: TransactionStatus) -> Self {
        Self {
            status,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldingKind {
    Moment,
    Accessory,
}

/// Read-only queries the core issues against settled ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Query {
    /// Ids of assets of the given kind owned by the account.
    Holdings(HoldingKind),
    /// Whether the account currently stores a reward Receipt.
    ReceiptExists,
    /// Display data of the accessory equipped on the given asset.
    EquipmentView(AssetId),
}

/// Query kind without parameters; the granularity of prefix invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    MomentHoldings,
    AccessoryHoldings,
    ReceiptExists,
    EquipmentView,
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        match self {
            Query::Holdings(HoldingKind::Moment) => QueryKind::MomentHoldings,
            Query::Holdings(HoldingKind::Accessory) => QueryKind::AccessoryHoldings,
            Query::ReceiptExists => QueryKind::ReceiptExists,
            Query::EquipmentView(_) => QueryKind::EquipmentView,
        }
    }
}

/// Display data of an equipped accessory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentView {
    pub accessory_id: AccessoryId,
    pub name: String,
    pub description: String,
    /// Media URL, usually `ipfs://...`.
    pub thumbnail: String,
}

/// Typed query results, one variant per query kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResult {
    Holdings(Vec<u64>),
    ReceiptExists(bool),
    Equipment(Option<EquipmentView>),
}

impl QueryResult {
    /// True when this result has the shape `query` expects.
    pub fn answers(&self, query: &Query) -> bool {
        matches!(
            (self, query),
            (QueryResult::Holdings(_), Query::Holdings(_))
                | (QueryResult::ReceiptExists(_), Query::ReceiptExists)
                | (QueryResult::Equipment(_), Query::EquipmentView(_))
        )
    }
}

/// Mutating transactions the core submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Phase one of the reward flow: store a Receipt for the signer.
    CommitReward,
    /// Phase two: consume the Receipt and deposit the outcome to `recipient`.
    RevealReward { recipient: Address },
    /// Withdraw `accessory`, install it on `asset`, return any previous one.
    Equip {
        asset: AssetId,
        accessory: AccessoryId,
    },
    /// Return the accessory equipped on `asset` to free holdings.
    Unequip { asset: AssetId },
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::CommitReward => "commit-reward",
            TransactionKind::RevealReward { .. } => "reveal-reward",
            TransactionKind::Equip { .. } => "equip",
            TransactionKind::Unequip { .. } => "unequip",
        }
    }
}

/// Results the orchestrators publish back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    RewardTransition {
        account: Address,
        state: RewardState,
        transaction: Option<TransactionId>,
    },
    RewardCompleted {
        account: Address,
        transaction: TransactionId,
        awarded: Vec<AccessoryId>,
    },
    RewardFailed {
        account: Address,
        error: ClassifiedError,
    },
    EquipSealed {
        account: Address,
        asset: AssetId,
        equipped: Option<AccessoryId>,
        displaced: Option<AccessoryId>,
        transaction: TransactionId,
    },
    CacheInvalidated {
        account: Address,
        kind: QueryKind,
    },
}

impl LedgerEvent {
    /// Account the event concerns.
    pub fn account(&self) -> Address {
        match self {
            LedgerEvent::RewardTransition { account, .. }
            | LedgerEvent::RewardCompleted { account, .. }
            | LedgerEvent::RewardFailed { account, .. }
            | LedgerEvent::EquipSealed { account, .. }
            | LedgerEvent::CacheInvalidated { account, .. } => *account,
        }
    }
}
