use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AssetId;

/// Raw failure detail as reported by a ledger gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("signer declined: {0}")]
    Declined(String),

    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    /// The network does not know the transaction (yet).
    #[error("not found: {0}")]
    NotFound(String),

    #[error("execution failed: {message}")]
    Execution { code: Option<u32>, message: String },

    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn execution(message: impl Into<String>) -> Self {
        LedgerError::Execution {
            code: None,
            message: message.into(),
        }
    }
}

/// Closed failure taxonomy. Control flow matches on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UserRejected,
    NoReceiptFound,
    InsufficientResource,
    PermissionDenied,
    ScriptPanic,
    NetworkError,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UserRejected => "user-rejected",
            ErrorKind::NoReceiptFound => "no-receipt-found",
            ErrorKind::InsufficientResource => "insufficient-resource",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::ScriptPanic => "script-panic",
            ErrorKind::NetworkError => "network-error",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure tagged with its taxonomy kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    /// Another equip on the same asset has not reached a terminal state.
    #[error("equip already in flight for asset {asset}")]
    Busy { asset: AssetId },

    #[error(transparent)]
    Ledger(#[from] ClassifiedError),
}

impl EquipError {
    /// Taxonomy kind of a ledger-side failure; `None` for `Busy`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EquipError::Busy { .. } => None,
            EquipError::Ledger(e) => Some(e.kind),
        }
    }
}
