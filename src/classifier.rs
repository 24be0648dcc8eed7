//! Maps raw ledger failures onto the closed `ErrorKind` taxonomy.
//!
//! This is the only place that inspects ledger message text.

use std::time::Duration;

use crate::error::{ClassifiedError, ErrorKind, LedgerError};
use crate::types::{StatusReport, TransactionId};

const NO_RECEIPT: &[&str] = &["no receipt found"];

const USER_REJECTED: &[&str] = &["user rejected", "declined"];

const INSUFFICIENT: &[&str] = &[
    "could not withdraw",
    "missing nft",
    "does not exist in the collection",
];

const PERMISSION: &[&str] = &["could not borrow", "not owned", "unauthorized"];

fn mentions(message: &str, needles: &[&str]) -> bool {
    let lowered = message.to_ascii_lowercase();
    needles.iter().any(|n| lowered.contains(n))
}

fn classify_message(message: &str) -> ErrorKind {
    if mentions(message, NO_RECEIPT) {
        ErrorKind::NoReceiptFound
    } else if mentions(message, USER_REJECTED) {
        ErrorKind::UserRejected
    } else if mentions(message, INSUFFICIENT) {
        ErrorKind::InsufficientResource
    } else if mentions(message, PERMISSION) {
        ErrorKind::PermissionDenied
    } else {
        ErrorKind::ScriptPanic
    }
}

/// Classify a raw gateway failure.
pub fn classify(err: &LedgerError) -> ClassifiedError {
    let kind = match err {
        LedgerError::Declined(_) => ErrorKind::UserRejected,
        LedgerError::Unreachable(_) => ErrorKind::NetworkError,
        // Only reaches here when the caller gave up on a transaction the
        // network never learned about.
        LedgerError::NotFound(_) => ErrorKind::NetworkError,
        LedgerError::Execution { message, .. } => classify_message(message),
        LedgerError::Malformed(_) => ErrorKind::ScriptPanic,
    };
    ClassifiedError::new(kind, err.to_string())
}

/// Classify the execution error carried by a status report, if any.
pub fn classify_report(report: &StatusReport) -> Option<ClassifiedError> {
    report.error_message.as_deref().map(|message| {
        ClassifiedError::new(classify_message(message), message.to_string())
    })
}

pub fn expired(id: &TransactionId) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::ScriptPanic,
        format!("transaction {} expired before execution", id),
    )
}

pub fn timed_out(id: &TransactionId, budget: Duration) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::Timeout,
        format!(
            "transaction {} not sealed within {}s",
            id,
            budget.as_secs_f64()
        ),
    )
}
