use async_trait::async_trait;

use crate::error::LedgerError;
use crate::traits::LedgerGateway;
use crate::types::{Address, Query, QueryResult, StatusReport, TransactionId, TransactionKind};

/// Ledger that holds nothing and accepts no transactions.
#[derive(Clone)]
pub struct NoopLedger;

impl NoopLedger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for NoopLedger {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn query(&self, _account: &Address, query: &Query) -> Result<QueryResult, LedgerError> {
        Ok(match query {
            Query::Holdings(_) => QueryResult::Holdings(Vec::new()),
            Query::ReceiptExists => QueryResult::ReceiptExists(false),
            Query::EquipmentView(_) => QueryResult::Equipment(None),
        })
    }

    async fn submit(
        &self,
        kind: &TransactionKind,
        signer: &Address,
    ) -> Result<TransactionId, LedgerError> {
        tracing::info!("Noop ledger refusing {} from {}", kind.label(), signer);
        Err(LedgerError::Unreachable("noop ledger accepts no transactions".into()))
    }

    async fn poll_status(&self, id: &TransactionId) -> Result<StatusReport, LedgerError> {
        Err(LedgerError::NotFound(format!("transaction {}", id)))
    }
}
