use async_trait::async_trait;

use crate::error::LedgerError;
use crate::types::{Address, Query, QueryResult, StatusReport, TransactionId, TransactionKind};

/// Read/submit/poll access to the external ledger.
///
/// Implementations talk to the system of record; the core never signs or
/// executes anything itself. Transactions are irrevocable once `submit`
/// returns an id.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Gateway name for logging.
    fn name(&self) -> &'static str;

    /// Run a read-only query against settled state.
    async fn query(&self, account: &Address, query: &Query) -> Result<QueryResult, LedgerError>;

    /// Submit a transaction signed by `signer`.
    async fn submit(
        &self,
        kind: &TransactionKind,
        signer: &Address,
    ) -> Result<TransactionId, LedgerError>;

    /// Observe the current status of a submitted transaction.
    async fn poll_status(&self, id: &TransactionId) -> Result<StatusReport, LedgerError>;
}

/// Run `query` and reject results whose shape does not match its kind.
pub async fn checked_query<G: LedgerGateway + ?Sized>(
    gateway: &G,
    account: &Address,
    query: &Query,
) -> Result<QueryResult, LedgerError> {
    let result = gateway.query(account, query).await?;
    if !result.answers(query) {
        return Err(LedgerError::Malformed(format!(
            "{} returned {:?} for {:?}",
            gateway.name(),
            result,
            query
        )));
    }
    Ok(result)
}
