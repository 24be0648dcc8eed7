use async_trait::async_trait;

use super::noop::NoopLedger;
use super::simulated::SimulatedLedger;
use crate::config::LedgerType;
use crate::error::LedgerError;
use crate::traits::LedgerGateway;
use crate::types::{Address, Query, QueryResult, StatusReport, TransactionId, TransactionKind};

/// Enum representing all built-in ledger gateway implementations.
#[derive(Clone)]
pub enum LedgerGatewayVariant {
    Simulated(SimulatedLedger),
    Noop(NoopLedger),
}

impl LedgerGatewayVariant {
    /// Create a new gateway instance based on the specified type.
    pub fn new(ledger_type: LedgerType) -> Self {
        match ledger_type {
            LedgerType::Simulated => LedgerGatewayVariant::Simulated(SimulatedLedger::new()),
            LedgerType::Noop => LedgerGatewayVariant::Noop(NoopLedger::new()),
        }
    }
}

#[async_trait]
impl LedgerGateway for LedgerGatewayVariant {
    fn name(&self) -> &'static str {
        match self {
            LedgerGatewayVariant::Simulated(inner) => inner.name(),
            LedgerGatewayVariant::Noop(inner) => inner.name(),
        }
    }

    async fn query(&self, account: &Address, query: &Query) -> Result<QueryResult, LedgerError> {
        match self {
            LedgerGatewayVariant::Simulated(inner) => inner.query(account, query).await,
            LedgerGatewayVariant::Noop(inner) => inner.query(account, query).await,
        }
    }

    async fn submit(
        &self,
        kind: &TransactionKind,
        signer: &Address,
    ) -> Result<TransactionId, LedgerError> {
        match self {
            LedgerGatewayVariant::Simulated(inner) => inner.submit(kind, signer).await,
            LedgerGatewayVariant::Noop(inner) => inner.submit(kind, signer).await,
        }
    }

    async fn poll_status(&self, id: &TransactionId) -> Result<StatusReport, LedgerError> {
        match self {
            LedgerGatewayVariant::Simulated(inner) => inner.poll_status(id).await,
            LedgerGatewayVariant::Noop(inner) => inner.poll_status(id).await,
        }
    }
}
