use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Which ledger gateway `MomentSmith::initialize` wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerType {
    /// In-memory ledger with contract semantics.
    Simulated,
    /// Reads return empty state, submissions are refused.
    Noop,
}

/// Base configuration for the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// How long a cached query result is served before re-querying.
    pub query_ttl_secs: u64,

    /// Maximum cached entries; least-recently-used entries are evicted beyond it.
    pub cache_capacity: usize,

    /// Delay before the second status poll.
    pub poll_interval_ms: u64,

    /// Upper bound for the doubling poll delay.
    pub poll_max_interval_ms: u64,

    /// Polling budget per transaction.
    pub poll_timeout_secs: u64,

    /// HTTP gateway prefix used to resolve `ipfs://` media URLs.
    pub media_gateway: String,

    pub ledger_type: LedgerType,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            query_ttl_secs: 30,
            cache_capacity: 256,
            poll_interval_ms: 1000,
            poll_max_interval_ms: 4000,
            poll_timeout_secs: 60,
            media_gateway: "https://ipfs.io/ipfs/".to_string(),
            ledger_type: LedgerType::Simulated,
        }
    }
}

impl BaseConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_max_interval(&self) -> Duration {
        Duration::from_millis(self.poll_max_interval_ms.max(self.poll_interval_ms))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}
