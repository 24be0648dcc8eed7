//! TTL cache over read-only ledger queries.
//!
//! Entries are keyed by (account, query). Read-your-own-writes comes from
//! explicit invalidation after a mutating transaction seals, not from a short
//! TTL. Misses on the same key are serialized so concurrent readers issue a
//! single underlying query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::classifier::classify;
use crate::error::{ClassifiedError, ErrorKind};
use crate::traits::ledger_gateway::checked_query;
use crate::traits::LedgerGateway;
use crate::types::{Address, AssetId, EquipmentView, HoldingKind, Query, QueryKind, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub account: Address,
    pub query: Query,
}

impl CacheKey {
    pub fn new(account: Address, query: Query) -> Self {
        Self { account, query }
    }
}

/// Selects cache entries to invalidate: every entry of `kind` for `account`,
/// or only the one with the exact query when `query` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPattern {
    pub account: Address,
    pub kind: QueryKind,
    pub query: Option<Query>,
}

impl KeyPattern {
    pub fn kind(account: Address, kind: QueryKind) -> Self {
        Self {
            account,
            kind,
            query: None,
        }
    }

    pub fn exact(account: Address, query: Query) -> Self {
        Self {
            account,
            kind: query.kind(),
            query: Some(query),
        }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        key.account == self.account
            && key.query.kind() == self.kind
            && self.query.map_or(true, |q| q == key.query)
    }
}

struct CacheEntry {
    value: QueryResult,
    fetched_at: Instant,
    last_used: AtomicU64,
}

pub struct QueryCache<G: LedgerGateway> {
    gateway: Arc<G>,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    flights: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    /// Bumped by every invalidation; a fetch that straddles one is not stored.
    generation: AtomicU64,
    clock: AtomicU64,
    fetches: AtomicU64,
}

impl<G: LedgerGateway> QueryCache<G> {
    pub fn new(gateway: Arc<G>, ttl: Duration, capacity: usize) -> Self {
        Self {
            gateway,
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of queries issued to the gateway so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Return the cached value if still fresh, else query the ledger and cache it.
    pub async fn get(&self, key: &CacheKey) -> Result<QueryResult, ClassifiedError> {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        let flight = {
            let mut flights = self.flights.lock().await;
            Arc::clone(flights.entry(*key).or_default())
        };
        let _turn = flight.lock().await;

        // Another reader may have filled the entry while we waited.
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let value = checked_query(self.gateway.as_ref(), &key.account, &key.query)
            .await
            .map_err(|e| classify(&e))?;

        self.store(key, value.clone(), generation).await;
        Ok(value)
    }

    /// Drop any cached value for `key` and query afresh.
    pub async fn refresh(&self, key: &CacheKey) -> Result<QueryResult, ClassifiedError> {
        self.invalidate(&KeyPattern::exact(key.account, key.query)).await;
        self.get(key).await
    }

    /// Remove every entry matching `pattern`. Returns how many were removed.
    pub async fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = entries.len();
        entries.retain(|key, _| !pattern.matches(key));
        let removed = before - entries.len();
        debug!(
            "Invalidated {} entries for account={} kind={:?}",
            removed, pattern.account, pattern.kind
        );
        removed
    }

    /// Held ids of `kind`; `fresh` bypasses any cached answer.
    pub async fn holdings(
        &self,
        account: Address,
        kind: HoldingKind,
        fresh: bool,
    ) -> Result<Vec<u64>, ClassifiedError> {
        let key = CacheKey::new(account, Query::Holdings(kind));
        match self.read(&key, fresh).await? {
            QueryResult::Holdings(ids) => Ok(ids),
            other => Err(unexpected(other)),
        }
    }

    /// Receipt existence; `fresh` bypasses any cached answer.
    pub async fn receipt_exists(
        &self,
        account: Address,
        fresh: bool,
    ) -> Result<bool, ClassifiedError> {
        let key = CacheKey::new(account, Query::ReceiptExists);
        match self.read(&key, fresh).await? {
            QueryResult::ReceiptExists(exists) => Ok(exists),
            other => Err(unexpected(other)),
        }
    }

    /// Equipment view of `asset`; `fresh` bypasses any cached answer.
    pub async fn equipment(
        &self,
        account: Address,
        asset: AssetId,
        fresh: bool,
    ) -> Result<Option<EquipmentView>, ClassifiedError> {
        let key = CacheKey::new(account, Query::EquipmentView(asset));
        match self.read(&key, fresh).await? {
            QueryResult::Equipment(view) => Ok(view),
            other => Err(unexpected(other)),
        }
    }

    async fn read(&self, key: &CacheKey, fresh: bool) -> Result<QueryResult, ClassifiedError> {
        if fresh {
            self.refresh(key).await
        } else {
            self.get(key).await
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<QueryResult> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        debug!("Cache hit for {:?} ({})", key.query, key.account);
        Some(entry.value.clone())
    }

    async fn store(&self, key: &CacheKey, value: QueryResult, generation: u64) {
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Skipping cache store for {:?}: invalidated mid-fetch", key.query);
            return;
        }
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| *k);
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.flights.lock().await.remove(&victim);
            }
        }
        entries.insert(
            *key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }
}

fn unexpected(value: QueryResult) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::ScriptPanic,
        format!("unexpected query result {:?}", value),
    )
}
