use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use momentsmith::cache::{CacheKey, KeyPattern, QueryCache};
use momentsmith::ledger::{NoopLedger, SimulatedLedger};
use momentsmith::types::{Address, HoldingKind, Query, QueryKind};
use momentsmith::ErrorKind;

const TTL: Duration = Duration::from_secs(30);

fn test_account(id: u8) -> Address {
    Address::new([0, 0, 0, 0, 0, 0, 0xaa, id])
}

fn setup() -> (SimulatedLedger, QueryCache<SimulatedLedger>) {
    let ledger = SimulatedLedger::new();
    let cache = QueryCache::new(Arc::new(ledger.clone()), TTL, 64);
    (ledger, cache)
}

#[tokio::test(start_paused = true)]
async fn test_repeated_get_within_ttl_queries_once() -> Result<()> {
    println!("\n=== Test: QueryCache idempotence ===\n");

    let (ledger, cache) = setup();
    let owner = test_account(1);
    ledger.add_accessory(owner, 4, "Pixel Frame");
    let key = CacheKey::new(owner, Query::Holdings(HoldingKind::Accessory));

    let first = cache.get(&key).await?;
    tokio::time::advance(Duration::from_secs(10)).await;
    let second = cache.get(&key).await?;

    assert_eq!(first, second);
    assert_eq!(ledger.query_count(), 1);
    assert_eq!(cache.fetch_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() -> Result<()> {
    let (ledger, cache) = setup();
    let owner = test_account(1);
    let key = CacheKey::new(owner, Query::Holdings(HoldingKind::Accessory));

    cache.get(&key).await?;
    ledger.add_accessory(owner, 4, "Pixel Frame");

    // Still served from cache: the ledger change is not visible yet.
    tokio::time::advance(TTL - Duration::from_millis(1)).await;
    assert_eq!(cache.holdings(owner, HoldingKind::Accessory, false).await?, Vec::<u64>::new());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cache.holdings(owner, HoldingKind::Accessory, false).await?, vec![4]);
    assert_eq!(ledger.query_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_by_kind_and_exact() -> Result<()> {
    let (ledger, cache) = setup();
    let owner = test_account(1);
    let other = test_account(2);
    ledger.add_moment(owner, 7);
    ledger.add_moment(owner, 8);
    ledger.add_moment(other, 9);

    cache.equipment(owner, 7, false).await?;
    cache.equipment(owner, 8, false).await?;
    cache.equipment(other, 9, false).await?;
    cache.holdings(owner, HoldingKind::Moment, false).await?;
    assert_eq!(cache.len().await, 4);

    let removed = cache
        .invalidate(&KeyPattern::exact(owner, Query::EquipmentView(7)))
        .await;
    assert_eq!(removed, 1);

    let removed = cache
        .invalidate(&KeyPattern::kind(owner, QueryKind::EquipmentView))
        .await;
    assert_eq!(removed, 1, "only asset 8 was left for this account");

    // other accounts and other kinds survive
    assert_eq!(cache.len().await, 2);
    let before = ledger.query_count();
    cache.equipment(other, 9, false).await?;
    cache.holdings(owner, HoldingKind::Moment, false).await?;
    assert_eq!(ledger.query_count(), before);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_query() -> Result<()> {
    let (ledger, cache) = setup();
    let owner = test_account(1);
    let key = CacheKey::new(owner, Query::ReceiptExists);

    let (a, b, c) = tokio::join!(cache.get(&key), cache.get(&key), cache.get(&key));
    assert_eq!(a?, b?);
    assert!(c.is_ok());
    assert_eq!(ledger.query_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_fresh_read_bypasses_cache() -> Result<()> {
    let (ledger, cache) = setup();
    let owner = test_account(1);

    assert!(!cache.receipt_exists(owner, false).await?);
    ledger.seed_receipt(owner);
    assert!(!cache.receipt_exists(owner, false).await?);
    assert!(cache.receipt_exists(owner, true).await?);
    // the fresh answer replaced the cached one
    assert!(cache.receipt_exists(owner, false).await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_queries_are_classified_and_not_cached() -> Result<()> {
    let (ledger, cache) = setup();
    let owner = test_account(1);
    ledger.add_moment(test_account(2), 7);

    let err = cache.equipment(owner, 7, false).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    ledger.set_offline(true);
    let err = cache.holdings(owner, HoldingKind::Moment, false).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
    assert!(cache.is_empty().await);

    ledger.set_offline(false);
    assert!(cache.holdings(owner, HoldingKind::Moment, false).await?.is_empty());
    assert_eq!(cache.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_noop_ledger_reads_empty_state() -> Result<()> {
    let cache = QueryCache::new(Arc::new(NoopLedger::new()), TTL, 8);
    let owner = test_account(1);
    assert!(cache.holdings(owner, HoldingKind::Accessory, false).await?.is_empty());
    assert!(!cache.receipt_exists(owner, false).await?);
    assert_eq!(cache.equipment(owner, 1, false).await?, None);
    Ok(())
}
