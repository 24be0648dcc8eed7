use std::sync::Arc;

use anyhow::Result;

use super::coordinator::{EquipAction, EquipCoordinator};
use super::guard::InFlightTable;
use crate::config::BaseConfig;
use crate::error::{EquipError, ErrorKind};
use crate::ledger::SimulatedLedger;
use crate::momentsmith::LedgerContext;
use crate::sink::{EventSinkVariant, MockSink};
use crate::types::{Address, HoldingKind, LedgerEvent, QueryKind};

fn test_account(id: u8) -> Address {
    Address::new([0x01, 0xcf, 0, 0, 0, 0, 0, id])
}

fn test_coordinator(ledger: &SimulatedLedger, sink: &MockSink) -> EquipCoordinator<SimulatedLedger> {
    EquipCoordinator::new(LedgerContext::new(
        Arc::new(ledger.clone()),
        EventSinkVariant::Mock(sink.clone()),
        &BaseConfig::default(),
    ))
}

// ==================== IN-FLIGHT TABLE ====================

#[test]
fn test_guard_releases_on_drop() {
    let table = InFlightTable::new();
    let account = test_account(1);

    let guard = table.try_acquire(account, 7);
    assert!(guard.is_some());
    assert!(table.try_acquire(account, 7).is_none());
    // other assets and other accounts are independent
    assert!(table.try_acquire(account, 8).is_some());
    assert!(table.try_acquire(test_account(2), 7).is_some());

    drop(guard);
    assert!(!table.contains(account, 7));
    assert!(table.is_empty());
}

// ==================== COORDINATOR ====================

#[tokio::test(start_paused = true)]
async fn test_equip_reports_displaced_accessory() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);
    ledger.install(7, 3, "Pixel Frame");
    ledger.add_accessory(owner, 9, "Neon Frame");

    let coordinator = test_coordinator(&ledger, &sink);
    let outcome = coordinator.equip(owner, 7, 9).await?;

    assert_eq!(outcome.equipped, Some(9));
    assert_eq!(outcome.displaced, Some(3));
    assert_eq!(outcome.invalidated.len(), 2);
    assert!(!coordinator.is_in_flight(owner, 7));

    assert_eq!(
        sink.invalidated_kinds(),
        vec![QueryKind::EquipmentView, QueryKind::AccessoryHoldings]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_accessory_rejected_before_submit() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);

    let coordinator = test_coordinator(&ledger, &sink);
    let err = coordinator.equip(owner, 7, 42).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::InsufficientResource));
    assert!(ledger.submissions().is_empty());
    assert!(!coordinator.is_in_flight(owner, 7));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_accessory_received_after_caching_can_be_equipped() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);

    let ctx = LedgerContext::new(
        Arc::new(ledger.clone()),
        EventSinkVariant::Mock(sink.clone()),
        &BaseConfig::default(),
    );
    let coordinator = EquipCoordinator::new(ctx.clone());

    assert!(ctx.cache.holdings(owner, HoldingKind::Accessory, false).await?.is_empty());
    // arrives while the empty list is still within its TTL
    ledger.add_accessory(owner, 9, "Neon Frame");

    let outcome = coordinator.equip(owner, 7, 9).await?;
    assert_eq!(outcome.equipped, Some(9));
    assert_eq!(ledger.submissions().len(), 1);
    assert_eq!(ledger.equipped_on(7), Some(9));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ledger_rechecks_holdings_atomically() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);
    ledger.install(7, 3, "Pixel Frame");
    ledger.add_accessory(owner, 9, "Neon Frame");
    // the cached holdings still list 9 when the transaction runs
    ledger.fail_next(
        "equip",
        "Could not withdraw an NFT with the provided ID from the collection",
    );

    let coordinator = test_coordinator(&ledger, &sink);
    let err = coordinator.equip(owner, 7, 9).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::InsufficientResource));
    assert_eq!(ledger.submissions().len(), 1);
    assert_eq!(ledger.equipped_on(7), Some(3));
    assert_eq!(ledger.accessories_of(owner), vec![9]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_holdings_are_requeried_after_seal() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);
    ledger.add_accessory(owner, 9, "Neon Frame");

    let ctx = LedgerContext::new(
        Arc::new(ledger.clone()),
        EventSinkVariant::Mock(sink.clone()),
        &BaseConfig::default(),
    );
    let coordinator = EquipCoordinator::new(ctx.clone());

    assert_eq!(ctx.cache.holdings(owner, HoldingKind::Accessory, false).await?, vec![9]);
    coordinator.equip(owner, 7, 9).await?;
    assert!(ctx.cache.holdings(owner, HoldingKind::Accessory, false).await?.is_empty());
    assert_eq!(
        ctx.cache.equipment(owner, 7, false).await?.map(|v| v.accessory_id),
        Some(9)
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_foreign_asset_is_permission_denied() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    let intruder = test_account(2);
    ledger.add_moment(owner, 7);
    ledger.add_accessory(intruder, 9, "Golden Frame");

    let coordinator = test_coordinator(&ledger, &sink);
    let err = coordinator.equip(intruder, 7, 9).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::PermissionDenied));
    assert_eq!(ledger.equipped_on(7), None);
    assert_eq!(ledger.accessories_of(intruder), vec![9]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ticket_holds_asset_until_dropped() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);
    ledger.install(7, 3, "Pixel Frame");

    let coordinator = test_coordinator(&ledger, &sink);
    let ticket = coordinator.begin(owner, 7)?;
    assert_eq!(ticket.asset(), 7);
    assert!(matches!(
        coordinator.unequip(owner, 7).await,
        Err(EquipError::Busy { asset: 7 })
    ));

    let outcome = ticket.execute(EquipAction::Unequip).await?;
    assert_eq!(outcome.equipped, None);
    assert_eq!(outcome.displaced, Some(3));
    assert_eq!(ledger.accessories_of(owner), vec![3]);
    assert!(coordinator.begin(owner, 7).is_ok());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unequip_of_empty_slot_is_script_panic() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);

    let coordinator = test_coordinator(&ledger, &sink);
    let err = coordinator.unequip(owner, 7).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ScriptPanic));
    assert!(!sink
        .get_events()
        .iter()
        .any(|e| matches!(e, LedgerEvent::EquipSealed { .. })));
    Ok(())
}
