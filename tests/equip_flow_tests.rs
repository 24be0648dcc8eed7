use anyhow::Result;
use momentsmith::config::BaseConfig;
use momentsmith::equip::EquipAction;
use momentsmith::ledger::SimulatedLedger;
use momentsmith::sink::{EventSinkVariant, MockSink};
use momentsmith::types::{Address, HoldingKind, LedgerEvent};
use momentsmith::{EquipError, ErrorKind, MomentSmith};

fn test_account(id: u8) -> Address {
    Address::new([0x01, 0xcf, 0x0e, 0x2f, 0x2f, 0x71, 0x54, id])
}

fn test_app(ledger: &SimulatedLedger, sink: &MockSink) -> MomentSmith<SimulatedLedger> {
    MomentSmith::new(
        ledger.clone(),
        EventSinkVariant::Mock(sink.clone()),
        BaseConfig::default(),
    )
}

/// An accessory is either installed on exactly one moment or free, never both.
fn assert_slot_invariant(ledger: &SimulatedLedger, owner: Address, assets: &[u64]) {
    let free = ledger.accessories_of(owner);
    let installed: Vec<u64> = assets.iter().filter_map(|a| ledger.equipped_on(*a)).collect();
    for id in &installed {
        assert!(!free.contains(id), "accessory {} both equipped and free", id);
        assert_eq!(
            installed.iter().filter(|x| *x == id).count(),
            1,
            "accessory {} equipped on more than one moment",
            id
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_equip_swaps_previous_accessory_back() -> Result<()> {
    println!("\n=== Test: Equip swap on asset 7 ===\n");

    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(1);
    ledger.add_moment(owner, 7);
    ledger.install(7, 3, "Pixel Frame");
    ledger.add_accessory(owner, 9, "Neon Frame");

    let app = test_app(&ledger, &sink);
    let outcome = app.equip_coordinator().equip(owner, 7, 9).await?;

    assert_eq!(outcome.equipped, Some(9));
    assert_eq!(outcome.displaced, Some(3));
    assert_eq!(ledger.equipped_on(7), Some(9));

    let free = app.ctx.cache.holdings(owner, HoldingKind::Accessory, false).await?;
    assert!(free.contains(&3), "displaced accessory returns to holdings");
    assert!(!free.contains(&9), "equipped accessory leaves holdings");
    assert_eq!(ledger.submissions().len(), 1, "swap is a single transaction");
    assert_slot_invariant(&ledger, owner, &[7]);

    assert!(sink.get_events().iter().any(|e| matches!(
        e,
        LedgerEvent::EquipSealed {
            asset: 7,
            equipped: Some(9),
            displaced: Some(3),
            ..
        }
    )));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_second_equip_on_same_asset_is_busy() -> Result<()> {
    println!("\n=== Test: Concurrent equip on one asset ===\n");

    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(2);
    ledger.add_moment(owner, 7);
    ledger.add_accessory(owner, 9, "Neon Frame");

    let app = test_app(&ledger, &sink);
    let coordinator = app.equip_coordinator();

    let (first, second) = tokio::join!(
        coordinator.equip(owner, 7, 9),
        coordinator.equip(owner, 7, 9)
    );

    assert_eq!(first?.equipped, Some(9));
    assert!(
        matches!(second, Err(EquipError::Busy { asset: 7 })),
        "second call must be rejected, got {:?}",
        second
    );
    assert_eq!(ledger.submissions().len(), 1);
    assert_slot_invariant(&ledger, owner, &[7]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_begin_rejects_synchronously() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(3);
    ledger.add_moment(owner, 7);
    ledger.add_moment(owner, 8);
    ledger.add_accessory(owner, 9, "Neon Frame");
    ledger.add_accessory(owner, 10, "Golden Frame");

    let app = test_app(&ledger, &sink);
    let coordinator = app.equip_coordinator();

    let ticket = coordinator.begin(owner, 7)?;
    assert!(coordinator.is_in_flight(owner, 7));
    assert!(matches!(
        coordinator.begin(owner, 7),
        Err(EquipError::Busy { asset: 7 })
    ));

    // A different asset is unaffected by the reservation on 7.
    let (on_seven, on_eight) = tokio::join!(
        ticket.execute(EquipAction::Equip(9)),
        coordinator.equip(owner, 8, 10)
    );
    assert_eq!(on_seven?.equipped, Some(9));
    assert_eq!(on_eight?.equipped, Some(10));
    assert!(!coordinator.is_in_flight(owner, 7));
    assert_slot_invariant(&ledger, owner, &[7, 8]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sequential_equips_keep_single_slot() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(4);
    ledger.add_moment(owner, 7);
    ledger.add_moment(owner, 8);
    for (id, name) in [(20, "Pixel Frame"), (21, "Neon Frame"), (22, "Glitch Frame")] {
        ledger.add_accessory(owner, id, name);
    }

    let app = test_app(&ledger, &sink);
    let coordinator = app.equip_coordinator();

    coordinator.equip(owner, 7, 20).await?;
    assert_slot_invariant(&ledger, owner, &[7, 8]);
    coordinator.equip(owner, 7, 21).await?;
    assert_slot_invariant(&ledger, owner, &[7, 8]);
    coordinator.equip(owner, 8, 20).await?;
    assert_slot_invariant(&ledger, owner, &[7, 8]);

    // 21 is installed, not free: rejected before submission.
    let err = coordinator.equip(owner, 8, 21).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InsufficientResource));

    let outcome = coordinator.unequip(owner, 7).await?;
    assert_eq!(outcome.displaced, Some(21));
    assert_eq!(ledger.equipped_on(7), None);
    assert_slot_invariant(&ledger, owner, &[7, 8]);

    let mut free = app.ctx.cache.holdings(owner, HoldingKind::Accessory, false).await?;
    free.sort_unstable();
    assert_eq!(free, vec![21, 22]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_equip_failures_are_classified() -> Result<()> {
    let ledger = SimulatedLedger::new();
    let sink = MockSink::new();
    let owner = test_account(5);
    let stranger = test_account(6);
    ledger.add_moment(owner, 7);
    ledger.add_accessory(stranger, 9, "Neon Frame");
    ledger.add_accessory(owner, 11, "Pixel Frame");

    let app = test_app(&ledger, &sink);
    let coordinator = app.equip_coordinator();

    let denied = coordinator.equip(stranger, 7, 9).await.unwrap_err();
    assert_eq!(denied.kind(), Some(ErrorKind::PermissionDenied));

    ledger.fail_next("equip", "panic: frame metadata is locked");
    let aborted = coordinator.equip(owner, 7, 11).await.unwrap_err();
    assert_eq!(aborted.kind(), Some(ErrorKind::ScriptPanic));

    ledger.decline_signer(owner);
    let rejected = coordinator.equip(owner, 7, 11).await.unwrap_err();
    assert_eq!(rejected.kind(), Some(ErrorKind::UserRejected));

    // None of the failures changed the slot or holdings.
    assert_eq!(ledger.equipped_on(7), None);
    assert_eq!(ledger.accessories_of(owner), vec![11]);
    assert!(!coordinator.is_in_flight(owner, 7));
    Ok(())
}
