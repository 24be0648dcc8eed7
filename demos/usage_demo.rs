//! Walks through a reward acquisition and an equip swap against the
//! simulated ledger.
//!
//! Run with `RUST_LOG=momentsmith=debug cargo run --example usage_demo`
//! to see cache and poll activity.

use anyhow::Result;
use kanal::unbounded_async;
use momentsmith::config::BaseConfig;
use momentsmith::ledger::SimulatedLedger;
use momentsmith::sink::EventSinkVariant;
use momentsmith::types::{Address, HoldingKind};
use momentsmith::view::ModalVisibility;
use momentsmith::{telemetry, MomentSmith, StartOutcome};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = BaseConfig {
        poll_interval_ms: 50,
        poll_max_interval_ms: 200,
        ..BaseConfig::default()
    };
    let account: Address = "0xf8d6e0586b0a20c7".parse()?;

    let ledger = SimulatedLedger::new();
    let asset = ledger.mint_moment(account);
    ledger.add_accessory(account, 3, "Pixel Frame");

    let (tx, rx) = unbounded_async();
    let app = MomentSmith::new(ledger.clone(), EventSinkVariant::new_channel(tx), config);

    // Reward: commit, wait for seal, reveal.
    let session = app.reward_session(account).await?;
    info!("Reward session starts at {:?}", session.state().await);
    let awarded = match session.start().await {
        StartOutcome::Completed(completion) => completion.awarded,
        other => anyhow::bail!("reward flow did not complete: {:?}", other),
    };
    info!("Awarded accessories {:?}", awarded);

    // Equip: install the old frame, then swap in the new one.
    let coordinator = app.equip_coordinator();
    coordinator.equip(account, asset, 3).await?;
    let new_frame = *awarded
        .first()
        .ok_or_else(|| anyhow::anyhow!("reveal awarded nothing"))?;
    let swap = coordinator.equip(account, asset, new_frame).await?;
    info!(
        "Moment {} now wears {:?}, {:?} returned to holdings",
        swap.asset, swap.equipped, swap.displaced
    );

    if let Some(panel) = app.equip_panel(account, asset, ModalVisibility::Open).await? {
        if let Some(view) = panel.equipped {
            info!("Equipped: {} ({})", view.name, view.thumbnail);
        }
        info!("Free accessories: {:?}", panel.choices);
    }
    info!(
        "Holdings: {:?}",
        app.ctx.cache.holdings(account, HoldingKind::Accessory, false).await?
    );

    let mut published = 0;
    while let Ok(Some(event)) = rx.try_recv() {
        published += 1;
        tracing::debug!("event: {}", serde_json::to_string(&event)?);
    }
    info!("{} events published", published);
    Ok(())
}
