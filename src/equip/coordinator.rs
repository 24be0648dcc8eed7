use tracing::{debug, info, span, warn, Instrument, Level};

use super::guard::{InFlightGuard, InFlightTable};
use crate::cache::KeyPattern;
use crate::classifier::classify;
use crate::error::{ClassifiedError, EquipError, ErrorKind};
use crate::momentsmith::LedgerContext;
use crate::traits::LedgerGateway;
use crate::types::{
    AccessoryId, Address, AssetId, HoldingKind, LedgerEvent, Query, QueryKind, TransactionId,
    TransactionKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipAction {
    Equip(AccessoryId),
    Unequip,
}

impl EquipAction {
    fn transaction(self, asset: AssetId) -> TransactionKind {
        match self {
            EquipAction::Equip(accessory) => TransactionKind::Equip { asset, accessory },
            EquipAction::Unequip => TransactionKind::Unequip { asset },
        }
    }

    fn accessory(self) -> Option<AccessoryId> {
        match self {
            EquipAction::Equip(accessory) => Some(accessory),
            EquipAction::Unequip => None,
        }
    }
}

/// Result of a sealed equip or unequip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipOutcome {
    pub asset: AssetId,
    /// Now installed on the asset; `None` after an unequip.
    pub equipped: Option<AccessoryId>,
    /// Returned to free holdings by the swap, if anything was installed.
    pub displaced: Option<AccessoryId>,
    pub transaction: TransactionId,
    pub invalidated: Vec<KeyPattern>,
}

/// Stateless across calls apart from the in-flight table.
pub struct EquipCoordinator<G: LedgerGateway> {
    ctx: LedgerContext<G>,
    in_flight: InFlightTable,
}

impl<G: LedgerGateway> Clone for EquipCoordinator<G> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<G: LedgerGateway> EquipCoordinator<G> {
    pub fn new(ctx: LedgerContext<G>) -> Self {
        Self {
            ctx,
            in_flight: InFlightTable::new(),
        }
    }

    /// Reserve `asset` for one operation. Fails immediately with `Busy` if
    /// another operation on the same asset has not reached a terminal state.
    pub fn begin(&self, account: Address, asset: AssetId) -> Result<EquipTicket<G>, EquipError> {
        let guard = self.in_flight.try_acquire(account, asset).ok_or_else(|| {
            debug!("Rejecting equip on asset {} for {}: busy", asset, account);
            EquipError::Busy { asset }
        })?;
        Ok(EquipTicket {
            ctx: self.ctx.clone(),
            account,
            guard,
        })
    }

    pub fn is_in_flight(&self, account: Address, asset: AssetId) -> bool {
        self.in_flight.contains(account, asset)
    }

    pub async fn equip(
        &self,
        account: Address,
        asset: AssetId,
        accessory: AccessoryId,
    ) -> Result<EquipOutcome, EquipError> {
        self.begin(account, asset)?
            .execute(EquipAction::Equip(accessory))
            .await
    }

    pub async fn unequip(&self, account: Address, asset: AssetId) -> Result<EquipOutcome, EquipError> {
        self.begin(account, asset)?.execute(EquipAction::Unequip).await
    }
}

/// A reservation on one asset. Dropping it, or finishing `execute`,
/// releases the asset.
pub struct EquipTicket<G: LedgerGateway> {
    ctx: LedgerContext<G>,
    account: Address,
    guard: InFlightGuard,
}

impl<G: LedgerGateway> EquipTicket<G> {
    pub fn asset(&self) -> AssetId {
        self.guard.asset()
    }

    pub async fn execute(self, action: EquipAction) -> Result<EquipOutcome, EquipError> {
        let span = span!(
            Level::INFO,
            "equip",
            account = %self.account,
            asset = self.asset(),
            action = ?action
        );
        self.run(action).instrument(span).await
    }

    async fn run(self, action: EquipAction) -> Result<EquipOutcome, EquipError> {
        let asset = self.asset();
        if let Some(accessory) = action.accessory() {
            self.check_holdings(accessory).await?;
        }
        let displaced = self.installed(asset).await;

        let kind = action.transaction(asset);
        let tx = self
            .ctx
            .gateway
            .submit(&kind, &self.account)
            .await
            .map_err(|e| classify(&e))?;
        info!("Submitted {} transaction {}", kind.label(), tx);

        self.ctx.poller.wait_for_seal(tx).await?;

        let invalidated = vec![
            KeyPattern::exact(self.account, Query::EquipmentView(asset)),
            KeyPattern::kind(self.account, QueryKind::AccessoryHoldings),
        ];
        self.ctx.invalidate(&invalidated).await;

        let equipped = action.accessory();
        info!(
            "Asset {} now carries {:?}, displaced {:?}",
            asset, equipped, displaced
        );
        self.ctx
            .publish(LedgerEvent::EquipSealed {
                account: self.account,
                asset,
                equipped,
                displaced,
                transaction: tx,
            })
            .await;

        Ok(EquipOutcome {
            asset,
            equipped,
            displaced,
            transaction: tx,
            invalidated,
        })
    }

    /// Best-effort: the transaction re-checks holdings atomically.
    ///
    /// A cached list only confirms. A miss is re-read from the ledger before
    /// rejecting, so an out-of-date entry cannot veto a valid equip.
    async fn check_holdings(&self, accessory: AccessoryId) -> Result<(), ClassifiedError> {
        for fresh in [false, true] {
            match self
                .ctx
                .cache
                .holdings(self.account, HoldingKind::Accessory, fresh)
                .await
            {
                Ok(ids) if ids.contains(&accessory) => return Ok(()),
                Ok(_) => debug!("Accessory {} missing from holdings (fresh={})", accessory, fresh),
                Err(e) => {
                    warn!("Could not verify holdings before equip: {}", e);
                    return Ok(());
                }
            }
        }
        Err(ClassifiedError::new(
            ErrorKind::InsufficientResource,
            format!("accessory {} is not in the free holdings of {}", accessory, self.account),
        ))
    }

    /// Accessory currently installed on `asset`, read fresh.
    async fn installed(&self, asset: AssetId) -> Option<AccessoryId> {
        match self.ctx.cache.equipment(self.account, asset, true).await {
            Ok(view) => view.map(|v| v.accessory_id),
            Err(e) => {
                warn!("Could not read equipment of asset {}: {}", asset, e);
                None
            }
        }
    }
}
