//! Shared ledger context and the `MomentSmith` entry point.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::cache::{KeyPattern, QueryCache};
use crate::config::BaseConfig;
use crate::equip::EquipCoordinator;
use crate::error::ClassifiedError;
use crate::ledger::LedgerGatewayVariant;
use crate::poller::{PollPolicy, StatusPoller};
use crate::reward::RewardSessionOrchestrator;
use crate::sink::{BlackholeSink, EventSinkVariant};
use crate::traits::{EventSink, LedgerGateway};
use crate::types::{Address, AssetId, LedgerEvent};
use crate::view::{EquipPanel, ModalVisibility};

/// The primitives both orchestrators are built on.
pub struct LedgerContext<G: LedgerGateway> {
    pub gateway: Arc<G>,
    pub cache: Arc<QueryCache<G>>,
    pub poller: StatusPoller<G>,
    pub sink: Arc<EventSinkVariant>,
}

impl<G: LedgerGateway> Clone for LedgerContext<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            cache: Arc::clone(&self.cache),
            poller: self.poller.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<G: LedgerGateway> LedgerContext<G> {
    pub fn new(gateway: Arc<G>, sink: EventSinkVariant, config: &BaseConfig) -> Self {
        let cache = QueryCache::new(
            Arc::clone(&gateway),
            config.query_ttl(),
            config.cache_capacity,
        );
        let poller = StatusPoller::new(Arc::clone(&gateway), PollPolicy::from_config(config));
        Self {
            gateway,
            cache: Arc::new(cache),
            poller,
            sink: Arc::new(sink),
        }
    }

    /// Publish to the sink. Sink failures are logged, never propagated.
    pub async fn publish(&self, event: LedgerEvent) {
        if let Err(e) = self.sink.publish(&event).await {
            error!("Failed to publish event to {}: {}", self.sink.name(), e);
        }
    }

    /// Invalidate each pattern and announce it.
    pub async fn invalidate(&self, patterns: &[KeyPattern]) {
        for pattern in patterns {
            self.cache.invalidate(pattern).await;
            self.publish(LedgerEvent::CacheInvalidated {
                account: pattern.account,
                kind: pattern.kind,
            })
            .await;
        }
    }
}

/// Main entry point used by the presentation layer.
pub struct MomentSmith<G: LedgerGateway> {
    pub ctx: LedgerContext<G>,

    pub config: BaseConfig,

    equip: EquipCoordinator<G>,

    /// One reward session per account.
    sessions: Mutex<HashMap<Address, Arc<RewardSessionOrchestrator<G>>>>,
}

impl<G: LedgerGateway> MomentSmith<G> {
    pub fn new(gateway: G, sink: EventSinkVariant, config: BaseConfig) -> Self {
        let ctx = LedgerContext::new(Arc::new(gateway), sink, &config);
        let equip = EquipCoordinator::new(ctx.clone());
        Self {
            ctx,
            config,
            equip,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The account's reward session, resumed from ledger state on first use.
    pub async fn reward_session(
        &self,
        account: Address,
    ) -> Result<Arc<RewardSessionOrchestrator<G>>, ClassifiedError> {
        if let Some(existing) = self.sessions.lock().await.get(&account) {
            return Ok(Arc::clone(existing));
        }
        // The Receipt query runs without the registry lock so one slow
        // account cannot hold up the others. Racing callers for the same
        // account keep whichever session was registered first.
        let resumed = Arc::new(RewardSessionOrchestrator::resume(account, self.ctx.clone()).await?);
        let mut sessions = self.sessions.lock().await;
        Ok(Arc::clone(sessions.entry(account).or_insert(resumed)))
    }

    /// Drop the local session object. Ledger effects of anything already
    /// submitted persist and are picked up by the next `reward_session`.
    pub async fn abandon_session(&self, account: Address) -> bool {
        let removed = self.sessions.lock().await.remove(&account).is_some();
        if removed {
            info!("Abandoned reward session for {}", account);
        }
        removed
    }

    pub fn equip_coordinator(&self) -> EquipCoordinator<G> {
        self.equip.clone()
    }

    pub async fn equip_panel(
        &self,
        owner: Address,
        asset: AssetId,
        visibility: ModalVisibility,
    ) -> Result<Option<EquipPanel>, ClassifiedError> {
        EquipPanel::load(
            &self.ctx.cache,
            owner,
            asset,
            visibility,
            &self.config.media_gateway,
        )
        .await
    }
}

impl MomentSmith<LedgerGatewayVariant> {
    /// Initialize with the configured built-in ledger and a discarding sink.
    pub fn initialize(config: BaseConfig) -> Self {
        let gateway = LedgerGatewayVariant::new(config.ledger_type);
        info!("Initializing MomentSmith with {} ledger", gateway.name());
        Self::new(
            gateway,
            EventSinkVariant::Blackhole(BlackholeSink::new()),
            config,
        )
    }
}
