use tokio::sync::Mutex;
use tracing::{debug, info, span, warn, Instrument, Level};

use super::session::{RewardCompletion, RewardSession, RewardState, StartOutcome};
use crate::cache::KeyPattern;
use crate::classifier::classify;
use crate::error::{ClassifiedError, ErrorKind};
use crate::momentsmith::LedgerContext;
use crate::traits::LedgerGateway;
use crate::types::{Address, HoldingKind, LedgerEvent, QueryKind, TransactionId, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Commit,
    Reveal,
}

/// Drives one account's commit/reveal reward flow.
///
/// The Receipt held on the ledger is the source of truth for which phase the
/// account is in. The local `RewardSession` is a projection of it and is
/// re-derived whenever it may have drifted (after a failure, after a
/// completed reward, or after a run was abandoned mid-flight).
pub struct RewardSessionOrchestrator<G: LedgerGateway> {
    account: Address,
    ctx: LedgerContext<G>,
    session: Mutex<RewardSession>,
    /// Held for the whole of a `start` run.
    flight: Mutex<()>,
}

impl<G: LedgerGateway> RewardSessionOrchestrator<G> {
    /// Build the orchestrator, deriving the initial state from a fresh
    /// Receipt query: `CommitSealed` if one exists, `Idle` otherwise.
    pub async fn resume(account: Address, ctx: LedgerContext<G>) -> Result<Self, ClassifiedError> {
        let receipt = ctx.cache.receipt_exists(account, true).await?;
        let session = RewardSession::resumed(receipt);
        info!("Reward session for {} resumes at {:?}", account, session.state);
        Ok(Self {
            account,
            ctx,
            session: Mutex::new(session),
            flight: Mutex::new(()),
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub async fn session(&self) -> RewardSession {
        self.session.lock().await.clone()
    }

    pub async fn state(&self) -> RewardState {
        self.session.lock().await.state
    }

    /// Run the flow from the current resume point to completion.
    ///
    /// From `Idle` the commit is submitted and, once sealed, the reveal is
    /// chained immediately. From `CommitSealed` only the reveal is submitted.
    /// A call made while another is running returns `InFlight` without
    /// touching the ledger.
    pub async fn start(&self) -> StartOutcome {
        let span = span!(Level::INFO, "reward_start", account = %self.account);
        self.run().instrument(span).await
    }

    async fn run(&self) -> StartOutcome {
        let Ok(_flight) = self.flight.try_lock() else {
            debug!("start ignored: a run is already in flight");
            return StartOutcome::InFlight;
        };

        let state = self.state().await;
        let phase = match state {
            RewardState::Idle => Phase::Commit,
            RewardState::CommitSealed => Phase::Reveal,
            // Failed and Completed never trust the local projection. An
            // in-flight state without the flight lock means a previous run
            // was dropped before reaching a terminal status.
            RewardState::Failed
            | RewardState::Completed
            | RewardState::Committing
            | RewardState::Revealing => match self.rederive().await {
                Ok(phase) => phase,
                // Nothing was submitted, so a finished reward stays finished.
                Err(error) if state == RewardState::Completed => return self.refuse(error).await,
                Err(error) => return self.fail(error).await,
            },
        };

        if phase == Phase::Commit {
            if let Err(error) = self.commit().await {
                return self.fail(error).await;
            }
        }

        match self.reveal().await {
            Ok(completion) => StartOutcome::Completed(completion),
            Err(error) if error.kind == ErrorKind::NoReceiptFound => self.reset(error).await,
            Err(error) => self.fail(error).await,
        }
    }

    async fn rederive(&self) -> Result<Phase, ClassifiedError> {
        let receipt = self.ctx.cache.receipt_exists(self.account, true).await?;
        let state = RewardState::derived(receipt);
        info!("Re-derived reward state {:?} from ledger", state);
        self.transition(state, None).await;
        Ok(if receipt { Phase::Reveal } else { Phase::Commit })
    }

    async fn commit(&self) -> Result<(), ClassifiedError> {
        self.transition(RewardState::Committing, None).await;
        let tx = self.submit(TransactionKind::CommitReward).await?;
        self.transition(RewardState::Committing, Some(tx)).await;

        self.ctx.poller.wait_for_seal(tx).await?;
        self.ctx
            .invalidate(&[KeyPattern::kind(self.account, QueryKind::ReceiptExists)])
            .await;
        self.transition(RewardState::CommitSealed, Some(tx)).await;
        Ok(())
    }

    async fn reveal(&self) -> Result<RewardCompletion, ClassifiedError> {
        self.transition(RewardState::Revealing, None).await;

        // Fresh read: a cached list may miss accessories that arrived within the TTL.
        let before = match self
            .ctx
            .cache
            .holdings(self.account, HoldingKind::Accessory, true)
            .await
        {
            Ok(ids) => Some(ids),
            Err(e) => {
                warn!("Could not snapshot accessory holdings before reveal: {}", e);
                None
            }
        };

        let tx = self
            .submit(TransactionKind::RevealReward {
                recipient: self.account,
            })
            .await?;
        self.transition(RewardState::Revealing, Some(tx)).await;
        self.ctx.poller.wait_for_seal(tx).await?;

        let invalidated = vec![
            KeyPattern::kind(self.account, QueryKind::ReceiptExists),
            KeyPattern::kind(self.account, QueryKind::AccessoryHoldings),
        ];
        self.ctx.invalidate(&invalidated).await;

        let awarded = match (
            before,
            self.ctx
                .cache
                .holdings(self.account, HoldingKind::Accessory, false)
                .await,
        ) {
            (Some(before), Ok(after)) => after.into_iter().filter(|id| !before.contains(id)).collect(),
            (_, Err(e)) => {
                warn!("Could not read accessory holdings after reveal: {}", e);
                Vec::new()
            }
            (None, Ok(_)) => Vec::new(),
        };

        self.transition(RewardState::Completed, Some(tx)).await;
        info!("Reward {} completed, awarded {:?}", tx, awarded);
        self.ctx
            .publish(LedgerEvent::RewardCompleted {
                account: self.account,
                transaction: tx,
                awarded: awarded.clone(),
            })
            .await;

        Ok(RewardCompletion {
            transaction: tx,
            awarded,
            invalidated,
        })
    }

    async fn submit(&self, kind: TransactionKind) -> Result<TransactionId, ClassifiedError> {
        let tx = self
            .ctx
            .gateway
            .submit(&kind, &self.account)
            .await
            .map_err(|e| classify(&e))?;
        info!("Submitted {} transaction {}", kind.label(), tx);
        Ok(tx)
    }

    /// The Receipt was already consumed, or never existed: go back to Idle.
    async fn reset(&self, error: ClassifiedError) -> StartOutcome {
        warn!("Reveal found no Receipt, resetting to Idle: {}", error.message);
        self.ctx
            .invalidate(&[KeyPattern::kind(self.account, QueryKind::ReceiptExists)])
            .await;
        {
            let mut session = self.session.lock().await;
            session.state = RewardState::Idle;
            session.last_error = Some(error.clone());
        }
        self.announce(RewardState::Idle, None).await;
        StartOutcome::Reset(error)
    }

    async fn fail(&self, error: ClassifiedError) -> StartOutcome {
        warn!("Reward flow failed: {}", error);
        {
            let mut session = self.session.lock().await;
            session.state = RewardState::Failed;
            session.last_error = Some(error.clone());
        }
        self.report(error).await
    }

    /// Record `error` without leaving the current state.
    async fn refuse(&self, error: ClassifiedError) -> StartOutcome {
        warn!("Could not re-derive reward state: {}", error);
        self.session.lock().await.last_error = Some(error.clone());
        self.report(error).await
    }

    async fn report(&self, error: ClassifiedError) -> StartOutcome {
        self.ctx
            .publish(LedgerEvent::RewardFailed {
                account: self.account,
                error: error.clone(),
            })
            .await;
        StartOutcome::Failed(error)
    }

    async fn transition(&self, state: RewardState, transaction: Option<TransactionId>) {
        {
            let mut session = self.session.lock().await;
            session.state = state;
            if state.is_in_flight() {
                session.last_error = None;
            }
            if transaction.is_some() || state.is_in_flight() {
                session.transaction_id = transaction;
            }
        }
        debug!("Reward state -> {:?}", state);
        self.announce(state, transaction).await;
    }

    async fn announce(&self, state: RewardState, transaction: Option<TransactionId>) {
        self.ctx
            .publish(LedgerEvent::RewardTransition {
                account: self.account,
                state,
                transaction,
            })
            .await;
    }
}
