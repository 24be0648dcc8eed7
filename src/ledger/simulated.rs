//! In-memory ledger with the reward-pack and equip contract semantics.
//!
//! Transactions advance one confirmation level per poll
//! (Pending, Finalized, Executed, Sealed) and their effects are applied
//! atomically on the transition to Sealed. A failed execution still seals,
//! carrying its error message, as the real network reports it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::LedgerError;
use crate::traits::LedgerGateway;
use crate::types::{
    AccessoryId, Address, AssetId, EquipmentView, HoldingKind, Query, QueryResult, StatusReport,
    TransactionId, TransactionKind, TransactionStatus,
};

pub const RECEIPT_STORAGE_PATH: &str = "/storage/AccessoryPackReceipt";

const ACCESSORY_CATALOG: &[(&str, &str)] = &[
    ("Pixel Frame", "A chunky eight-bit border"),
    ("Neon Frame", "Glows faintly in the dark"),
    ("Golden Frame", "Polished and heavy"),
    ("Glitch Frame", "Never renders the same way twice"),
];

/// First id handed to accessories minted by reveals.
const FIRST_MINTED_ACCESSORY: AccessoryId = 1000;

/// A transaction accepted by `submit`, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub signer: Address,
}

struct Moment {
    owner: Address,
    equipped: Option<AccessoryId>,
}

struct LedgerTransaction {
    kind: TransactionKind,
    signer: Address,
    status: TransactionStatus,
    error: Option<String>,
    hidden_polls: u32,
    expires: bool,
}

impl LedgerTransaction {
    fn report(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            error_message: self.error.clone(),
        }
    }
}

struct LedgerState {
    receipts: HashSet<Address>,
    moments: BTreeMap<AssetId, Moment>,
    holdings: HashMap<Address, BTreeSet<AccessoryId>>,
    catalog: HashMap<AccessoryId, EquipmentView>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
    submissions: Vec<Submission>,
    scripted_failures: HashMap<&'static str, VecDeque<String>>,
    scripted_expiries: HashMap<&'static str, u32>,
    declined: HashSet<Address>,
    next_accessory: AccessoryId,
    next_moment: AssetId,
    nonce: u64,
    query_count: usize,
    hidden_polls: u32,
    frozen: bool,
    offline: bool,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            receipts: HashSet::new(),
            moments: BTreeMap::new(),
            holdings: HashMap::new(),
            catalog: HashMap::new(),
            transactions: HashMap::new(),
            submissions: Vec::new(),
            scripted_failures: HashMap::new(),
            scripted_expiries: HashMap::new(),
            declined: HashSet::new(),
            next_accessory: FIRST_MINTED_ACCESSORY,
            next_moment: 1,
            nonce: 0,
            query_count: 0,
            hidden_polls: 0,
            frozen: false,
            offline: false,
        }
    }
}

impl LedgerState {
    fn transaction_id(&mut self, kind: &TransactionKind, signer: &Address) -> TransactionId {
        self.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(signer.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(kind.label().as_bytes());
        TransactionId(hasher.finalize().into())
    }

    fn advance(&mut self, id: &TransactionId) -> Result<StatusReport, LedgerError> {
        let frozen = self.frozen;
        let tx = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))?;

        if tx.hidden_polls > 0 {
            tx.hidden_polls -= 1;
            return Err(LedgerError::NotFound(format!("transaction {}", id)));
        }
        if frozen || tx.status.is_terminal() {
            return Ok(tx.report());
        }

        let next = match tx.status {
            TransactionStatus::Unknown => TransactionStatus::Pending,
            TransactionStatus::Pending if tx.expires => TransactionStatus::Expired,
            TransactionStatus::Pending => TransactionStatus::Finalized,
            TransactionStatus::Finalized => TransactionStatus::Executed,
            _ => TransactionStatus::Sealed,
        };
        if next != TransactionStatus::Sealed {
            tx.status = next;
            return Ok(tx.report());
        }

        let (kind, signer) = (tx.kind, tx.signer);
        let outcome = self.execute(&kind, &signer, id);
        let tx = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))?;
        tx.status = TransactionStatus::Sealed;
        if let Err(message) = outcome {
            debug!("Simulated {} {} aborted: {}", kind.label(), id, message);
            tx.error = Some(message);
        }
        Ok(tx.report())
    }

    /// Apply a transaction's effects. All checks run before any mutation.
    fn execute(
        &mut self,
        kind: &TransactionKind,
        signer: &Address,
        id: &TransactionId,
    ) -> Result<(), String> {
        if let Some(message) = self
            .scripted_failures
            .get_mut(kind.label())
            .and_then(|queue| queue.pop_front())
        {
            return Err(message);
        }

        match *kind {
            TransactionKind::CommitReward => {
                if !self.receipts.insert(*signer) {
                    return Err(format!(
                        "Storage collision at path={} a Receipt is already stored!",
                        RECEIPT_STORAGE_PATH
                    ));
                }
                Ok(())
            }
            TransactionKind::RevealReward { recipient } => {
                if !self.receipts.remove(signer) {
                    return Err(format!(
                        "No Receipt found in storage at path={}",
                        RECEIPT_STORAGE_PATH
                    ));
                }
                self.mint_accessory(recipient, id);
                Ok(())
            }
            TransactionKind::Equip { asset, accessory } => {
                self.check_owner(asset, signer)?;
                let holdings = self.holdings.entry(*signer).or_default();
                if !holdings.remove(&accessory) {
                    return Err(
                        "Could not withdraw an NFT with the provided ID from the collection"
                            .to_string(),
                    );
                }
                let previous = self
                    .moments
                    .get_mut(&asset)
                    .and_then(|m| m.equipped.replace(accessory));
                if let Some(previous) = previous {
                    holdings.insert(previous);
                }
                Ok(())
            }
            TransactionKind::Unequip { asset } => {
                self.check_owner(asset, signer)?;
                let previous = self
                    .moments
                    .get_mut(&asset)
                    .and_then(|m| m.equipped.take())
                    .ok_or_else(|| format!("Moment {} has no accessory equipped", asset))?;
                self.holdings.entry(*signer).or_default().insert(previous);
                Ok(())
            }
        }
    }

    fn check_owner(&self, asset: AssetId, signer: &Address) -> Result<(), String> {
        match self.moments.get(&asset) {
            Some(moment) if moment.owner == *signer => Ok(()),
            _ => Err(format!(
                "Could not borrow moment {}: not owned by signer {}",
                asset, signer
            )),
        }
    }

    fn mint_accessory(&mut self, recipient: Address, seed: &TransactionId) -> AccessoryId {
        let digest = Sha256::digest(seed.0);
        let (name, description) = ACCESSORY_CATALOG[digest[0] as usize % ACCESSORY_CATALOG.len()];
        let id = self.next_accessory;
        self.next_accessory += 1;
        self.register(id, name, description);
        self.holdings.entry(recipient).or_default().insert(id);
        debug!("Simulated reveal minted accessory {} ({}) to {}", id, name, recipient);
        id
    }

    fn register(&mut self, id: AccessoryId, name: &str, description: &str) {
        self.catalog.insert(
            id,
            EquipmentView {
                accessory_id: id,
                name: name.to_string(),
                description: description.to_string(),
                thumbnail: format!("ipfs://accessory-{}.png", id),
            },
        );
    }

    fn answer(&self, account: &Address, query: &Query) -> Result<QueryResult, LedgerError> {
        match *query {
            Query::Holdings(HoldingKind::Moment) => Ok(QueryResult::Holdings(
                self.moments
                    .iter()
                    .filter(|(_, m)| m.owner == *account)
                    .map(|(id, _)| *id)
                    .collect(),
            )),
            Query::Holdings(HoldingKind::Accessory) => Ok(QueryResult::Holdings(
                self.holdings
                    .get(account)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default(),
            )),
            Query::ReceiptExists => Ok(QueryResult::ReceiptExists(
                self.receipts.contains(account),
            )),
            Query::EquipmentView(asset) => {
                let moment = self
                    .moments
                    .get(&asset)
                    .filter(|m| m.owner == *account)
                    .ok_or_else(|| {
                        LedgerError::execution(format!(
                            "Could not borrow view resolver for moment {}",
                            asset
                        ))
                    })?;
                Ok(QueryResult::Equipment(moment.equipped.map(|id| {
                    self.catalog.get(&id).cloned().unwrap_or_else(|| EquipmentView {
                        accessory_id: id,
                        name: format!("Accessory #{}", id),
                        description: String::new(),
                        thumbnail: String::new(),
                    })
                })))
            }
        }
    }
}

/// Shared handle to one simulated ledger; clones observe the same state.
#[derive(Clone, Default)]
pub struct SimulatedLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give `owner` a moment with the given id.
    pub fn add_moment(&self, owner: Address, id: AssetId) {
        let mut state = self.state();
        state.moments.insert(
            id,
            Moment {
                owner,
                equipped: None,
            },
        );
        state.next_moment = state.next_moment.max(id + 1);
    }

    /// Give `owner` a fresh moment and return its id.
    pub fn mint_moment(&self, owner: Address) -> AssetId {
        let id = self.state().next_moment;
        self.add_moment(owner, id);
        id
    }

    /// Put an accessory into `owner`'s free holdings.
    pub fn add_accessory(&self, owner: Address, id: AccessoryId, name: &str) {
        let mut state = self.state();
        state.register(id, name, "");
        state.holdings.entry(owner).or_default().insert(id);
    }

    /// Install an accessory on a moment directly, bypassing holdings.
    pub fn install(&self, asset: AssetId, accessory: AccessoryId, name: &str) {
        let mut state = self.state();
        state.register(accessory, name, "");
        if let Some(moment) = state.moments.get_mut(&asset) {
            moment.equipped = Some(accessory);
        }
    }

    /// Store a Receipt as if a commit sealed in an earlier session.
    pub fn seed_receipt(&self, account: Address) {
        self.state().receipts.insert(account);
    }

    pub fn has_receipt(&self, account: Address) -> bool {
        self.state().receipts.contains(&account)
    }

    pub fn accessories_of(&self, owner: Address) -> Vec<AccessoryId> {
        self.state()
            .holdings
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn equipped_on(&self, asset: AssetId) -> Option<AccessoryId> {
        self.state().moments.get(&asset).and_then(|m| m.equipped)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state().query_count
    }

    /// While frozen, submitted transactions stay at their current status.
    pub fn set_frozen(&self, frozen: bool) {
        self.state().frozen = frozen;
    }

    /// While offline, every call fails as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// New transactions answer `NotFound` for their first `polls` polls.
    pub fn set_hidden_polls(&self, polls: u32) {
        self.state().hidden_polls = polls;
    }

    /// Submissions signed by `account` are declined.
    pub fn decline_signer(&self, account: Address) {
        self.state().declined.insert(account);
    }

    /// The next executed transaction with this label aborts with `message`.
    pub fn fail_next(&self, label: &'static str, message: impl Into<String>) {
        self.state()
            .scripted_failures
            .entry(label)
            .or_default()
            .push_back(message.into());
    }

    /// The next submitted transaction with this label expires instead of executing.
    pub fn expire_next(&self, label: &'static str) {
        *self.state().scripted_expiries.entry(label).or_default() += 1;
    }
}

#[async_trait]
impl LedgerGateway for SimulatedLedger {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn query(&self, account: &Address, query: &Query) -> Result<QueryResult, LedgerError> {
        let mut state = self.state();
        if state.offline {
            return Err(LedgerError::Unreachable("simulated ledger is offline".into()));
        }
        state.query_count += 1;
        state.answer(account, query)
    }

    async fn submit(
        &self,
        kind: &TransactionKind,
        signer: &Address,
    ) -> Result<TransactionId, LedgerError> {
        let mut state = self.state();
        if state.offline {
            return Err(LedgerError::Unreachable("simulated ledger is offline".into()));
        }
        if state.declined.contains(signer) {
            return Err(LedgerError::Declined("User rejected signature".into()));
        }

        let id = state.transaction_id(kind, signer);
        let expires = match state.scripted_expiries.get_mut(kind.label()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        };
        let hidden_polls = state.hidden_polls;
        state.transactions.insert(
            id,
            LedgerTransaction {
                kind: *kind,
                signer: *signer,
                status: TransactionStatus::Unknown,
                error: None,
                hidden_polls,
                expires,
            },
        );
        state.submissions.push(Submission {
            id,
            kind: *kind,
            signer: *signer,
        });
        debug!("Simulated ledger accepted {} {} from {}", kind.label(), id, signer);
        Ok(id)
    }

    async fn poll_status(&self, id: &TransactionId) -> Result<StatusReport, LedgerError> {
        let mut state = self.state();
        if state.offline {
            return Err(LedgerError::Unreachable("simulated ledger is offline".into()));
        }
        state.advance(id)
    }
}
