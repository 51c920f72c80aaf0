//! User credits ledger.
//!
//! Profiles are pushed to subscribers on every change through a
//! `tokio::sync::watch` channel per user. Deductions check and decrement
//! under one mutex, so two concurrent deductions can never both pass the
//! balance check.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kroma_models::{PlanTier, UserProfile};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::fs_utils::{read_optional, record_path, write_atomic};

/// Credits backend.
#[async_trait]
pub trait CreditsService: Send + Sync {
    /// Subscribe to a user's profile. Unknown users get the starter profile.
    async fn subscribe(&self, uid: &str) -> StoreResult<watch::Receiver<UserProfile>>;

    /// Current profile.
    async fn profile(&self, uid: &str) -> StoreResult<UserProfile>;

    /// Current balance.
    async fn balance(&self, uid: &str) -> StoreResult<u32> {
        Ok(self.profile(uid).await?.credits)
    }

    /// Deduct `amount` if the balance covers it. Returns false and changes
    /// nothing otherwise.
    async fn deduct(&self, uid: &str, amount: u32) -> StoreResult<bool>;

    /// Add `amount`, saturating at `u32::MAX`.
    async fn credit(&self, uid: &str, amount: u32) -> StoreResult<UserProfile>;

    async fn set_plan(&self, uid: &str, plan: PlanTier) -> StoreResult<UserProfile>;
}

/// Where profiles are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerKind {
    /// `<data_dir>/profiles/<uid>.json`
    File(PathBuf),
    Memory,
}

/// Credits ledger backed by files or memory.
pub struct CreditsLedger {
    kind: LedgerKind,
    accounts: Mutex<HashMap<String, watch::Sender<UserProfile>>>,
}

impl CreditsLedger {
    /// Ledger persisting profiles under `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let root = data_dir.as_ref().join("profiles");
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            kind: LedgerKind::File(root),
            accounts: Mutex::new(HashMap::new()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            kind: LedgerKind::Memory,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> &LedgerKind {
        &self.kind
    }

    async fn load(&self, uid: &str) -> StoreResult<Option<UserProfile>> {
        match &self.kind {
            LedgerKind::File(root) => {
                let path = record_path(root, uid)?;
                match read_optional(&path).await? {
                    Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                    None => Ok(None),
                }
            }
            LedgerKind::Memory => Ok(None),
        }
    }

    async fn persist(&self, profile: &UserProfile) -> StoreResult<()> {
        match &self.kind {
            LedgerKind::File(root) => {
                let path = record_path(root, &profile.uid)?;
                write_atomic(path, serde_json::to_vec_pretty(profile)?).await
            }
            LedgerKind::Memory => Ok(()),
        }
    }

    /// Get the sender for `uid`, loading or creating the profile first.
    /// The caller must hold the accounts lock.
    async fn account<'a>(
        &self,
        accounts: &'a mut HashMap<String, watch::Sender<UserProfile>>,
        uid: &str,
    ) -> StoreResult<&'a watch::Sender<UserProfile>> {
        if !accounts.contains_key(uid) {
            let profile = match self.load(uid).await? {
                Some(profile) => profile,
                None => {
                    let profile = UserProfile::starter(uid);
                    self.persist(&profile).await?;
                    info!(user_id = %uid, credits = profile.credits, "Created starter profile");
                    profile
                }
            };
            let (tx, _rx) = watch::channel(profile);
            accounts.insert(uid.to_string(), tx);
        }
        // Inserted above if missing
        accounts
            .get(uid)
            .ok_or_else(|| crate::error::StoreError::not_found(uid.to_string()))
    }

    /// Apply `update` to a profile, persist it and notify subscribers.
    async fn update<F>(&self, uid: &str, update: F) -> StoreResult<UserProfile>
    where
        F: FnOnce(&mut UserProfile) + Send,
    {
        let mut accounts = self.accounts.lock().await;
        let tx = self.account(&mut accounts, uid).await?;

        let mut profile = tx.borrow().clone();
        update(&mut profile);
        self.persist(&profile).await?;
        tx.send_replace(profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl CreditsService for CreditsLedger {
    async fn subscribe(&self, uid: &str) -> StoreResult<watch::Receiver<UserProfile>> {
        let mut accounts = self.accounts.lock().await;
        let tx = self.account(&mut accounts, uid).await?;
        debug!(user_id = %uid, "New profile subscriber");
        Ok(tx.subscribe())
    }

    async fn profile(&self, uid: &str) -> StoreResult<UserProfile> {
        let mut accounts = self.accounts.lock().await;
        let tx = self.account(&mut accounts, uid).await?;
        let profile = tx.borrow().clone();
        Ok(profile)
    }

    async fn deduct(&self, uid: &str, amount: u32) -> StoreResult<bool> {
        let mut accounts = self.accounts.lock().await;
        let tx = self.account(&mut accounts, uid).await?;

        let mut profile = tx.borrow().clone();
        if !profile.can_afford(amount) {
            warn!(
                user_id = %uid,
                requested = amount,
                available = profile.credits,
                "Insufficient credits"
            );
            return Ok(false);
        }

        profile.credits -= amount;
        self.persist(&profile).await?;
        info!(
            user_id = %uid,
            credits = amount,
            remaining = profile.credits,
            "Deducted credits"
        );
        tx.send_replace(profile);
        Ok(true)
    }

    async fn credit(&self, uid: &str, amount: u32) -> StoreResult<UserProfile> {
        let profile = self
            .update(uid, |p| p.credits = p.credits.saturating_add(amount))
            .await?;
        info!(
            user_id = %uid,
            credits = amount,
            balance = profile.credits,
            "Added credits"
        );
        Ok(profile)
    }

    async fn set_plan(&self, uid: &str, plan: PlanTier) -> StoreResult<UserProfile> {
        let profile = self.update(uid, |p| p.plan = plan).await?;
        info!(user_id = %uid, plan = %plan, "Changed plan");
        Ok(profile)
    }
}
