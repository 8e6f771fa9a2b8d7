//! In-memory collaborators
//!
//! DashMap-backed implementations of every trait in [`crate::store`]. Each
//! one carries a failure switch so dependency outages can be injected.

use crate::store::{
    AccountDirectory, AnalysisStore, BlockStore, DeviceStore, IpReputationService, ProfileStore,
    TransactionHistory,
};
use crate::types::{
    AccountFlag, BlockRecord, FraudAnalysisResult, HistoricalTransaction, IpReputation,
    KnownDevice, TimeRange, UserAccount, UserRiskProfile,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Switch that makes a collaborator return errors
#[derive(Debug, Default)]
pub struct FailureSwitch(AtomicBool);

impl FailureSwitch {
    /// Turn failure injection on or off
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    /// Whether failures are injected
    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, err: impl FnOnce() -> Error) -> Result<()> {
        if self.is_on() {
            Err(err())
        } else {
            Ok(())
        }
    }
}

/// Confirmed transactions keyed by user
#[derive(Debug, Default)]
pub struct InMemoryTransactionHistory {
    transactions: DashMap<String, Vec<HistoricalTransaction>>,
    // fingerprint -> users
    fingerprints: DashMap<String, BTreeSet<String>>,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryTransactionHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed transaction
    pub fn record(&self, user_id: &str, transaction: HistoricalTransaction) {
        self.transactions
            .entry(user_id.to_string())
            .or_default()
            .push(transaction);
    }

    /// Record that `user_id` paid with `fingerprint`
    pub fn record_fingerprint(&self, user_id: &str, fingerprint: &str) {
        self.fingerprints
            .entry(fingerprint.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    fn sorted_for(&self, user_id: &str) -> Vec<HistoricalTransaction> {
        let mut txs = self
            .transactions
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        txs
    }
}

#[async_trait]
impl TransactionHistory for InMemoryTransactionHistory {
    async fn list_transactions(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoricalTransaction>> {
        self.failure
            .check(|| Error::History("transaction history unavailable".to_string()))?;
        Ok(self
            .sorted_for(user_id)
            .into_iter()
            .filter(|tx| tx.timestamp >= start && tx.timestamp < end)
            .collect())
    }

    async fn list_all_confirmed(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalTransaction>> {
        self.failure
            .check(|| Error::History("transaction history unavailable".to_string()))?;
        let mut txs = self.sorted_for(user_id);
        txs.truncate(limit);
        Ok(txs)
    }

    async fn count_users_with_payment_fingerprint(&self, fingerprint: &str) -> Result<u32> {
        self.failure
            .check(|| Error::History("transaction history unavailable".to_string()))?;
        Ok(self
            .fingerprints
            .get(fingerprint)
            .map(|users| users.len() as u32)
            .unwrap_or(0))
    }
}

/// Profiles keyed by user
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, UserRiskProfile>,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserRiskProfile>> {
        self.failure
            .check(|| Error::Store("profile store unavailable".to_string()))?;
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn put(&self, profile: &UserRiskProfile) -> Result<()> {
        self.failure
            .check(|| Error::Store("profile store unavailable".to_string()))?;
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

/// Analysis results keyed by transaction
#[derive(Debug, Default)]
pub struct InMemoryAnalysisStore {
    results: DashMap<String, FraudAnalysisResult>,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryAnalysisStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn put(&self, result: &FraudAnalysisResult) -> Result<()> {
        self.failure
            .check(|| Error::Store("analysis store unavailable".to_string()))?;
        match self.results.entry(result.transaction_id.clone()) {
            Entry::Occupied(_) => Err(Error::Store(format!(
                "analysis for {} already recorded",
                result.transaction_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(result.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<FraudAnalysisResult>> {
        self.failure
            .check(|| Error::Store("analysis store unavailable".to_string()))?;
        Ok(self.results.get(transaction_id).map(|r| r.value().clone()))
    }

    async fn list_between(&self, range: TimeRange) -> Result<Vec<FraudAnalysisResult>> {
        self.failure
            .check(|| Error::Store("analysis store unavailable".to_string()))?;
        Ok(self
            .results
            .iter()
            .filter(|r| range.contains(r.metadata.analyzed_at))
            .map(|r| r.value().clone())
            .collect())
    }
}

/// Known devices keyed by user
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    devices: DashMap<String, Vec<KnownDevice>>,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryDeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn list_devices(&self, user_id: &str) -> Result<Vec<KnownDevice>> {
        self.failure
            .check(|| Error::DeviceStore("device store unavailable".to_string()))?;
        Ok(self
            .devices
            .get(user_id)
            .map(|d| d.value().clone())
            .unwrap_or_default())
    }

    async fn remember_device(
        &self,
        user_id: &str,
        fingerprint: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        self.failure
            .check(|| Error::DeviceStore("device store unavailable".to_string()))?;
        let mut devices = self.devices.entry(user_id.to_string()).or_default();
        match devices.iter_mut().find(|d| d.fingerprint == fingerprint) {
            Some(device) => {
                if seen_at > device.last_seen {
                    device.last_seen = seen_at;
                }
            }
            None => devices.push(KnownDevice {
                fingerprint: fingerprint.to_string(),
                last_seen: seen_at,
            }),
        }
        Ok(())
    }
}

/// Accounts and fraud flags keyed by user
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: DashMap<String, UserAccount>,
    flags: DashMap<String, AccountFlag>,
    /// Failure injection for reads
    pub failure: FailureSwitch,
    /// Failure injection for flag writes
    pub flag_failure: FailureSwitch,
}

impl InMemoryAccountDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account
    pub fn insert(&self, account: UserAccount) {
        self.accounts.insert(account.user_id.clone(), account);
    }

    /// Current flag of a user, if any
    pub fn flag_of(&self, user_id: &str) -> Option<AccountFlag> {
        self.flags.get(user_id).map(|f| f.value().clone())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>> {
        self.failure
            .check(|| Error::Account("account directory unavailable".to_string()))?;
        Ok(self.accounts.get(user_id).map(|a| a.value().clone()))
    }

    async fn flag_account(&self, flag: &AccountFlag) -> Result<()> {
        self.flag_failure
            .check(|| Error::Account("account flag update failed".to_string()))?;
        self.flags.insert(flag.user_id.clone(), flag.clone());
        Ok(())
    }
}

/// Static IP reputation table; unknown addresses are clean
#[derive(Debug, Default)]
pub struct InMemoryIpReputation {
    entries: DashMap<IpAddr, IpReputation>,
    lookups: AtomicU64,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryIpReputation {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verdict for an address
    pub fn insert(&self, ip: IpAddr, reputation: IpReputation) {
        self.entries.insert(ip, reputation);
    }

    /// Lookups served, including failed ones
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpReputationService for InMemoryIpReputation {
    async fn check(&self, ip: IpAddr) -> Result<IpReputation> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.failure
            .check(|| Error::Reputation("reputation provider unavailable".to_string()))?;
        Ok(self
            .entries
            .get(&ip)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// Block records keyed by transaction
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    records: DashMap<String, BlockRecord>,
    /// Failure injection
    pub failure: FailureSwitch,
}

impl InMemoryBlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Block record for a transaction
    pub fn get(&self, transaction_id: &str) -> Option<BlockRecord> {
        self.records.get(transaction_id).map(|r| r.value().clone())
    }

    /// Number of block records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn put_block(&self, record: &BlockRecord) -> Result<()> {
        self.failure
            .check(|| Error::Store("block store unavailable".to_string()))?;
        self.records
            .insert(record.transaction_id.clone(), record.clone());
        Ok(())
    }
}
