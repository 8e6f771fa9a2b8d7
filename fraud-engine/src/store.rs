//! Collaborator contracts
//!
//! The engine owns no storage of its own. Everything it reads or writes goes
//! through these traits; [`crate::memory`] provides in-process
//! implementations.

use crate::types::{
    AccountFlag, BlockRecord, FraudAnalysisResult, HistoricalTransaction, IpReputation,
    KnownDevice, TimeRange, UserAccount, UserRiskProfile,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Read-only access to confirmed transactions
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    /// Confirmed transactions of `user_id` in `[start, end)`, most recent first
    async fn list_transactions(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoricalTransaction>>;

    /// Most recent confirmed transactions of `user_id`, most recent first
    async fn list_all_confirmed(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalTransaction>>;

    /// Number of distinct users who have paid with `fingerprint`
    async fn count_users_with_payment_fingerprint(&self, fingerprint: &str) -> Result<u32>;
}

/// Authoritative store of risk profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a profile
    async fn get(&self, user_id: &str) -> Result<Option<UserRiskProfile>>;

    /// Insert or replace a profile
    async fn put(&self, profile: &UserRiskProfile) -> Result<()>;
}

/// Audit trail of analysis results
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist a result
    ///
    /// Results are write-once: a second `put` for the same transaction must
    /// fail and leave the first one in place.
    async fn put(&self, result: &FraudAnalysisResult) -> Result<()>;

    /// Load a result by transaction
    async fn get(&self, transaction_id: &str) -> Result<Option<FraudAnalysisResult>>;

    /// Results analyzed within `range`
    async fn list_between(&self, range: TimeRange) -> Result<Vec<FraudAnalysisResult>>;
}

/// Devices seen per user
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Known devices of `user_id`
    async fn list_devices(&self, user_id: &str) -> Result<Vec<KnownDevice>>;

    /// Record that `fingerprint` was used by `user_id`
    async fn remember_device(
        &self,
        user_id: &str,
        fingerprint: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// User account records
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Load an account
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>>;

    /// Mark an account as suspected of fraud
    async fn flag_account(&self, flag: &AccountFlag) -> Result<()>;
}

/// IP intelligence provider
#[async_trait]
pub trait IpReputationService: Send + Sync {
    /// Look up an address
    async fn check(&self, ip: IpAddr) -> Result<IpReputation>;
}

/// Sink for block records
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Persist a block record
    async fn put_block(&self, record: &BlockRecord) -> Result<()>;
}
