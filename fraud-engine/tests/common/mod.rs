//! Shared harness for engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use fraud_engine::memory::{
    InMemoryAccountDirectory, InMemoryAnalysisStore, InMemoryBlockStore, InMemoryDeviceStore,
    InMemoryIpReputation, InMemoryProfileStore, InMemoryTransactionHistory,
};
use fraud_engine::{
    Collaborators, FraudConfig, FraudEngine, HistoricalTransaction, PaymentDescriptor,
    PaymentMethod, TransactionContext, TransactionSource, TransactionType, UserAccount,
    VerificationStatus,
};
use std::sync::Arc;

/// Fixed analysis time used by every scenario
pub fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap()
}

pub struct Harness {
    pub history: Arc<InMemoryTransactionHistory>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub analyses: Arc<InMemoryAnalysisStore>,
    pub devices: Arc<InMemoryDeviceStore>,
    pub accounts: Arc<InMemoryAccountDirectory>,
    pub reputation: Arc<InMemoryIpReputation>,
    pub blocks: Arc<InMemoryBlockStore>,
    pub engine: FraudEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(FraudConfig::default())
    }

    pub fn with_config(config: FraudConfig) -> Self {
        let history = Arc::new(InMemoryTransactionHistory::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let analyses = Arc::new(InMemoryAnalysisStore::new());
        let devices = Arc::new(InMemoryDeviceStore::new());
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let reputation = Arc::new(InMemoryIpReputation::new());
        let blocks = Arc::new(InMemoryBlockStore::new());

        let engine = FraudEngine::new(
            config,
            Collaborators {
                history: history.clone(),
                profiles: profiles.clone(),
                analyses: analyses.clone(),
                devices: devices.clone(),
                accounts: accounts.clone(),
                reputation: reputation.clone(),
                blocks: blocks.clone(),
            },
        )
        .unwrap();

        Self {
            history,
            profiles,
            analyses,
            devices,
            accounts,
            reputation,
            blocks,
            engine,
        }
    }

    /// Verified account created `age_days` before the analysis time
    pub fn verified_account(&self, user_id: &str, age_days: i64) {
        self.accounts.insert(UserAccount {
            user_id: user_id.to_string(),
            created_at: at() - Duration::days(age_days),
            verification_status: VerificationStatus::Approved,
        });
    }

    /// One confirmed card payment from the US per day at noon, for `days` days
    pub fn daily_history(&self, user_id: &str, days: i64, amount: i64) {
        let noon = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        for day in 0..days {
            self.history.record(
                user_id,
                HistoricalTransaction {
                    transaction_id: format!("{}-day-{}", user_id, day),
                    amount,
                    timestamp: noon - Duration::days(day),
                    country: Some("US".to_string()),
                    payment_method: PaymentMethod::Card,
                },
            );
        }
    }

    /// A confirmed transaction `minutes_ago` before the analysis time
    pub fn recent(&self, user_id: &str, id: &str, amount: i64, minutes_ago: i64, country: &str) {
        self.history.record(
            user_id,
            HistoricalTransaction {
                transaction_id: id.to_string(),
                amount,
                timestamp: at() - Duration::minutes(minutes_ago),
                country: Some(country.to_string()),
                payment_method: PaymentMethod::Card,
            },
        );
    }
}

/// Card contribution from the US at the analysis time
pub fn transaction(id: &str, user_id: &str, amount: i64) -> TransactionContext {
    TransactionContext {
        transaction_id: id.to_string(),
        user_id: user_id.to_string(),
        amount,
        currency: "USD".to_string(),
        transaction_type: TransactionType::Contribution,
        source: TransactionSource {
            country: Some("US".to_string()),
            ..Default::default()
        },
        payment: PaymentDescriptor {
            method: PaymentMethod::Card,
            fingerprint: None,
        },
        timestamp: at(),
        metadata: serde_json::Map::new(),
    }
}
