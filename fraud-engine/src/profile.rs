//! Risk profile lifecycle
//!
//! - **Bootstrap**: first analysis of a user builds factors, a base score and
//!   a history summary from the account record and confirmed transactions.
//! - **Refresh**: a history summary older than the refresh interval is
//!   recomputed on load; the smoothed score is kept.
//! - **Update**: every committed analysis folds its score into the profile
//!   by exponential smoothing.

use crate::cache::ProfileCache;
use crate::config::ProfileConfig;
use crate::decision::DecisionClassifier;
use crate::metrics::Metrics;
use crate::store::{AccountDirectory, ProfileStore, TransactionHistory};
use crate::types::{
    clamp_score, FraudAnalysisResult, HistoricalAnalysis, HistoricalTransaction, PaymentMethod,
    RiskFactors, RiskLevel, UserAccount, UserRiskProfile, UserRiskSummary, VerificationStatus,
};
use crate::Result;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Flag set on a profile once an analysis lands in the high or critical tier
pub const HIGH_RISK_ACTIVITY_FLAG: &str = "high_risk_activity";

/// Days of account age that earn the full account-age factor
const FULL_ACCOUNT_AGE_DAYS: f64 = 30.0;
/// Factor value assumed when there is nothing to measure yet
const NEUTRAL_FACTOR: f64 = 50.0;
/// Share of history an hour needs to count as typical
const TYPICAL_HOUR_SHARE: f64 = 0.1;
/// Preferred payment methods kept per profile
const MAX_PREFERRED_METHODS: usize = 3;

// Base score weights: account age, history, verification, behavior, network
const ACCOUNT_AGE_WEIGHT: f64 = 0.2;
const HISTORY_WEIGHT: f64 = 0.3;
const VERIFICATION_WEIGHT: f64 = 0.25;
const BEHAVIOR_WEIGHT: f64 = 0.15;
const NETWORK_WEIGHT: f64 = 0.1;

/// Factors derived from the account record and history depth
pub fn compute_factors(
    account: Option<&UserAccount>,
    transaction_count: u32,
    now: DateTime<Utc>,
) -> RiskFactors {
    let account_age = account
        .map(|a| {
            let days = (now - a.created_at).num_seconds() as f64 / 86_400.0;
            (days / FULL_ACCOUNT_AGE_DAYS * 100.0).clamp(0.0, 100.0)
        })
        .unwrap_or(0.0);

    let verification_level = match account.map(|a| a.verification_status) {
        Some(VerificationStatus::Approved) => 100.0,
        _ => 0.0,
    };

    RiskFactors {
        account_age,
        transaction_history: history_factor(transaction_count),
        verification_level,
        behavioral_consistency: NEUTRAL_FACTOR,
        network_reputation: NEUTRAL_FACTOR,
    }
}

fn history_factor(transaction_count: u32) -> f64 {
    (transaction_count as f64 * 10.0).min(100.0)
}

/// `Σ (100 - factor) × weight`, clamped to 0-100
pub fn base_score(factors: &RiskFactors) -> f64 {
    let score = (100.0 - factors.account_age) * ACCOUNT_AGE_WEIGHT
        + (100.0 - factors.transaction_history) * HISTORY_WEIGHT
        + (100.0 - factors.verification_level) * VERIFICATION_WEIGHT
        + (100.0 - factors.behavioral_consistency) * BEHAVIOR_WEIGHT
        + (100.0 - factors.network_reputation) * NETWORK_WEIGHT;
    clamp_score(score)
}

/// Summarize confirmed transactions into a behavioral baseline
pub fn summarize_history(
    transactions: &[HistoricalTransaction],
    now: DateTime<Utc>,
) -> HistoricalAnalysis {
    if transactions.is_empty() {
        return HistoricalAnalysis::empty(now);
    }

    let count = transactions.len();
    let total: f64 = transactions.iter().map(|t| t.amount as f64).sum();

    let active_hours: HashSet<i64> = transactions
        .iter()
        .map(|t| t.timestamp.timestamp().div_euclid(3600))
        .collect();

    let mut method_counts: HashMap<PaymentMethod, usize> = HashMap::new();
    let mut hour_counts = [0usize; 24];
    let mut countries = BTreeSet::new();
    for tx in transactions {
        *method_counts.entry(tx.payment_method).or_default() += 1;
        hour_counts[tx.timestamp.hour() as usize] += 1;
        if let Some(country) = tx.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            countries.insert(country.to_uppercase());
        }
    }

    let mut methods: Vec<(PaymentMethod, usize)> = method_counts.into_iter().collect();
    methods.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let preferred_payment_methods = methods
        .into_iter()
        .take(MAX_PREFERRED_METHODS)
        .map(|(method, _)| method)
        .collect();

    let typical_hours = hour_counts
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0 && **n as f64 >= count as f64 * TYPICAL_HOUR_SHARE)
        .map(|(hour, _)| hour as u8)
        .collect();

    HistoricalAnalysis {
        average_amount: total / count as f64,
        transaction_frequency: count as f64 / active_hours.len() as f64,
        transaction_count: count as u32,
        preferred_payment_methods,
        typical_hours,
        countries,
        refreshed_at: now,
    }
}

/// Owns profile loading, creation and updates
pub struct ProfileManager {
    store: Arc<dyn ProfileStore>,
    history: Arc<dyn TransactionHistory>,
    accounts: Arc<dyn AccountDirectory>,
    cache: ProfileCache,
    classifier: DecisionClassifier,
    config: ProfileConfig,
    metrics: Arc<Metrics>,
}

impl ProfileManager {
    /// Create a new profile manager
    pub fn new(
        store: Arc<dyn ProfileStore>,
        history: Arc<dyn TransactionHistory>,
        accounts: Arc<dyn AccountDirectory>,
        classifier: DecisionClassifier,
        config: ProfileConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let cache = ProfileCache::new(std::time::Duration::from_secs(config.cache_ttl_secs));
        Self {
            store,
            history,
            accounts,
            cache,
            classifier,
            config,
            metrics,
        }
    }

    /// Cached profile, then stored profile, then a freshly bootstrapped one
    pub async fn load_or_create(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserRiskProfile> {
        let profile = match self.cache.get(user_id) {
            Some(profile) => {
                self.metrics.record_cache_hit();
                profile
            }
            None => {
                self.metrics.record_cache_miss();
                match self.store.get(user_id).await? {
                    Some(profile) => {
                        self.cache.insert(profile.clone());
                        profile
                    }
                    None => {
                        let profile = self.bootstrap(user_id, now).await?;
                        info!(
                            user_id,
                            risk_score = profile.risk_score,
                            transactions = profile.historical_analysis.transaction_count,
                            "Created risk profile"
                        );
                        self.persist(&profile).await;
                        return Ok(profile);
                    }
                }
            }
        };

        if self.is_baseline_stale(&profile, now) {
            return Ok(self.refresh_baseline(profile, now).await);
        }
        Ok(profile)
    }

    /// Build a profile for a user seen for the first time
    pub async fn bootstrap(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserRiskProfile> {
        let account = self.accounts.get_account(user_id).await?;
        let transactions = self
            .history
            .list_all_confirmed(user_id, self.config.bootstrap_history_limit)
            .await?;

        let historical_analysis = summarize_history(&transactions, now);
        let factors = compute_factors(
            account.as_ref(),
            historical_analysis.transaction_count,
            now,
        );
        let risk_score = base_score(&factors);

        Ok(UserRiskProfile {
            user_id: user_id.to_string(),
            risk_score,
            risk_level: self.classifier.risk_level(risk_score),
            factors,
            flags: BTreeSet::new(),
            created_at: now,
            last_updated: now,
            historical_analysis,
        })
    }

    fn is_baseline_stale(&self, profile: &UserRiskProfile, now: DateTime<Utc>) -> bool {
        now - profile.historical_analysis.refreshed_at
            > Duration::hours(self.config.baseline_refresh_hours)
    }

    /// Recompute the history summary; the old baseline is kept if history is unavailable
    async fn refresh_baseline(&self, mut profile: UserRiskProfile, now: DateTime<Utc>) -> UserRiskProfile {
        match self
            .history
            .list_all_confirmed(&profile.user_id, self.config.bootstrap_history_limit)
            .await
        {
            Ok(transactions) => {
                profile.historical_analysis = summarize_history(&transactions, now);
                profile.factors.transaction_history =
                    history_factor(profile.historical_analysis.transaction_count);
                debug!(
                    user_id = %profile.user_id,
                    transactions = profile.historical_analysis.transaction_count,
                    "Refreshed behavioral baseline"
                );
                self.persist(&profile).await;
            }
            Err(e) => {
                warn!(user_id = %profile.user_id, error = %e, "Baseline refresh failed, keeping stale baseline");
            }
        }
        profile
    }

    /// Fold an analysis into a profile by exponential smoothing
    pub fn apply_analysis(
        &self,
        profile: &UserRiskProfile,
        result: &FraudAnalysisResult,
    ) -> UserRiskProfile {
        let weight = self.config.smoothing_weight;
        let mut updated = profile.clone();

        updated.risk_score =
            clamp_score(profile.risk_score * (1.0 - weight) + result.risk_score * weight);
        updated.risk_level = self.classifier.risk_level(updated.risk_score);
        updated.last_updated = Utc::now();
        if result.risk_level >= RiskLevel::High {
            updated.flags.insert(HIGH_RISK_ACTIVITY_FLAG.to_string());
        }
        updated
    }

    /// Apply an analysis and write the result through cache and store
    pub async fn commit(&self, profile: &UserRiskProfile, result: &FraudAnalysisResult) -> UserRiskProfile {
        let updated = self.apply_analysis(profile, result);
        debug!(
            user_id = %updated.user_id,
            previous = profile.risk_score,
            current = updated.risk_score,
            "Updated profile risk score"
        );
        self.persist(&updated).await;
        updated
    }

    /// Write-through; store failures are logged, the cache is always updated
    async fn persist(&self, profile: &UserRiskProfile) {
        if let Err(e) = self.store.put(profile).await {
            warn!(user_id = %profile.user_id, error = %e, "Failed to persist risk profile");
        }
        self.cache.insert(profile.clone());
    }

    /// Read-only view of a user's profile without creating one
    pub async fn summary(&self, user_id: &str) -> Result<Option<UserRiskSummary>> {
        if let Some(profile) = self.cache.get(user_id) {
            return Ok(Some(UserRiskSummary::from(&profile)));
        }
        Ok(self
            .store
            .get(user_id)
            .await?
            .map(|profile| UserRiskSummary::from(&profile)))
    }

    /// Profile cache
    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryAccountDirectory, InMemoryProfileStore, InMemoryTransactionHistory};
    use crate::types::{AnalysisMetadata, Recommendation};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn tx(amount: i64, at: DateTime<Utc>, method: PaymentMethod, country: &str) -> HistoricalTransaction {
        HistoricalTransaction {
            transaction_id: format!("h-{}", at.timestamp()),
            amount,
            timestamp: at,
            country: Some(country.to_string()),
            payment_method: method,
        }
    }

    fn result_with_score(score: f64, level: RiskLevel) -> FraudAnalysisResult {
        FraudAnalysisResult {
            transaction_id: "tx".to_string(),
            user_id: "u1".to_string(),
            risk_score: score,
            risk_level: level,
            indicators: vec![],
            recommendation: Recommendation::Approve,
            confidence: 0.5,
            metadata: AnalysisMetadata {
                analyzed_at: now(),
                ruleset_version: "test".to_string(),
                processing_time_ms: 0,
                failed_analyzers: vec![],
                fail_open: false,
            },
        }
    }

    struct Fixture {
        store: Arc<InMemoryProfileStore>,
        history: Arc<InMemoryTransactionHistory>,
        accounts: Arc<InMemoryAccountDirectory>,
        manager: ProfileManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryProfileStore::new());
        let history = Arc::new(InMemoryTransactionHistory::new());
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let manager = ProfileManager::new(
            store.clone(),
            history.clone(),
            accounts.clone(),
            DecisionClassifier::default(),
            ProfileConfig::default(),
            Arc::new(Metrics::default()),
        );
        Fixture {
            store,
            history,
            accounts,
            manager,
        }
    }

    #[test]
    fn test_factors_for_established_verified_account() {
        let account = UserAccount {
            user_id: "u1".to_string(),
            created_at: now() - Duration::days(90),
            verification_status: VerificationStatus::Approved,
        };
        let factors = compute_factors(Some(&account), 4, now());
        assert_eq!(factors.account_age, 100.0);
        assert_eq!(factors.transaction_history, 40.0);
        assert_eq!(factors.verification_level, 100.0);
        assert_eq!(factors.behavioral_consistency, 50.0);
    }

    #[test]
    fn test_base_score_of_unknown_user() {
        let factors = compute_factors(None, 0, now());
        // 20 + 30 + 25 + 7.5 + 5
        assert!((base_score(&factors) - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_base_score_of_half_aged_account() {
        let account = UserAccount {
            user_id: "u1".to_string(),
            created_at: now() - Duration::days(15),
            verification_status: VerificationStatus::Pending,
        };
        let factors = compute_factors(Some(&account), 20, now());
        // 10 + 0 + 25 + 7.5 + 5
        assert!((base_score(&factors) - 47.5).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_history() {
        let day = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        let transactions = vec![
            tx(1_000, day + Duration::hours(9), PaymentMethod::Card, "US"),
            tx(3_000, day + Duration::hours(9) + Duration::minutes(20), PaymentMethod::Card, "us"),
            tx(2_000, day + Duration::hours(33), PaymentMethod::Wallet, "CA"),
            tx(2_000, day + Duration::hours(57), PaymentMethod::BankTransfer, "US"),
            tx(2_000, day + Duration::hours(80), PaymentMethod::Other, "US"),
        ];

        let summary = summarize_history(&transactions, now());
        assert_eq!(summary.transaction_count, 5);
        assert_eq!(summary.average_amount, 2_000.0);
        // five transactions across four active hours
        assert_eq!(summary.transaction_frequency, 1.25);
        assert_eq!(summary.preferred_payment_methods.len(), 3);
        assert_eq!(summary.preferred_payment_methods[0], PaymentMethod::Card);
        assert_eq!(
            summary.typical_hours,
            [8u8, 9].into_iter().collect::<BTreeSet<u8>>()
        );
        assert_eq!(
            summary.countries,
            ["CA", "US"]
                .iter()
                .map(|c| c.to_string())
                .collect::<BTreeSet<String>>()
        );
    }

    #[test]
    fn test_summarize_empty_history() {
        let summary = summarize_history(&[], now());
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.average_amount, 0.0);
        assert!(summary.typical_hours.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_persists_and_caches() {
        let f = fixture();
        f.accounts.insert(UserAccount {
            user_id: "u1".to_string(),
            created_at: now() - Duration::days(60),
            verification_status: VerificationStatus::Approved,
        });
        f.history.record("u1", tx(5_000, now() - Duration::days(2), PaymentMethod::Card, "US"));

        let profile = f.manager.load_or_create("u1", now()).await.unwrap();
        assert_eq!(profile.historical_analysis.transaction_count, 1);
        assert_eq!(profile.factors.transaction_history, 10.0);
        // 0 + 27 + 0 + 7.5 + 5
        assert!((profile.risk_score - 39.5).abs() < 1e-9);
        assert_eq!(f.store.len(), 1);
        assert!(f.manager.cache().get("u1").is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_failure_propagates() {
        let f = fixture();
        f.history.failure.set(true);
        assert!(f.manager.load_or_create("u1", now()).await.is_err());
    }

    #[tokio::test]
    async fn test_store_is_read_when_cache_is_cold() {
        let f = fixture();
        let mut stored = f.manager.bootstrap("u1", now()).await.unwrap();
        stored.risk_score = 12.0;
        f.store.put(&stored).await.unwrap();

        let loaded = f.manager.load_or_create("u1", now()).await.unwrap();
        assert_eq!(loaded.risk_score, 12.0);
    }

    #[tokio::test]
    async fn test_stale_baseline_is_refreshed() {
        let f = fixture();
        let mut stored = f.manager.bootstrap("u1", now()).await.unwrap();
        stored.risk_score = 33.0;
        stored.historical_analysis.refreshed_at = now() - Duration::hours(48);
        f.store.put(&stored).await.unwrap();
        f.history.record("u1", tx(7_000, now() - Duration::hours(3), PaymentMethod::Card, "FR"));

        let loaded = f.manager.load_or_create("u1", now()).await.unwrap();
        assert_eq!(loaded.risk_score, 33.0);
        assert_eq!(loaded.historical_analysis.transaction_count, 1);
        assert!(loaded.historical_analysis.countries.contains("FR"));
        assert_eq!(loaded.historical_analysis.refreshed_at, now());
    }

    #[tokio::test]
    async fn test_commit_smooths_score() {
        let f = fixture();
        let mut profile = f.manager.bootstrap("u1", now()).await.unwrap();
        profile.risk_score = 20.0;

        let updated = f
            .manager
            .commit(&profile, &result_with_score(80.0, RiskLevel::High))
            .await;
        // 20 * 0.7 + 80 * 0.3
        assert!((updated.risk_score - 38.0).abs() < 1e-9);
        assert_eq!(updated.risk_level, RiskLevel::Low);
        assert!(updated.flags.contains(HIGH_RISK_ACTIVITY_FLAG));

        let stored = f.store.get("u1").await.unwrap().unwrap();
        assert_eq!(stored.risk_score, updated.risk_score);
    }

    #[tokio::test]
    async fn test_commit_survives_store_failure() {
        let f = fixture();
        let profile = f.manager.bootstrap("u1", now()).await.unwrap();
        f.store.failure.set(true);

        let updated = f
            .manager
            .commit(&profile, &result_with_score(10.0, RiskLevel::Low))
            .await;
        assert_eq!(
            f.manager.cache().get("u1").map(|p| p.risk_score),
            Some(updated.risk_score)
        );
    }

    #[tokio::test]
    async fn test_summary_does_not_create_profiles() {
        let f = fixture();
        assert!(f.manager.summary("ghost").await.unwrap().is_none());
        assert!(f.store.is_empty());
    }
}
