//! Fraud detection engine
//!
//! Request path for one transaction:
//!
//! 1. validate the context (the only error surfaced to callers)
//! 2. load or bootstrap the user's profile, fetch the trailing history window
//! 3. run every analyzer concurrently, each under its own timeout
//! 4. aggregate, classify, then commit: audit record, profile update,
//!    device memory and enforcement
//!
//! A dependency failure in step 2 produces the fail-open result instead.

use crate::aggregator::RiskAggregator;
use crate::analyzers::{
    device_fingerprint, AnalysisInput, Analyzer, BehavioralAnalyzer, DeviceAnalyzer,
    GeolocationAnalyzer, NetworkAnalyzer, PatternAnalyzer, VelocityAnalyzer,
};
use crate::config::FraudConfig;
use crate::decision::DecisionClassifier;
use crate::enforcement::EnforcementTrigger;
use crate::memory::{
    InMemoryAccountDirectory, InMemoryAnalysisStore, InMemoryBlockStore, InMemoryDeviceStore,
    InMemoryIpReputation, InMemoryProfileStore, InMemoryTransactionHistory,
};
use crate::metrics::Metrics;
use crate::profile::ProfileManager;
use crate::rules::Rule;
use crate::store::{
    AccountDirectory, AnalysisStore, BlockStore, DeviceStore, IpReputationService, ProfileStore,
    TransactionHistory,
};
use crate::types::{
    AnalysisMetadata, FraudAnalysisResult, FraudIndicator, FraudStatistics, Recommendation,
    RiskLevel, TimeRange, TransactionContext, UserRiskProfile, UserRiskSummary,
};
use crate::{Error, Result};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Score of the fail-open result
const FAIL_OPEN_SCORE: f64 = 50.0;
/// Confidence of the fail-open result
const FAIL_OPEN_CONFIDENCE: f64 = 0.5;

/// External collaborators of the engine
#[derive(Clone)]
pub struct Collaborators {
    /// Confirmed transaction history
    pub history: Arc<dyn TransactionHistory>,
    /// Risk profile store
    pub profiles: Arc<dyn ProfileStore>,
    /// Analysis audit store
    pub analyses: Arc<dyn AnalysisStore>,
    /// Known devices
    pub devices: Arc<dyn DeviceStore>,
    /// Account directory
    pub accounts: Arc<dyn AccountDirectory>,
    /// IP reputation provider
    pub reputation: Arc<dyn IpReputationService>,
    /// Block records
    pub blocks: Arc<dyn BlockStore>,
}

impl Collaborators {
    /// Fresh in-memory collaborators
    pub fn in_memory() -> Self {
        Self {
            history: Arc::new(InMemoryTransactionHistory::new()),
            profiles: Arc::new(InMemoryProfileStore::new()),
            analyses: Arc::new(InMemoryAnalysisStore::new()),
            devices: Arc::new(InMemoryDeviceStore::new()),
            accounts: Arc::new(InMemoryAccountDirectory::new()),
            reputation: Arc::new(InMemoryIpReputation::new()),
            blocks: Arc::new(InMemoryBlockStore::new()),
        }
    }
}

/// Outcome of the analyzer fan-out
struct AnalyzerRun {
    indicators: Vec<FraudIndicator>,
    failed: Vec<String>,
}

/// Result computed for a transaction, before any side effect
struct Evaluation {
    result: FraudAnalysisResult,
    profile: UserRiskProfile,
}

/// Real-time transaction risk scoring
pub struct FraudEngine {
    config: FraudConfig,
    history: Arc<dyn TransactionHistory>,
    analyses: Arc<dyn AnalysisStore>,
    devices: Arc<dyn DeviceStore>,
    profiles: ProfileManager,
    analyzers: Vec<Arc<dyn Analyzer>>,
    aggregator: RiskAggregator,
    classifier: DecisionClassifier,
    enforcement: EnforcementTrigger,
    metrics: Arc<Metrics>,
}

impl FraudEngine {
    /// Create an engine with its own metrics registry
    pub fn new(config: FraudConfig, collaborators: Collaborators) -> Result<Self> {
        let metrics = Arc::new(Metrics::new()?);
        Self::with_metrics(config, collaborators, metrics)
    }

    /// Create an engine reporting to an existing metrics collector
    pub fn with_metrics(
        config: FraudConfig,
        collaborators: Collaborators,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        config.validate()?;

        let classifier = DecisionClassifier::new(config.thresholds.clone());
        let profiles = ProfileManager::new(
            collaborators.profiles.clone(),
            collaborators.history.clone(),
            collaborators.accounts.clone(),
            classifier.clone(),
            config.profile.clone(),
            metrics.clone(),
        );

        // Indicator order in results follows this list
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(VelocityAnalyzer::new(config.velocity.clone())),
            Arc::new(BehavioralAnalyzer::new(config.behavioral.clone())),
            Arc::new(GeolocationAnalyzer::new(config.geolocation.clone())),
            Arc::new(DeviceAnalyzer::new(collaborators.devices.clone())),
            Arc::new(PatternAnalyzer::new(
                config.pattern.clone(),
                config.detection.pattern_recognition,
                collaborators.history.clone(),
            )),
            Arc::new(NetworkAnalyzer::new(
                collaborators.reputation.clone(),
                &config.reputation_circuit,
            )),
        ];

        let enforcement = EnforcementTrigger::new(
            config.enforcement.clone(),
            collaborators.blocks.clone(),
            collaborators.accounts.clone(),
            metrics.clone(),
        );

        info!(
            service = %config.service_name,
            ruleset = %config.ruleset_version,
            analyzers = analyzers.len(),
            "Fraud engine initialized"
        );

        Ok(Self {
            aggregator: RiskAggregator::new(config.detection.anomaly_detection),
            config,
            history: collaborators.history,
            analyses: collaborators.analyses,
            devices: collaborators.devices,
            profiles,
            analyzers,
            classifier,
            enforcement,
            metrics,
        })
    }

    /// Analyze a transaction and commit the outcome
    ///
    /// Only caller errors are returned. Dependency failures produce the
    /// fail-open result.
    #[instrument(skip(self, ctx), fields(transaction_id = %ctx.transaction_id, user_id = %ctx.user_id))]
    pub async fn analyze(&self, ctx: &TransactionContext) -> Result<FraudAnalysisResult> {
        self.analyze_within(ctx, None).await
    }

    /// [`analyze`](Self::analyze) with a deadline on evaluation; expiry fails open
    ///
    /// The deadline covers profile loading, the history fetch and the
    /// analyzers. Once a result is decided its commit always runs to
    /// completion, so the stored profile, audit record and enforcement agree
    /// with what the caller receives. On expiry nothing from the abandoned
    /// evaluation is committed and the fail-open result is recorded instead.
    #[instrument(skip(self, ctx), fields(transaction_id = %ctx.transaction_id, user_id = %ctx.user_id))]
    pub async fn analyze_with_deadline(
        &self,
        ctx: &TransactionContext,
        deadline: Duration,
    ) -> Result<FraudAnalysisResult> {
        self.analyze_within(ctx, Some(deadline)).await
    }

    /// Score a transaction without persisting anything about the analysis
    ///
    /// Repeated calls with the same context and collaborator state return the
    /// same score, level, recommendation and indicators.
    #[instrument(skip(self, ctx), fields(transaction_id = %ctx.transaction_id, user_id = %ctx.user_id))]
    pub async fn score(&self, ctx: &TransactionContext) -> Result<FraudAnalysisResult> {
        ctx.validate()?;
        let started = Instant::now();

        match self.evaluate(ctx, started).await {
            Ok(evaluation) => Ok(evaluation.result),
            Err(e) if e.is_dependency_failure() => Ok(self.fail_open(ctx, &e, started)),
            Err(e) => Err(e),
        }
    }

    /// Stored analysis of a transaction
    pub async fn get_analysis(&self, transaction_id: &str) -> Result<Option<FraudAnalysisResult>> {
        self.analyses.get(transaction_id).await
    }

    /// Read-only view of a user's risk profile
    pub async fn get_user_risk_summary(&self, user_id: &str) -> Result<Option<UserRiskSummary>> {
        self.profiles.summary(user_id).await
    }

    /// Aggregate statistics over analyses in `range`
    pub async fn get_statistics(&self, range: TimeRange) -> Result<FraudStatistics> {
        let results = self.analyses.list_between(range).await?;
        Ok(statistics(&results))
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    async fn analyze_within(
        &self,
        ctx: &TransactionContext,
        deadline: Option<Duration>,
    ) -> Result<FraudAnalysisResult> {
        ctx.validate()?;
        let started = Instant::now();

        let evaluated = match deadline {
            Some(deadline) => timeout(deadline, self.evaluate(ctx, started))
                .await
                .unwrap_or_else(|_| Err(Error::Timeout(deadline.as_millis() as u64))),
            None => self.evaluate(ctx, started).await,
        };

        let result = match evaluated {
            Ok(evaluation) => {
                self.commit(ctx, &evaluation).await;
                evaluation.result
            }
            Err(e) if e.is_dependency_failure() => {
                let result = self.fail_open(ctx, &e, started);
                self.persist_analysis(&result).await;
                result
            }
            Err(e) => return Err(e),
        };

        self.metrics.record_analysis(
            &result.recommendation.to_string(),
            result.risk_score,
            started.elapsed().as_secs_f64(),
        );
        info!(
            risk_score = result.risk_score,
            risk_level = %result.risk_level,
            recommendation = %result.recommendation,
            indicators = result.indicators.len(),
            fail_open = result.metadata.fail_open,
            "Transaction analyzed"
        );
        Ok(result)
    }

    async fn evaluate(&self, ctx: &TransactionContext, started: Instant) -> Result<Evaluation> {
        let now = ctx.timestamp;
        let profile = self.profiles.load_or_create(&ctx.user_id, now).await?;

        let window_start = now - ChronoDuration::hours(self.config.history_window_hours);
        let mut history = self
            .history
            .list_transactions(&ctx.user_id, window_start, now)
            .await?;
        history.retain(|tx| tx.transaction_id != ctx.transaction_id);
        history.truncate(self.config.history_limit);

        let input = Arc::new(AnalysisInput {
            context: ctx.clone(),
            profile: profile.clone(),
            history,
        });
        let run = self.run_analyzers(input).await;

        let aggregate = self.aggregator.aggregate(profile.risk_score, &run.indicators);
        let (risk_level, recommendation) =
            self.classifier.classify(aggregate.score, &run.indicators);

        let result = FraudAnalysisResult {
            transaction_id: ctx.transaction_id.clone(),
            user_id: ctx.user_id.clone(),
            risk_score: aggregate.score,
            risk_level,
            indicators: run.indicators,
            recommendation,
            confidence: aggregate.confidence,
            metadata: AnalysisMetadata {
                analyzed_at: Utc::now(),
                ruleset_version: self.config.ruleset_version.clone(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                failed_analyzers: run.failed,
                fail_open: false,
            },
        };
        Ok(Evaluation { result, profile })
    }

    async fn run_analyzers(&self, input: Arc<AnalysisInput>) -> AnalyzerRun {
        let deadline = self.config.analyzer_timeout();
        let mut join_set = JoinSet::new();

        for (slot, analyzer) in self.analyzers.iter().enumerate() {
            let analyzer = Arc::clone(analyzer);
            let input = Arc::clone(&input);
            join_set.spawn(async move { (slot, timeout(deadline, analyzer.analyze(&input)).await) });
        }

        let mut slots: Vec<Option<Vec<FraudIndicator>>> = vec![None; self.analyzers.len()];
        let mut failed_slots = vec![false; self.analyzers.len()];

        while let Some(joined) = join_set.join_next().await {
            let Ok((slot, outcome)) = joined else {
                // panicked task; its slot stays empty and is reported below
                continue;
            };
            let name = self.analyzers[slot].name();
            match outcome {
                Ok(Ok(indicators)) => {
                    debug!(analyzer = name, indicators = indicators.len(), "Analyzer finished");
                    slots[slot] = Some(indicators);
                }
                Ok(Err(e)) => {
                    warn!(analyzer = name, error = %e, "Analyzer failed, continuing without it");
                    self.metrics.record_analyzer_failure(name, "error");
                    failed_slots[slot] = true;
                }
                Err(_) => {
                    warn!(
                        analyzer = name,
                        timeout_ms = deadline.as_millis() as u64,
                        "Analyzer timed out, continuing without it"
                    );
                    self.metrics.record_analyzer_failure(name, "timeout");
                    failed_slots[slot] = true;
                }
            }
        }

        let mut run = AnalyzerRun {
            indicators: Vec::new(),
            failed: Vec::new(),
        };
        for (slot, indicators) in slots.into_iter().enumerate() {
            let name = self.analyzers[slot].name();
            match indicators {
                Some(indicators) => run.indicators.extend(indicators),
                None => {
                    if !failed_slots[slot] {
                        warn!(analyzer = name, "Analyzer panicked, continuing without it");
                        self.metrics.record_analyzer_failure(name, "panic");
                    }
                    run.failed.push(name.to_string());
                }
            }
        }
        for indicator in &run.indicators {
            self.metrics
                .record_indicator(&indicator.indicator_type.to_string());
        }
        run
    }

    async fn commit(&self, ctx: &TransactionContext, evaluation: &Evaluation) {
        let result = &evaluation.result;
        self.persist_analysis(result).await;
        self.profiles.commit(&evaluation.profile, result).await;

        if result.recommendation == Recommendation::Approve {
            if let Some(fingerprint) = device_fingerprint(ctx) {
                if let Err(e) = self
                    .devices
                    .remember_device(&ctx.user_id, &fingerprint, ctx.timestamp)
                    .await
                {
                    warn!(error = %e, "Failed to remember device");
                }
            }
        }

        self.enforcement.apply(result).await;
    }

    async fn persist_analysis(&self, result: &FraudAnalysisResult) {
        if let Err(e) = self.analyses.put(result).await {
            warn!(
                transaction_id = %result.transaction_id,
                error = %e,
                "Failed to persist analysis result"
            );
        }
    }

    fn fail_open(&self, ctx: &TransactionContext, err: &Error, started: Instant) -> FraudAnalysisResult {
        warn!(
            transaction_id = %ctx.transaction_id,
            error = %err,
            "Analysis dependency failed, returning fail-open result"
        );
        self.metrics.record_fail_open();

        FraudAnalysisResult {
            transaction_id: ctx.transaction_id.clone(),
            user_id: ctx.user_id.clone(),
            risk_score: FAIL_OPEN_SCORE,
            risk_level: RiskLevel::Medium,
            indicators: vec![Rule::InternalFailure.indicator(
                "Risk analysis unavailable, manual review required",
                json!({ "error": err.to_string() }),
            )],
            recommendation: Recommendation::Review,
            confidence: FAIL_OPEN_CONFIDENCE,
            metadata: AnalysisMetadata {
                analyzed_at: Utc::now(),
                ruleset_version: self.config.ruleset_version.clone(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                failed_analyzers: Vec::new(),
                fail_open: true,
            },
        }
    }
}

/// Distribution and averages over a set of results
pub fn statistics(results: &[FraudAnalysisResult]) -> FraudStatistics {
    let mut risk_distribution: BTreeMap<RiskLevel, u64> = BTreeMap::new();
    let mut recommendation_distribution: BTreeMap<Recommendation, u64> = BTreeMap::new();
    let mut total_score = 0.0;

    for result in results {
        *risk_distribution.entry(result.risk_level).or_default() += 1;
        *recommendation_distribution
            .entry(result.recommendation)
            .or_default() += 1;
        total_score += result.risk_score;
    }

    let total = results.len() as u64;
    FraudStatistics {
        total_analyses: total,
        blocked_count: recommendation_distribution
            .get(&Recommendation::Block)
            .copied()
            .unwrap_or(0),
        risk_distribution,
        recommendation_distribution,
        average_score: if total == 0 {
            0.0
        } else {
            total_score / total as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentDescriptor, PaymentMethod, TransactionSource, TransactionType};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn ctx(id: &str, amount: i64) -> TransactionContext {
        TransactionContext {
            transaction_id: id.to_string(),
            user_id: "u1".to_string(),
            amount,
            currency: "USD".to_string(),
            transaction_type: TransactionType::Contribution,
            source: TransactionSource::default(),
            payment: PaymentDescriptor {
                method: PaymentMethod::Card,
                fingerprint: None,
            },
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap(),
            metadata: serde_json::Map::new(),
        }
    }

    fn result(level: RiskLevel, recommendation: Recommendation, score: f64) -> FraudAnalysisResult {
        FraudAnalysisResult {
            transaction_id: "t".to_string(),
            user_id: "u".to_string(),
            risk_score: score,
            risk_level: level,
            indicators: vec![],
            recommendation,
            confidence: 0.5,
            metadata: AnalysisMetadata {
                analyzed_at: Utc::now(),
                ruleset_version: "test".to_string(),
                processing_time_ms: 0,
                failed_analyzers: vec![],
                fail_open: false,
            },
        }
    }

    struct Stuck;

    #[async_trait]
    impl Analyzer for Stuck {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn analyze(&self, _input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    struct Panicking;

    #[async_trait]
    impl Analyzer for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn analyze(&self, _input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
            panic!("analyzer bug")
        }
    }

    struct SlowBlocks;

    #[async_trait]
    impl BlockStore for SlowBlocks {
        async fn put_block(&self, _record: &crate::types::BlockRecord) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    struct MisconfiguredHistory;

    #[async_trait]
    impl TransactionHistory for MisconfiguredHistory {
        async fn list_transactions(
            &self,
            _user_id: &str,
            _start: chrono::DateTime<Utc>,
            _end: chrono::DateTime<Utc>,
        ) -> Result<Vec<crate::types::HistoricalTransaction>> {
            Err(Error::InvalidConfig("history window rejected".to_string()))
        }

        async fn list_all_confirmed(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> Result<Vec<crate::types::HistoricalTransaction>> {
            Ok(vec![])
        }

        async fn count_users_with_payment_fingerprint(&self, _fingerprint: &str) -> Result<u32> {
            Ok(0)
        }
    }

    #[test]
    fn test_statistics() {
        let stats = statistics(&[
            result(RiskLevel::Low, Recommendation::Approve, 10.0),
            result(RiskLevel::Low, Recommendation::Approve, 20.0),
            result(RiskLevel::Critical, Recommendation::Block, 96.0),
        ]);
        assert_eq!(stats.total_analyses, 3);
        assert_eq!(stats.blocked_count, 1);
        assert_eq!(stats.risk_distribution[&RiskLevel::Low], 2);
        assert_eq!(stats.recommendation_distribution[&Recommendation::Block], 1);
        assert!((stats.average_score - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_of_nothing() {
        let stats = statistics(&[]);
        assert_eq!(stats.total_analyses, 0);
        assert_eq!(stats.average_score, 0.0);
    }

    #[tokio::test]
    async fn test_invalid_context_is_rejected() {
        let engine = FraudEngine::new(FraudConfig::default(), Collaborators::in_memory()).unwrap();
        let result = engine.analyze(&ctx("tx-1", -5)).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = FraudConfig::default();
        config.thresholds.medium = 95.0;
        assert!(FraudEngine::new(config, Collaborators::in_memory()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_and_panicking_analyzers_are_skipped() {
        let mut engine =
            FraudEngine::new(FraudConfig::default(), Collaborators::in_memory()).unwrap();
        engine.analyzers.push(Arc::new(Stuck));
        engine.analyzers.push(Arc::new(Panicking));

        let result = engine.analyze(&ctx("tx-1", 2_345)).await.unwrap();
        assert!(!result.metadata.fail_open);
        assert_eq!(result.metadata.failed_analyzers, vec!["stuck", "panicking"]);
        assert_eq!(
            engine
                .metrics()
                .analyzer_failures
                .with_label_values(&["stuck", "timeout"])
                .get(),
            1
        );
        assert_eq!(
            engine
                .metrics()
                .analyzer_failures
                .with_label_values(&["panicking", "panic"])
                .get(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_open() {
        let mut engine =
            FraudEngine::new(FraudConfig::default(), Collaborators::in_memory()).unwrap();
        engine.analyzers.push(Arc::new(Stuck));

        let result = engine
            .analyze_with_deadline(&ctx("tx-1", 2_345), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(result.metadata.fail_open);
        assert_eq!(result.recommendation, Recommendation::Review);
        assert_eq!(engine.metrics().fail_open_total.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_does_not_interrupt_commit() {
        let reputation = Arc::new(InMemoryIpReputation::new());
        reputation.insert(
            "203.0.113.7".parse().unwrap(),
            crate::types::IpReputation {
                is_malicious: true,
                ..Default::default()
            },
        );
        let mut collaborators = Collaborators::in_memory();
        collaborators.reputation = reputation;
        collaborators.blocks = Arc::new(SlowBlocks);
        let engine = FraudEngine::new(FraudConfig::default(), collaborators).unwrap();

        let mut tx = ctx("tx-1", 24_000);
        tx.source.ip = Some("203.0.113.7".parse().unwrap());
        tx.source.user_agent = Some("curl/8.4.0".to_string());

        engine.score(&tx).await.unwrap();
        let before = engine.get_user_risk_summary("u1").await.unwrap().unwrap();

        let result = engine
            .analyze_with_deadline(&tx, Duration::from_millis(500))
            .await
            .unwrap();
        assert!(!result.metadata.fail_open);
        assert_eq!(result.recommendation, Recommendation::Block);

        let stored = engine.get_analysis("tx-1").await.unwrap();
        assert_eq!(stored, Some(result.clone()));

        let after = engine.get_user_risk_summary("u1").await.unwrap().unwrap();
        let expected = before.risk_score * 0.7 + result.risk_score * 0.3;
        assert!((after.risk_score - expected).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_commits_nothing() {
        let mut engine =
            FraudEngine::new(FraudConfig::default(), Collaborators::in_memory()).unwrap();
        engine.analyzers.push(Arc::new(Stuck));

        let tx = ctx("tx-1", 2_345);
        engine.score(&tx).await.unwrap();
        let before = engine.get_user_risk_summary("u1").await.unwrap().unwrap();

        let result = engine
            .analyze_with_deadline(&tx, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(result.metadata.fail_open);

        let after = engine.get_user_risk_summary("u1").await.unwrap().unwrap();
        assert_eq!(after.risk_score, before.risk_score);
        assert_eq!(engine.get_analysis("tx-1").await.unwrap(), Some(result));
    }

    #[tokio::test]
    async fn test_caller_errors_from_collaborators_are_returned() {
        let mut collaborators = Collaborators::in_memory();
        collaborators.history = Arc::new(MisconfiguredHistory);
        let engine = FraudEngine::new(FraudConfig::default(), collaborators).unwrap();

        let result = engine.analyze(&ctx("tx-1", 2_345)).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert_eq!(engine.metrics().fail_open_total.get(), 0);
    }
}
