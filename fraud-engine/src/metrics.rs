//! Metrics collection for observability
//!
//! Prometheus metrics for the fraud engine, held in a registry owned by the
//! engine instance.
//!
//! # Metrics
//!
//! - `fraud_analyses_total{recommendation}` - Completed analyses
//! - `fraud_fail_open_total` - Analyses answered with the fail-open default
//! - `fraud_analyzer_failures_total{analyzer,reason}` - Analyzer errors and timeouts
//! - `fraud_indicators_total{type}` - Indicators emitted
//! - `fraud_enforcement_actions_total{action,outcome}` - Block records and account flags
//! - `fraud_profile_cache_hits_total` / `fraud_profile_cache_misses_total`
//! - `fraud_analysis_duration_seconds` - Histogram of analysis latencies
//! - `fraud_risk_score` - Histogram of final risk scores

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed analyses by recommendation
    pub analyses_total: IntCounterVec,

    /// Fail-open results
    pub fail_open_total: IntCounter,

    /// Analyzer failures by analyzer and reason
    pub analyzer_failures: IntCounterVec,

    /// Indicators by type
    pub indicators_total: IntCounterVec,

    /// Enforcement side effects by action and outcome
    pub enforcement_actions: IntCounterVec,

    /// Profile cache hits
    pub cache_hits: IntCounter,

    /// Profile cache misses
    pub cache_misses: IntCounter,

    /// Analysis duration histogram
    pub analysis_duration: Histogram,

    /// Risk score histogram
    pub risk_score: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let analyses_total = IntCounterVec::new(
            Opts::new("fraud_analyses_total", "Completed fraud analyses"),
            &["recommendation"],
        )?;
        registry.register(Box::new(analyses_total.clone()))?;

        let fail_open_total = IntCounter::new(
            "fraud_fail_open_total",
            "Analyses answered with the fail-open default",
        )?;
        registry.register(Box::new(fail_open_total.clone()))?;

        let analyzer_failures = IntCounterVec::new(
            Opts::new(
                "fraud_analyzer_failures_total",
                "Analyzer errors, timeouts and panics",
            ),
            &["analyzer", "reason"],
        )?;
        registry.register(Box::new(analyzer_failures.clone()))?;

        let indicators_total = IntCounterVec::new(
            Opts::new("fraud_indicators_total", "Fraud indicators emitted"),
            &["type"],
        )?;
        registry.register(Box::new(indicators_total.clone()))?;

        let enforcement_actions = IntCounterVec::new(
            Opts::new(
                "fraud_enforcement_actions_total",
                "Block records and account flags written",
            ),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(enforcement_actions.clone()))?;

        let cache_hits =
            IntCounter::new("fraud_profile_cache_hits_total", "Profile cache hits")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses =
            IntCounter::new("fraud_profile_cache_misses_total", "Profile cache misses")?;
        registry.register(Box::new(cache_misses.clone()))?;

        let analysis_duration = Histogram::with_opts(
            HistogramOpts::new(
                "fraud_analysis_duration_seconds",
                "Histogram of analysis latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(analysis_duration.clone()))?;

        let risk_score = Histogram::with_opts(
            HistogramOpts::new("fraud_risk_score", "Histogram of final risk scores")
                .buckets(vec![10.0, 25.0, 50.0, 75.0, 85.0, 90.0, 100.0]),
        )?;
        registry.register(Box::new(risk_score.clone()))?;

        Ok(Self {
            analyses_total,
            fail_open_total,
            analyzer_failures,
            indicators_total,
            enforcement_actions,
            cache_hits,
            cache_misses,
            analysis_duration,
            risk_score,
            registry,
        })
    }

    /// Record a completed analysis
    pub fn record_analysis(&self, recommendation: &str, score: f64, duration_seconds: f64) {
        self.analyses_total
            .with_label_values(&[recommendation])
            .inc();
        self.risk_score.observe(score);
        self.analysis_duration.observe(duration_seconds);
    }

    /// Record a fail-open result
    pub fn record_fail_open(&self) {
        self.fail_open_total.inc();
    }

    /// Record an analyzer failure (`error`, `timeout` or `panic`)
    pub fn record_analyzer_failure(&self, analyzer: &str, reason: &str) {
        self.analyzer_failures
            .with_label_values(&[analyzer, reason])
            .inc();
    }

    /// Record an emitted indicator
    pub fn record_indicator(&self, indicator_type: &str) {
        self.indicators_total
            .with_label_values(&[indicator_type])
            .inc();
    }

    /// Record an enforcement side effect
    pub fn record_enforcement(&self, action: &str, succeeded: bool) {
        let outcome = if succeeded { "ok" } else { "error" };
        self.enforcement_actions
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Record a profile cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Record a profile cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of every metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
