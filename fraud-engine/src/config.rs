//! Configuration for the fraud engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fraud engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudConfig {
    /// Service name
    pub service_name: String,

    /// Ruleset version stamped on every analysis
    pub ruleset_version: String,

    /// Velocity thresholds
    pub velocity: VelocityConfig,

    /// Behavioral thresholds
    pub behavioral: BehavioralConfig,

    /// Geolocation settings
    pub geolocation: GeolocationConfig,

    /// Pattern heuristics
    pub pattern: PatternConfig,

    /// Risk tier cutoffs
    pub thresholds: RiskThresholds,

    /// Heuristic feature toggles
    pub detection: DetectionConfig,

    /// Enforcement settings
    pub enforcement: EnforcementConfig,

    /// Profile lifecycle and cache
    pub profile: ProfileConfig,

    /// Per-analyzer timeout (milliseconds)
    pub analyzer_timeout_ms: u64,

    /// Trailing history window loaded for each analysis (hours)
    pub history_window_hours: i64,

    /// Maximum transactions loaded for the history window
    pub history_limit: usize,

    /// IP reputation circuit breaker
    pub reputation_circuit: CircuitConfig,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            service_name: "fraud-engine".to_string(),
            ruleset_version: format!("heuristic-{}", env!("CARGO_PKG_VERSION")),
            velocity: VelocityConfig::default(),
            behavioral: BehavioralConfig::default(),
            geolocation: GeolocationConfig::default(),
            pattern: PatternConfig::default(),
            thresholds: RiskThresholds::default(),
            detection: DetectionConfig::default(),
            enforcement: EnforcementConfig::default(),
            profile: ProfileConfig::default(),
            analyzer_timeout_ms: 250,
            history_window_hours: 24,
            history_limit: 500,
            reputation_circuit: CircuitConfig::default(),
        }
    }
}

/// Velocity thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Maximum transactions per user per hour
    pub max_transactions_per_hour: u32,

    /// Maximum amount per user per hour (minor units)
    pub max_amount_per_hour: i64,

    /// Maximum amount per user per 24h (minor units)
    pub max_amount_per_day: i64,

    /// Hourly amount above this multiple of the baseline is a spike
    pub spike_multiplier: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_hour: 10,
            max_amount_per_hour: 1_000_000, // 10,000.00
            max_amount_per_day: 5_000_000,  // 50,000.00
            spike_multiplier: 3.0,
        }
    }
}

/// Behavioral thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralConfig {
    /// Amount / average ratio above which the amount is suspicious
    pub suspicious_amount_multiplier: f64,

    /// Amount / average ratio above which the amount is critical
    pub critical_amount_multiplier: f64,

    /// Withdrawals by users with fewer transactions than this are flagged
    pub min_history_for_withdrawal: u32,

    /// Allowed distance (hours) from a typical hour
    pub hour_tolerance: u8,
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        Self {
            suspicious_amount_multiplier: 5.0,
            critical_amount_multiplier: 10.0,
            min_history_for_withdrawal: 5,
            hour_tolerance: 2,
        }
    }
}

/// Geolocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// ISO 3166 alpha-2 codes treated as high risk
    pub high_risk_countries: Vec<String>,

    /// Window searched for impossible travel (hours)
    pub travel_window_hours: i64,

    /// Maximum age of the previous transaction for impossible travel (hours)
    pub travel_recent_hours: i64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_risk_countries: ["IR", "KP", "SY", "CU", "VE", "AF", "MM", "BY", "RU", "SD"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            travel_window_hours: 4,
            travel_recent_hours: 2,
        }
    }
}

impl GeolocationConfig {
    /// Whether the country is on the high-risk list
    pub fn is_high_risk(&self, country: &str) -> bool {
        self.high_risk_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
    }
}

/// Pattern heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Divisors (minor units) marking a round amount
    pub round_amount_divisors: Vec<i64>,

    /// Number of amounts examined for an arithmetic progression
    pub progression_length: usize,

    /// Allowed deviation between consecutive differences (minor units)
    pub progression_tolerance: i64,

    /// A payment fingerprint used by more users than this is shared
    pub max_users_per_fingerprint: u32,

    /// Amount / average ratio counted by the account-takeover heuristic
    pub takeover_amount_multiplier: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            round_amount_divisors: vec![1_000, 5_000, 10_000],
            progression_length: 5,
            progression_tolerance: 100,
            max_users_per_fingerprint: 3,
            takeover_amount_multiplier: 5.0,
        }
    }
}

/// Risk tier cutoffs. Anything below `medium` is low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Medium tier lower bound
    pub medium: f64,
    /// High tier lower bound
    pub high: f64,
    /// Critical tier lower bound
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 50.0,
            high: 75.0,
            critical: 90.0,
        }
    }
}

/// Heuristic feature toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Apply the anomaly amplification formula in the aggregator
    pub anomaly_detection: bool,

    /// Run the pattern analyzer
    pub pattern_recognition: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            anomaly_detection: true,
            pattern_recognition: true,
        }
    }
}

/// Enforcement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Enforce in the request path; when off neither blocks nor flags are written
    pub real_time_blocking: bool,

    /// Score at or above which a block record is written
    pub auto_block_threshold: f64,

    /// Score at or above which a blocked transaction also flags the account
    pub account_flag_threshold: f64,

    /// Flagged accounts require manual review
    pub manual_review_required: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            real_time_blocking: true,
            auto_block_threshold: 85.0,
            account_flag_threshold: 90.0,
            manual_review_required: true,
        }
    }
}

/// Profile lifecycle and cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Staleness tolerance of cached profiles (seconds)
    pub cache_ttl_secs: u64,

    /// Transactions read when bootstrapping a profile
    pub bootstrap_history_limit: usize,

    /// Recompute the history summary when older than this (hours)
    pub baseline_refresh_hours: i64,

    /// Weight of the new score in the exponential smoothing
    pub smoothing_weight: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            bootstrap_history_limit: 100,
            baseline_refresh_hours: 24,
            smoothing_weight: 0.3,
        }
    }
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,

    /// Successes in half-open before closing
    pub recovery_threshold: u32,

    /// Seconds to stay open before probing
    pub timeout_seconds: i64,

    /// Per-call limit in milliseconds; a slower call counts as a failure
    pub call_timeout_ms: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_threshold: 3,
            timeout_seconds: 60,
            call_timeout_ms: 200,
        }
    }
}

impl FraudConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: FraudConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden from `FRAUD_ENGINE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = FraudConfig::default();

        if let Some(v) = env_parse("FRAUD_ENGINE_MAX_TX_PER_HOUR")? {
            config.velocity.max_transactions_per_hour = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_MAX_AMOUNT_PER_HOUR")? {
            config.velocity.max_amount_per_hour = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_MAX_AMOUNT_PER_DAY")? {
            config.velocity.max_amount_per_day = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_SUSPICIOUS_MULTIPLIER")? {
            config.behavioral.suspicious_amount_multiplier = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_AUTO_BLOCK_THRESHOLD")? {
            config.enforcement.auto_block_threshold = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_REAL_TIME_BLOCKING")? {
            config.enforcement.real_time_blocking = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_ANOMALY_DETECTION")? {
            config.detection.anomaly_detection = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_PATTERN_RECOGNITION")? {
            config.detection.pattern_recognition = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_ANALYZER_TIMEOUT_MS")? {
            config.analyzer_timeout_ms = v;
        }
        if let Some(v) = env_parse("FRAUD_ENGINE_REPUTATION_TIMEOUT_MS")? {
            config.reputation_circuit.call_timeout_ms = v;
        }
        if let Ok(list) = std::env::var("FRAUD_ENGINE_HIGH_RISK_COUNTRIES") {
            config.geolocation.high_risk_countries = list
                .split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(0.0 < t.medium && t.medium < t.high && t.high < t.critical && t.critical <= 100.0) {
            return Err(Error::InvalidConfig(format!(
                "risk thresholds must satisfy 0 < medium < high < critical <= 100 (got {}/{}/{})",
                t.medium, t.high, t.critical
            )));
        }
        let b = &self.behavioral;
        if b.suspicious_amount_multiplier <= 1.0
            || b.critical_amount_multiplier <= b.suspicious_amount_multiplier
        {
            return Err(Error::InvalidConfig(
                "amount multipliers must satisfy 1 < suspicious < critical".to_string(),
            ));
        }
        if self.velocity.max_transactions_per_hour == 0
            || self.velocity.max_amount_per_hour <= 0
            || self.velocity.max_amount_per_day <= 0
        {
            return Err(Error::InvalidConfig(
                "velocity limits must be positive".to_string(),
            ));
        }
        if self.pattern.progression_length < 3 {
            return Err(Error::InvalidConfig(
                "progression_length must be at least 3".to_string(),
            ));
        }
        if self.pattern.round_amount_divisors.iter().any(|d| *d <= 0) {
            return Err(Error::InvalidConfig(
                "round amount divisors must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.profile.smoothing_weight) {
            return Err(Error::InvalidConfig(
                "smoothing_weight must be within [0, 1]".to_string(),
            ));
        }
        if self.history_window_hours < self.geolocation.travel_window_hours
            || self.geolocation.travel_recent_hours > self.geolocation.travel_window_hours
        {
            return Err(Error::InvalidConfig(
                "travel windows must fit inside the history window".to_string(),
            ));
        }
        if self.analyzer_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "analyzer_timeout_ms must be positive".to_string(),
            ));
        }
        let call_timeout_ms = self.reputation_circuit.call_timeout_ms;
        if call_timeout_ms == 0 || call_timeout_ms >= self.analyzer_timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "reputation_circuit.call_timeout_ms must be positive and below analyzer_timeout_ms (got {} vs {})",
                call_timeout_ms, self.analyzer_timeout_ms
            )));
        }
        Ok(())
    }

    /// Per-analyzer timeout
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", key, e))),
        Err(_) => Ok(None),
    }
}
