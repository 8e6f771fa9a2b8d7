//! Core types for the fraud engine

use crate::{Error, Result};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

/// Clamp a raw score into the 0-100 range
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Kind of money movement being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Incoming contribution
    Contribution,
    /// Refund of an earlier contribution
    Refund,
    /// Transfer between accounts
    Transfer,
    /// Funds leaving the platform
    Withdrawal,
}

/// Payment instrument family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit or credit card
    Card,
    /// Bank account / ACH / SEPA
    BankTransfer,
    /// Digital wallet
    Wallet,
    /// Anything else
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Other => "other",
        };
        f.write_str(s)
    }
}

/// Where the request came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSource {
    /// Origin IP address
    #[serde(default)]
    pub ip: Option<IpAddr>,
    /// ISO 3166 alpha-2 country of origin
    #[serde(default)]
    pub country: Option<String>,
    /// Client-supplied device identifier
    #[serde(default)]
    pub device_id: Option<String>,
    /// Raw user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Payment instrument used for the transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDescriptor {
    /// Instrument family
    pub method: PaymentMethod,
    /// Card / bank / wallet fingerprint issued by the payment provider
    #[serde(default)]
    pub fingerprint: Option<String>,
}

/// A single transaction attempt. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Transaction ID
    pub transaction_id: String,

    /// User ID
    pub user_id: String,

    /// Amount in minor currency units
    pub amount: i64,

    /// ISO 4217 currency code
    pub currency: String,

    /// Transaction type
    pub transaction_type: TransactionType,

    /// Request origin
    #[serde(default)]
    pub source: TransactionSource,

    /// Payment instrument
    pub payment: PaymentDescriptor,

    /// Attempt timestamp
    pub timestamp: DateTime<Utc>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TransactionContext {
    /// Reject malformed input before any analysis runs
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(Error::Validation("transaction id is required".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }
        if self.amount <= 0 {
            return Err(Error::Validation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation(format!(
                "invalid currency code: {:?}",
                self.currency
            )));
        }
        Ok(())
    }

    /// Upper-cased origin country, if known
    pub fn country(&self) -> Option<String> {
        self.source
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
    }

    /// UTC hour of day of the attempt
    pub fn hour(&self) -> u8 {
        self.timestamp.hour() as u8
    }

    /// String metadata attribute
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
    /// Critical risk
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Recommended action, ordered from least to most restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Proceed
    Approve,
    /// Queue for manual review
    Review,
    /// Hold and investigate
    Investigate,
    /// Block
    Block,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Approve => "approve",
            Recommendation::Review => "review",
            Recommendation::Investigate => "investigate",
            Recommendation::Block => "block",
        };
        f.write_str(s)
    }
}

/// Indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    /// Transaction rate / volume
    Velocity,
    /// Amount shape
    Amount,
    /// Deviation from the user's baseline
    Behavioral,
    /// Country of origin
    Geolocation,
    /// Device fingerprint / user agent
    Device,
    /// Cross-transaction patterns
    Pattern,
    /// IP reputation
    Network,
    /// Time of day
    Temporal,
    /// Internal failure (fail-open result only)
    System,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndicatorType::Velocity => "velocity",
            IndicatorType::Amount => "amount",
            IndicatorType::Behavioral => "behavioral",
            IndicatorType::Geolocation => "geolocation",
            IndicatorType::Device => "device",
            IndicatorType::Pattern => "pattern",
            IndicatorType::Network => "network",
            IndicatorType::Temporal => "temporal",
            IndicatorType::System => "system",
        };
        f.write_str(s)
    }
}

/// Indicator severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl Severity {
    /// Aggregation multiplier (1/2/3/4)
    pub fn multiplier(&self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
            Severity::Critical => 4.0,
        }
    }
}

/// A single detected suspicious signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudIndicator {
    /// Category
    pub indicator_type: IndicatorType,
    /// Severity
    pub severity: Severity,
    /// Human-readable description
    pub description: String,
    /// Opaque evidence payload
    pub evidence: serde_json::Value,
    /// Confidence (0-1)
    pub confidence: f64,
    /// Point value
    pub weight: u32,
}

impl FraudIndicator {
    /// Contribution of this indicator to the aggregate score
    pub fn weighted_points(&self) -> f64 {
        self.weight as f64 * self.confidence * self.severity.multiplier()
    }
}

/// Per-user risk factors, each 0-100 where higher means lower risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Account age (30 days = 100)
    pub account_age: f64,
    /// Transaction history depth
    pub transaction_history: f64,
    /// Identity verification level
    pub verification_level: f64,
    /// Behavioral consistency
    pub behavioral_consistency: f64,
    /// Network reputation
    pub network_reputation: f64,
}

/// Summary of a user's confirmed transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAnalysis {
    /// Mean amount in minor units
    pub average_amount: f64,
    /// Transactions per active hour
    pub transaction_frequency: f64,
    /// Number of transactions summarized
    pub transaction_count: u32,
    /// Most used payment methods, at most three
    pub preferred_payment_methods: Vec<PaymentMethod>,
    /// Hours of day holding at least 10% of the history
    pub typical_hours: BTreeSet<u8>,
    /// Countries seen in the history
    pub countries: BTreeSet<String>,
    /// When this summary was computed
    pub refreshed_at: DateTime<Utc>,
}

impl HistoricalAnalysis {
    /// Summary for a user with no history
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            average_amount: 0.0,
            transaction_frequency: 0.0,
            transaction_count: 0,
            preferred_payment_methods: Vec::new(),
            typical_hours: BTreeSet::new(),
            countries: BTreeSet::new(),
            refreshed_at: now,
        }
    }

    /// Average amount moved during an hour in which the user is active
    pub fn hourly_average_amount(&self) -> f64 {
        self.average_amount * self.transaction_frequency
    }

    /// Whether the payment method is a known preferred one
    pub fn knows_payment_method(&self, method: PaymentMethod) -> bool {
        self.preferred_payment_methods.contains(&method)
    }
}

/// Persisted behavioral baseline for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRiskProfile {
    /// User ID
    pub user_id: String,
    /// Smoothed risk score (0-100)
    pub risk_score: f64,
    /// Level derived from the score
    pub risk_level: RiskLevel,
    /// Risk factors
    pub factors: RiskFactors,
    /// Free-form flags
    pub flags: BTreeSet<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub last_updated: DateTime<Utc>,
    /// History summary
    pub historical_analysis: HistoricalAnalysis,
}

/// Metadata recorded with every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// When the analysis finished
    pub analyzed_at: DateTime<Utc>,
    /// Ruleset version
    pub ruleset_version: String,
    /// Wall-clock processing time
    pub processing_time_ms: u64,
    /// Analyzers that failed or timed out
    #[serde(default)]
    pub failed_analyzers: Vec<String>,
    /// Whether this is the conservative default produced on dependency failure
    #[serde(default)]
    pub fail_open: bool,
}

/// Outcome of one analysis. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysisResult {
    /// Transaction ID
    pub transaction_id: String,
    /// User ID
    pub user_id: String,
    /// Final risk score (0-100)
    pub risk_score: f64,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Every indicator that fired
    pub indicators: Vec<FraudIndicator>,
    /// Recommended action
    pub recommendation: Recommendation,
    /// Confidence (0-1)
    pub confidence: f64,
    /// Metadata
    pub metadata: AnalysisMetadata,
}

impl FraudAnalysisResult {
    /// Whether any indicator is critical
    pub fn has_critical_indicator(&self) -> bool {
        self.indicators
            .iter()
            .any(|i| i.severity == Severity::Critical)
    }

    /// Distinct indicator types, sorted
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let types: BTreeSet<IndicatorType> =
            self.indicators.iter().map(|i| i.indicator_type).collect();
        types.into_iter().collect()
    }
}

/// Confirmed past transaction as returned by the history collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTransaction {
    /// Transaction ID
    pub transaction_id: String,
    /// Amount in minor units
    pub amount: i64,
    /// Confirmation time
    pub timestamp: DateTime<Utc>,
    /// Origin country
    #[serde(default)]
    pub country: Option<String>,
    /// Payment method
    pub payment_method: PaymentMethod,
}

/// Identity verification state from the KYC provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Never submitted
    Unverified,
    /// Submitted, awaiting decision
    Pending,
    /// Verified
    Approved,
    /// Rejected
    Rejected,
}

/// Account record used to bootstrap a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// User ID
    pub user_id: String,
    /// Account creation time
    pub created_at: DateTime<Utc>,
    /// Verification status
    pub verification_status: VerificationStatus,
}

/// Device previously seen for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownDevice {
    /// Device fingerprint
    pub fingerprint: String,
    /// Last time the device was seen
    pub last_seen: DateTime<Utc>,
}

/// IP intelligence verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpReputation {
    /// Known malicious source
    #[serde(default)]
    pub is_malicious: bool,
    /// Open or anonymizing proxy
    #[serde(default)]
    pub is_proxy: bool,
    /// Commercial VPN
    #[serde(default)]
    pub is_vpn: bool,
    /// Tor exit node
    #[serde(default)]
    pub is_tor: bool,
    /// Provider categories
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Block record written by the enforcement trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block ID
    pub block_id: String,
    /// Blocked transaction
    pub transaction_id: String,
    /// Owner of the transaction
    pub user_id: String,
    /// Score that triggered the block
    pub risk_score: f64,
    /// Indicator types present in the analysis
    pub indicator_types: Vec<IndicatorType>,
    /// Human-readable reason
    pub reason: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Account flag written by the enforcement trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFlag {
    /// Flagged user
    pub user_id: String,
    /// Transaction that caused the flag
    pub transaction_id: String,
    /// Fraud suspected
    pub fraud_suspected: bool,
    /// Manual review required before further activity
    pub requires_manual_review: bool,
    /// Score that caused the flag
    pub risk_score: f64,
    /// Flag time
    pub flagged_at: DateTime<Utc>,
}

/// Read-only view of a user's risk profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRiskSummary {
    /// User ID
    pub user_id: String,
    /// Smoothed risk score
    pub risk_score: f64,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Risk factors
    pub factors: RiskFactors,
    /// Flags
    pub flags: BTreeSet<String>,
    /// Transactions summarized in the baseline
    pub transaction_count: u32,
    /// Last update time
    pub last_updated: DateTime<Utc>,
}

impl From<&UserRiskProfile> for UserRiskSummary {
    fn from(profile: &UserRiskProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            risk_score: profile.risk_score,
            risk_level: profile.risk_level,
            factors: profile.factors.clone(),
            flags: profile.flags.clone(),
            transaction_count: profile.historical_analysis.transaction_count,
            last_updated: profile.last_updated,
        }
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range ending now
    pub fn last(duration: chrono::Duration) -> Self {
        let end = Utc::now();
        Self {
            start: end - duration,
            end,
        }
    }

    /// Whether the instant falls inside the range
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Aggregate statistics over stored analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudStatistics {
    /// Analyses in range
    pub total_analyses: u64,
    /// Count per risk level
    pub risk_distribution: BTreeMap<RiskLevel, u64>,
    /// Count per recommendation
    pub recommendation_distribution: BTreeMap<Recommendation, u64>,
    /// Analyses recommending a block
    pub blocked_count: u64,
    /// Mean risk score (0 when empty)
    pub average_score: f64,
}
