//! Indicator rule table
//!
//! Every indicator the analyzers emit is produced from a [`Rule`]. The
//! type, severity, point weight and confidence of each rule live in
//! [`Rule::spec`] so the aggregator's inputs can be audited in one place.

use crate::types::{FraudIndicator, IndicatorType, Severity};
use serde::{Deserialize, Serialize};

/// Detection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Too many transactions in the trailing hour
    HourlyTransactionCount,
    /// Too much volume in the trailing hour
    HourlyAmount,
    /// Too much volume in the trailing 24h
    DailyAmount,
    /// Hourly volume far above the user's baseline
    HourlySpike,
    /// Amount at least the critical multiple of the user's average
    CriticalAmountRatio,
    /// Amount at least the suspicious multiple of the user's average
    SuspiciousAmountRatio,
    /// Payment method outside the user's preferred set
    UnrecognizedPaymentMethod,
    /// Withdrawal by a user with a thin history
    ThinHistoryWithdrawal,
    /// Hour of day far from every typical hour
    UnusualHour,
    /// First transaction from a high-risk country
    NewHighRiskCountry,
    /// First transaction from a country
    NewCountry,
    /// Country change too fast to be physical travel
    ImpossibleTravel,
    /// Device fingerprint not seen before
    UnrecognizedDevice,
    /// Headless browser, CLI client or bot user agent
    AutomatedUserAgent,
    /// Round amount
    RoundAmount,
    /// Recent amounts form an arithmetic progression
    ArithmeticProgression,
    /// Payment fingerprint shared across many users
    SharedPaymentFingerprint,
    /// Several takeover signals at once
    AccountTakeover,
    /// IP known to be malicious
    MaliciousIp,
    /// Tor exit node
    TorExitNode,
    /// Proxy or VPN
    ProxyOrVpn,
    /// Internal failure, fail-open result only
    InternalFailure,
}

/// Scoring parameters of a rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSpec {
    /// Indicator category
    pub indicator_type: IndicatorType,
    /// Severity
    pub severity: Severity,
    /// Point weight
    pub weight: u32,
    /// Confidence (0-1)
    pub confidence: f64,
}

const fn spec(
    indicator_type: IndicatorType,
    severity: Severity,
    weight: u32,
    confidence: f64,
) -> RuleSpec {
    RuleSpec {
        indicator_type,
        severity,
        weight,
        confidence,
    }
}

impl Rule {
    /// All rules
    pub const ALL: [Rule; 22] = [
        Rule::HourlyTransactionCount,
        Rule::HourlyAmount,
        Rule::DailyAmount,
        Rule::HourlySpike,
        Rule::CriticalAmountRatio,
        Rule::SuspiciousAmountRatio,
        Rule::UnrecognizedPaymentMethod,
        Rule::ThinHistoryWithdrawal,
        Rule::UnusualHour,
        Rule::NewHighRiskCountry,
        Rule::NewCountry,
        Rule::ImpossibleTravel,
        Rule::UnrecognizedDevice,
        Rule::AutomatedUserAgent,
        Rule::RoundAmount,
        Rule::ArithmeticProgression,
        Rule::SharedPaymentFingerprint,
        Rule::AccountTakeover,
        Rule::MaliciousIp,
        Rule::TorExitNode,
        Rule::ProxyOrVpn,
        Rule::InternalFailure,
    ];

    /// Scoring parameters
    pub const fn spec(self) -> RuleSpec {
        use IndicatorType::*;
        use Severity::*;

        match self {
            Rule::HourlyTransactionCount => spec(Velocity, High, 25, 0.90),
            Rule::HourlyAmount => spec(Velocity, High, 30, 0.85),
            Rule::DailyAmount => spec(Velocity, Medium, 20, 0.80),
            Rule::HourlySpike => spec(Velocity, Medium, 15, 0.70),
            Rule::CriticalAmountRatio => spec(Behavioral, Critical, 35, 0.90),
            Rule::SuspiciousAmountRatio => spec(Behavioral, High, 25, 0.80),
            Rule::UnrecognizedPaymentMethod => spec(Behavioral, Medium, 15, 0.60),
            Rule::ThinHistoryWithdrawal => spec(Behavioral, Medium, 20, 0.70),
            Rule::UnusualHour => spec(Temporal, Low, 10, 0.50),
            Rule::NewHighRiskCountry => spec(Geolocation, High, 25, 0.80),
            Rule::NewCountry => spec(Geolocation, Medium, 15, 0.60),
            Rule::ImpossibleTravel => spec(Geolocation, High, 30, 0.85),
            Rule::UnrecognizedDevice => spec(Device, Medium, 15, 0.60),
            Rule::AutomatedUserAgent => spec(Device, High, 25, 0.80),
            Rule::RoundAmount => spec(Amount, Low, 5, 0.40),
            Rule::ArithmeticProgression => spec(Pattern, Medium, 20, 0.70),
            Rule::SharedPaymentFingerprint => spec(Pattern, High, 35, 0.85),
            Rule::AccountTakeover => spec(Pattern, Critical, 40, 0.80),
            Rule::MaliciousIp => spec(Network, Critical, 45, 0.95),
            Rule::TorExitNode => spec(Network, High, 30, 0.90),
            Rule::ProxyOrVpn => spec(Network, Medium, 20, 0.70),
            Rule::InternalFailure => spec(System, Medium, 0, 0.50),
        }
    }

    /// Build an indicator for this rule
    pub fn indicator(
        self,
        description: impl Into<String>,
        evidence: serde_json::Value,
    ) -> FraudIndicator {
        let spec = self.spec();
        FraudIndicator {
            indicator_type: spec.indicator_type,
            severity: spec.severity,
            description: description.into(),
            evidence,
            confidence: spec.confidence,
            weight: spec.weight,
        }
    }
}
