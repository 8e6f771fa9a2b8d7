//! Decision classifier
//!
//! Maps a score onto a risk tier and a recommendation. A critical indicator
//! never lets the recommendation drop below `investigate`.

use crate::config::RiskThresholds;
use crate::types::{FraudIndicator, Recommendation, RiskLevel, Severity};

/// Decision classifier
#[derive(Debug, Clone)]
pub struct DecisionClassifier {
    thresholds: RiskThresholds,
}

impl DecisionClassifier {
    /// Create a classifier with the given cutoffs
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// Tier of a score
    pub fn risk_level(&self, score: f64) -> RiskLevel {
        match score {
            s if s >= self.thresholds.critical => RiskLevel::Critical,
            s if s >= self.thresholds.high => RiskLevel::High,
            s if s >= self.thresholds.medium => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// Recommendation for a tier and the indicators behind it
    pub fn recommend(&self, level: RiskLevel, indicators: &[FraudIndicator]) -> Recommendation {
        let by_level = match level {
            RiskLevel::Critical => Recommendation::Block,
            RiskLevel::High => Recommendation::Investigate,
            RiskLevel::Medium => Recommendation::Review,
            RiskLevel::Low => Recommendation::Approve,
        };

        let has_critical = indicators.iter().any(|i| i.severity == Severity::Critical);
        if has_critical {
            by_level.max(Recommendation::Investigate)
        } else {
            by_level
        }
    }

    /// Tier and recommendation in one call
    pub fn classify(
        &self,
        score: f64,
        indicators: &[FraudIndicator],
    ) -> (RiskLevel, Recommendation) {
        let level = self.risk_level(score);
        (level, self.recommend(level, indicators))
    }
}

impl Default for DecisionClassifier {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use serde_json::Value;

    #[test]
    fn test_risk_levels() {
        let classifier = DecisionClassifier::default();
        assert_eq!(classifier.risk_level(0.0), RiskLevel::Low);
        assert_eq!(classifier.risk_level(30.0), RiskLevel::Low);
        assert_eq!(classifier.risk_level(49.99), RiskLevel::Low);
        assert_eq!(classifier.risk_level(50.0), RiskLevel::Medium);
        assert_eq!(classifier.risk_level(75.0), RiskLevel::High);
        assert_eq!(classifier.risk_level(89.9), RiskLevel::High);
        assert_eq!(classifier.risk_level(90.0), RiskLevel::Critical);
        assert_eq!(classifier.risk_level(100.0), RiskLevel::Critical);
    }

    #[test]
    fn test_recommendation_follows_level() {
        let classifier = DecisionClassifier::default();
        assert_eq!(classifier.classify(10.0, &[]).1, Recommendation::Approve);
        assert_eq!(classifier.classify(60.0, &[]).1, Recommendation::Review);
        assert_eq!(classifier.classify(80.0, &[]).1, Recommendation::Investigate);
        assert_eq!(classifier.classify(95.0, &[]).1, Recommendation::Block);
    }

    #[test]
    fn test_critical_indicator_floors_recommendation() {
        let classifier = DecisionClassifier::default();
        let critical = vec![Rule::MaliciousIp.indicator("bad ip", Value::Null)];

        assert_eq!(classifier.classify(5.0, &critical).1, Recommendation::Investigate);
        assert_eq!(classifier.classify(60.0, &critical).1, Recommendation::Investigate);
        assert_eq!(classifier.classify(95.0, &critical).1, Recommendation::Block);
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = DecisionClassifier::new(RiskThresholds {
            medium: 30.0,
            high: 60.0,
            critical: 80.0,
        });
        assert_eq!(classifier.risk_level(35.0), RiskLevel::Medium);
        assert_eq!(classifier.risk_level(85.0), RiskLevel::Critical);
    }
}
