//! Risk aggregation
//!
//! Folds the indicator set and the profile's standing score into one
//! 0-100 score and a diversity-weighted confidence.

use crate::types::{clamp_score, FraudIndicator};
use std::collections::HashSet;

/// Share of the profile's standing score carried into every analysis
const PROFILE_SCORE_WEIGHT: f64 = 0.3;
/// Neutral profile score used by the anomaly amplification
const ANOMALY_BASELINE: f64 = 25.0;
/// Upper bound of the anomaly amplification
const MAX_ANOMALY_BOOST: f64 = 0.5;
/// Confidence when nothing fired
const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Confidence ceiling
const MAX_CONFIDENCE: f64 = 0.99;

/// Aggregated score and confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    /// Score (0-100)
    pub score: f64,
    /// Confidence (0-1)
    pub confidence: f64,
}

/// Risk aggregator
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    anomaly_detection: bool,
}

impl RiskAggregator {
    /// Create a new aggregator
    pub fn new(anomaly_detection: bool) -> Self {
        Self { anomaly_detection }
    }

    /// Score and confidence for an indicator set
    pub fn aggregate(&self, profile_score: f64, indicators: &[FraudIndicator]) -> Aggregate {
        Aggregate {
            score: self.score(profile_score, indicators),
            confidence: Self::confidence(indicators),
        }
    }

    /// `profile × 0.3 + Σ weight × confidence × severity`, optionally
    /// amplified, clamped to 0-100. Same-type indicators all count.
    pub fn score(&self, profile_score: f64, indicators: &[FraudIndicator]) -> f64 {
        let profile_score = clamp_score(profile_score);
        let indicator_points: f64 = indicators.iter().map(|i| i.weighted_points()).sum();
        let mut score = profile_score * PROFILE_SCORE_WEIGHT + indicator_points;

        if self.anomaly_detection {
            let boost = 0.1 * indicators.len() as f64
                + (profile_score - ANOMALY_BASELINE).abs() / 100.0;
            score *= 1.0 + boost.min(MAX_ANOMALY_BOOST);
        }

        clamp_score(score)
    }

    /// Mean indicator confidence scaled by type diversity, capped at 0.99
    pub fn confidence(indicators: &[FraudIndicator]) -> f64 {
        if indicators.is_empty() {
            return DEFAULT_CONFIDENCE;
        }

        let mean = indicators
            .iter()
            .map(|i| i.confidence.clamp(0.0, 1.0))
            .sum::<f64>()
            / indicators.len() as f64;
        let distinct_types = indicators
            .iter()
            .map(|i| i.indicator_type)
            .collect::<HashSet<_>>()
            .len();

        (mean * (1.0 + distinct_types as f64 * 0.1)).min(MAX_CONFIDENCE)
    }
}
