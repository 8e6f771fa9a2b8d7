//! Deviation from the user's own baseline

use super::{AnalysisInput, Analyzer};
use crate::config::BehavioralConfig;
use crate::rules::Rule;
use crate::types::{FraudIndicator, TransactionType};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;

/// Circular distance between two hours of the day
fn hour_distance(a: u8, b: u8) -> u8 {
    let d = a.abs_diff(b) % 24;
    d.min(24 - d)
}

/// Compares amount, payment method, hour of day and transaction type with
/// what the profile has seen before
pub struct BehavioralAnalyzer {
    config: BehavioralConfig,
}

impl BehavioralAnalyzer {
    /// Create a new behavioral analyzer
    pub fn new(config: BehavioralConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Analyzer for BehavioralAnalyzer {
    fn name(&self) -> &'static str {
        "behavioral"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        let ctx = &input.context;
        let baseline = &input.profile.historical_analysis;
        let mut indicators = Vec::new();

        if baseline.average_amount > 0.0 {
            let ratio = ctx.amount as f64 / baseline.average_amount;
            let rule = if ratio > self.config.critical_amount_multiplier {
                Some(Rule::CriticalAmountRatio)
            } else if ratio > self.config.suspicious_amount_multiplier {
                Some(Rule::SuspiciousAmountRatio)
            } else {
                None
            };
            if let Some(rule) = rule {
                indicators.push(rule.indicator(
                    format!("Amount is {:.1}x the user's average", ratio),
                    json!({
                        "amount": ctx.amount,
                        "average_amount": baseline.average_amount,
                        "ratio": ratio,
                    }),
                ));
            }
        }

        if !baseline.preferred_payment_methods.is_empty()
            && !baseline.knows_payment_method(ctx.payment.method)
        {
            indicators.push(Rule::UnrecognizedPaymentMethod.indicator(
                format!("Payment method {} not used before", ctx.payment.method),
                json!({
                    "method": ctx.payment.method,
                    "preferred": baseline.preferred_payment_methods,
                }),
            ));
        }

        if !baseline.typical_hours.is_empty() {
            let hour = ctx.hour();
            let near_typical = baseline
                .typical_hours
                .iter()
                .any(|h| hour_distance(*h, hour) <= self.config.hour_tolerance);
            if !near_typical {
                indicators.push(Rule::UnusualHour.indicator(
                    format!("Transaction at {:02}:00 UTC is outside usual hours", hour),
                    json!({
                        "hour": hour,
                        "typical_hours": baseline.typical_hours,
                    }),
                ));
            }
        }

        if ctx.transaction_type == TransactionType::Withdrawal
            && baseline.transaction_count < self.config.min_history_for_withdrawal
        {
            indicators.push(Rule::ThinHistoryWithdrawal.indicator(
                format!(
                    "Withdrawal after only {} confirmed transactions",
                    baseline.transaction_count
                ),
                json!({
                    "transaction_count": baseline.transaction_count,
                    "minimum": self.config.min_history_for_withdrawal,
                }),
            ));
        }

        Ok(indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::{at, baseline, context, input};
    use crate::types::{HistoricalAnalysis, IndicatorType, PaymentMethod, Severity};
    use chrono::Duration;

    async fn run(input: &AnalysisInput) -> Vec<FraudIndicator> {
        BehavioralAnalyzer::new(BehavioralConfig::default())
            .analyze(input)
            .await
            .unwrap()
    }

    #[test]
    fn test_hour_distance_wraps_midnight() {
        assert_eq!(hour_distance(23, 1), 2);
        assert_eq!(hour_distance(1, 23), 2);
        assert_eq!(hour_distance(12, 12), 0);
        assert_eq!(hour_distance(0, 12), 12);
    }

    #[tokio::test]
    async fn test_usual_transaction_is_clean() {
        assert!(run(&input(context(2_500), baseline(), vec![])).await.is_empty());
    }

    #[tokio::test]
    async fn test_ten_times_average_is_high() {
        let indicators = run(&input(context(20_000), baseline(), vec![])).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].indicator_type, IndicatorType::Behavioral);
        assert_eq!(indicators[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_twelve_times_average_is_critical() {
        let indicators = run(&input(context(24_000), baseline(), vec![])).await;
        assert_eq!(indicators[0].severity, Severity::Critical);
        assert_eq!(indicators[0].weight, 35);
    }

    #[tokio::test]
    async fn test_amount_check_skipped_without_average() {
        let fresh = HistoricalAnalysis::empty(at());
        let indicators = run(&input(context(1_000_000), fresh, vec![])).await;
        assert!(indicators
            .iter()
            .all(|i| i.indicator_type != IndicatorType::Behavioral));
    }

    #[tokio::test]
    async fn test_unrecognized_payment_method() {
        let mut ctx = context(2_000);
        ctx.payment.method = PaymentMethod::Wallet;
        let indicators = run(&input(ctx, baseline(), vec![])).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].weight, 15);
    }

    #[tokio::test]
    async fn test_unusual_hour() {
        let mut ctx = context(2_000);
        ctx.timestamp = at() + Duration::hours(6);
        let indicators = run(&input(ctx.clone(), baseline(), vec![])).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].indicator_type, IndicatorType::Temporal);

        // two hours past the last typical hour is still usual
        ctx.timestamp = at() + Duration::hours(2);
        assert!(run(&input(ctx, baseline(), vec![])).await.is_empty());
    }

    #[tokio::test]
    async fn test_withdrawal_with_thin_history() {
        let mut ctx = context(2_000);
        ctx.transaction_type = TransactionType::Withdrawal;
        let mut thin = baseline();
        thin.transaction_count = 2;

        let indicators = run(&input(ctx.clone(), thin, vec![])).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].weight, 20);

        assert!(run(&input(ctx, baseline(), vec![])).await.is_empty());
    }
}
