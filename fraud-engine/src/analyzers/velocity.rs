//! Velocity checks over the trailing hour and day

use super::{AnalysisInput, Analyzer};
use crate::config::VelocityConfig;
use crate::rules::Rule;
use crate::types::{FraudIndicator, HistoricalTransaction, TransactionContext};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Transaction counts and volumes around one attempt, the attempt included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityStats {
    /// Transactions in the trailing hour
    pub hourly_count: u32,
    /// Volume in the trailing hour (minor units)
    pub hourly_amount: i64,
    /// Transactions in the trailing 24h
    pub daily_count: u32,
    /// Volume in the trailing 24h (minor units)
    pub daily_amount: i64,
}

impl VelocityStats {
    /// Stats for `context` given the user's confirmed history
    pub fn compute(context: &TransactionContext, history: &[HistoricalTransaction]) -> Self {
        let now = context.timestamp;
        let mut stats = Self {
            hourly_count: 1,
            hourly_amount: context.amount,
            daily_count: 1,
            daily_amount: context.amount,
        };

        for tx in history
            .iter()
            .filter(|tx| tx.transaction_id != context.transaction_id)
        {
            if in_window(tx.timestamp, now, Duration::hours(24)) {
                stats.daily_count += 1;
                stats.daily_amount = stats.daily_amount.saturating_add(tx.amount);
            }
            if in_window(tx.timestamp, now, Duration::hours(1)) {
                stats.hourly_count += 1;
                stats.hourly_amount = stats.hourly_amount.saturating_add(tx.amount);
            }
        }
        stats
    }
}

fn in_window(at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    at <= now && at > now - window
}

/// Flags bursts of transactions and volume
pub struct VelocityAnalyzer {
    config: VelocityConfig,
}

impl VelocityAnalyzer {
    /// Create a new velocity analyzer
    pub fn new(config: VelocityConfig) -> Self {
        Self { config }
    }

    /// Indicators for precomputed stats against the user's hourly baseline
    pub fn evaluate(&self, stats: &VelocityStats, hourly_baseline: f64) -> Vec<FraudIndicator> {
        let mut indicators = Vec::new();

        if stats.hourly_count > self.config.max_transactions_per_hour {
            indicators.push(Rule::HourlyTransactionCount.indicator(
                format!(
                    "{} transactions in the last hour (limit {})",
                    stats.hourly_count, self.config.max_transactions_per_hour
                ),
                json!({
                    "count": stats.hourly_count,
                    "limit": self.config.max_transactions_per_hour,
                }),
            ));
        }

        if stats.hourly_amount > self.config.max_amount_per_hour {
            indicators.push(Rule::HourlyAmount.indicator(
                format!(
                    "{} moved in the last hour (limit {})",
                    stats.hourly_amount, self.config.max_amount_per_hour
                ),
                json!({
                    "amount": stats.hourly_amount,
                    "limit": self.config.max_amount_per_hour,
                }),
            ));
        }

        if stats.daily_amount > self.config.max_amount_per_day {
            indicators.push(Rule::DailyAmount.indicator(
                format!(
                    "{} moved in the last 24h (limit {})",
                    stats.daily_amount, self.config.max_amount_per_day
                ),
                json!({
                    "amount": stats.daily_amount,
                    "count": stats.daily_count,
                    "limit": self.config.max_amount_per_day,
                }),
            ));
        }

        if hourly_baseline > 0.0
            && stats.hourly_amount as f64 > hourly_baseline * self.config.spike_multiplier
        {
            indicators.push(Rule::HourlySpike.indicator(
                format!(
                    "Hourly volume {:.1}x the usual",
                    stats.hourly_amount as f64 / hourly_baseline
                ),
                json!({
                    "amount": stats.hourly_amount,
                    "baseline": hourly_baseline,
                    "multiplier": self.config.spike_multiplier,
                }),
            ));
        }

        indicators
    }
}

#[async_trait]
impl Analyzer for VelocityAnalyzer {
    fn name(&self) -> &'static str {
        "velocity"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        let stats = VelocityStats::compute(&input.context, &input.history);
        let baseline = input.profile.historical_analysis.hourly_average_amount();
        Ok(self.evaluate(&stats, baseline))
    }
}
