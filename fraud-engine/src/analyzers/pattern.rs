//! Cross-transaction patterns
//!
//! Round amounts, amounts climbing in fixed steps, payment instruments shared
//! across accounts and the account-takeover composite.

use super::{AnalysisInput, Analyzer};
use crate::config::PatternConfig;
use crate::rules::Rule;
use crate::store::TransactionHistory;
use crate::types::FraudIndicator;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Largest configured divisor that divides `amount` evenly
pub fn round_amount_divisor(amount: i64, divisors: &[i64]) -> Option<i64> {
    divisors
        .iter()
        .copied()
        .filter(|d| *d > 0 && amount % d == 0)
        .max()
}

/// Common step of `amounts` (oldest first) if they form an arithmetic
/// progression with a non-zero step
pub fn progression_step(amounts: &[i64], tolerance: i64) -> Option<i64> {
    if amounts.len() < 3 {
        return None;
    }
    let diffs: Vec<i64> = amounts.windows(2).map(|w| w[1] - w[0]).collect();
    let step = diffs[0];
    if step == 0 {
        return None;
    }
    diffs
        .iter()
        .all(|d| (d - step).abs() <= tolerance)
        .then_some(step)
}

/// Detects structuring and shared-instrument patterns
pub struct PatternAnalyzer {
    config: PatternConfig,
    enabled: bool,
    history: Arc<dyn TransactionHistory>,
}

impl PatternAnalyzer {
    /// Create a new pattern analyzer
    pub fn new(config: PatternConfig, enabled: bool, history: Arc<dyn TransactionHistory>) -> Self {
        Self {
            config,
            enabled,
            history,
        }
    }

    fn round_amount(&self, input: &AnalysisInput) -> Option<FraudIndicator> {
        let amount = input.context.amount;
        let divisor = round_amount_divisor(amount, &self.config.round_amount_divisors)?;
        Some(Rule::RoundAmount.indicator(
            format!("Round amount {}", amount),
            json!({ "amount": amount, "divisor": divisor }),
        ))
    }

    async fn progression(&self, input: &AnalysisInput) -> Result<Option<FraudIndicator>> {
        let ctx = &input.context;
        let previous_needed = self.config.progression_length.saturating_sub(1);
        if previous_needed < 2 {
            return Ok(None);
        }

        let recent = self
            .history
            .list_all_confirmed(&ctx.user_id, previous_needed + 1)
            .await?;
        let mut amounts: Vec<i64> = recent
            .iter()
            .filter(|tx| tx.transaction_id != ctx.transaction_id)
            .take(previous_needed)
            .map(|tx| tx.amount)
            .collect();
        if amounts.len() < previous_needed {
            return Ok(None);
        }
        // most recent first -> chronological
        amounts.reverse();
        amounts.push(ctx.amount);

        Ok(progression_step(&amounts, self.config.progression_tolerance).map(|step| {
            Rule::ArithmeticProgression.indicator(
                format!("Last {} amounts climb in steps of {}", amounts.len(), step),
                json!({ "amounts": amounts, "step": step }),
            )
        }))
    }

    async fn shared_fingerprint(&self, input: &AnalysisInput) -> Result<Option<FraudIndicator>> {
        let Some(fingerprint) = input.context.payment.fingerprint.as_deref() else {
            return Ok(None);
        };
        let users = self
            .history
            .count_users_with_payment_fingerprint(fingerprint)
            .await?;
        if users <= self.config.max_users_per_fingerprint {
            return Ok(None);
        }
        Ok(Some(Rule::SharedPaymentFingerprint.indicator(
            format!("Payment instrument used by {} accounts", users),
            json!({
                "fingerprint": fingerprint,
                "users": users,
                "limit": self.config.max_users_per_fingerprint,
            }),
        )))
    }

    fn account_takeover(&self, input: &AnalysisInput) -> Option<FraudIndicator> {
        let ctx = &input.context;
        let baseline = &input.profile.historical_analysis;
        let mut signals = Vec::new();

        if baseline.average_amount > 0.0
            && ctx.amount as f64 > baseline.average_amount * self.config.takeover_amount_multiplier
        {
            signals.push("amount_spike");
        }
        if !baseline.preferred_payment_methods.is_empty()
            && !baseline.knows_payment_method(ctx.payment.method)
        {
            signals.push("new_payment_method");
        }
        if let Some(country) = ctx.country() {
            if !baseline.countries.is_empty() && !baseline.countries.contains(&country) {
                signals.push("new_country");
            }
        }

        (signals.len() >= 2).then(|| {
            Rule::AccountTakeover.indicator(
                format!("Possible account takeover ({})", signals.join(", ")),
                json!({ "signals": signals }),
            )
        })
    }
}

#[async_trait]
impl Analyzer for PatternAnalyzer {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let mut indicators = Vec::new();
        indicators.extend(self.round_amount(input));
        indicators.extend(self.progression(input).await?);
        indicators.extend(self.shared_fingerprint(input).await?);
        indicators.extend(self.account_takeover(input));
        Ok(indicators)
    }
}
