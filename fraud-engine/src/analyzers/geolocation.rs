//! Country of origin checks

use super::{AnalysisInput, Analyzer};
use crate::config::GeolocationConfig;
use crate::rules::Rule;
use crate::types::FraudIndicator;
use crate::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;

/// Flags new countries and country changes faster than travel allows
pub struct GeolocationAnalyzer {
    config: GeolocationConfig,
}

impl GeolocationAnalyzer {
    /// Create a new geolocation analyzer
    pub fn new(config: GeolocationConfig) -> Self {
        Self { config }
    }

    fn new_country(&self, input: &AnalysisInput, country: &str) -> Option<FraudIndicator> {
        let known = &input.profile.historical_analysis.countries;
        if known.is_empty() || known.contains(country) {
            return None;
        }

        let high_risk = self.config.is_high_risk(country);
        let rule = if high_risk {
            Rule::NewHighRiskCountry
        } else {
            Rule::NewCountry
        };
        Some(rule.indicator(
            format!("First transaction from {}", country),
            json!({
                "country": country,
                "known_countries": known,
                "high_risk": high_risk,
            }),
        ))
    }

    fn impossible_travel(&self, input: &AnalysisInput, country: &str) -> Option<FraudIndicator> {
        let now = input.context.timestamp;
        let window_start = now - Duration::hours(self.config.travel_window_hours);

        // history is most recent first
        let previous = input
            .history
            .iter()
            .filter(|tx| tx.transaction_id != input.context.transaction_id)
            .find(|tx| tx.timestamp <= now && tx.timestamp >= window_start)?;

        let elapsed = now - previous.timestamp;
        if elapsed > Duration::hours(self.config.travel_recent_hours) {
            return None;
        }

        let previous_country = previous
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())?
            .to_uppercase();
        if previous_country == country {
            return None;
        }

        Some(Rule::ImpossibleTravel.indicator(
            format!(
                "Moved from {} to {} in {} minutes",
                previous_country,
                country,
                elapsed.num_minutes()
            ),
            json!({
                "from": previous_country,
                "to": country,
                "previous_transaction_id": previous.transaction_id,
                "minutes_apart": elapsed.num_minutes(),
            }),
        ))
    }
}

#[async_trait]
impl Analyzer for GeolocationAnalyzer {
    fn name(&self) -> &'static str {
        "geolocation"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        let Some(country) = input.context.country() else {
            return Ok(Vec::new());
        };

        Ok(self
            .new_country(input, &country)
            .into_iter()
            .chain(self.impossible_travel(input, &country))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::{at, baseline, context, input, past};
    use crate::types::{HistoricalAnalysis, IndicatorType, Severity, TransactionContext};

    async fn run(input: &AnalysisInput) -> Vec<FraudIndicator> {
        GeolocationAnalyzer::new(GeolocationConfig::default())
            .analyze(input)
            .await
            .unwrap()
    }

    fn from(country: &str) -> TransactionContext {
        let mut ctx = context(2_000);
        ctx.source.country = Some(country.to_string());
        ctx
    }

    #[tokio::test]
    async fn test_known_country_is_clean() {
        assert!(run(&input(from("us"), baseline(), vec![])).await.is_empty());
    }

    #[tokio::test]
    async fn test_new_country() {
        let indicators = run(&input(from("FR"), baseline(), vec![])).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].severity, Severity::Medium);
        assert_eq!(indicators[0].weight, 15);
    }

    #[tokio::test]
    async fn test_new_high_risk_country() {
        let indicators = run(&input(from("KP"), baseline(), vec![])).await;
        assert_eq!(indicators[0].severity, Severity::High);
        assert_eq!(indicators[0].weight, 25);
        assert_eq!(indicators[0].evidence["high_risk"], true);
    }

    #[tokio::test]
    async fn test_new_user_has_no_new_country() {
        let indicators = run(&input(from("KP"), HistoricalAnalysis::empty(at()), vec![])).await;
        assert!(indicators.is_empty());
    }

    #[tokio::test]
    async fn test_impossible_travel() {
        let mut known = baseline();
        known.countries.insert("GB".to_string());
        let history = vec![past("prev", 2_000, 60, "US")];

        let indicators = run(&input(from("GB"), known, history)).await;
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].indicator_type, IndicatorType::Geolocation);
        assert_eq!(indicators[0].severity, Severity::High);
        assert_eq!(indicators[0].evidence["minutes_apart"], 60);
    }

    #[tokio::test]
    async fn test_travel_only_looks_at_most_recent() {
        let mut known = baseline();
        known.countries.insert("GB".to_string());
        let history = vec![past("recent", 2_000, 30, "GB"), past("older", 2_000, 90, "US")];
        assert!(run(&input(from("GB"), known, history)).await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_travel_is_fine() {
        let mut known = baseline();
        known.countries.insert("GB".to_string());
        let history = vec![past("prev", 2_000, 180, "US")];
        assert!(run(&input(from("GB"), known, history)).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_country_skips_checks() {
        let mut ctx = context(2_000);
        ctx.source.country = None;
        let history = vec![past("prev", 2_000, 10, "FR")];
        assert!(run(&input(ctx, baseline(), history)).await.is_empty());
    }
}
