//! IP reputation

use super::{AnalysisInput, Analyzer};
use crate::circuit::CircuitBreaker;
use crate::config::CircuitConfig;
use crate::rules::Rule;
use crate::store::IpReputationService;
use crate::types::FraudIndicator;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Looks up the origin IP with the reputation provider
pub struct NetworkAnalyzer {
    reputation: Arc<dyn IpReputationService>,
    breaker: CircuitBreaker,
}

impl NetworkAnalyzer {
    /// Create a new network analyzer
    pub fn new(reputation: Arc<dyn IpReputationService>, circuit: &CircuitConfig) -> Self {
        Self {
            reputation,
            breaker: CircuitBreaker::new("ip_reputation", circuit),
        }
    }

    /// Breaker guarding the reputation provider
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl Analyzer for NetworkAnalyzer {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        let Some(ip) = input.context.source.ip else {
            return Ok(Vec::new());
        };

        let reputation = self.reputation.clone();
        let verdict = self.breaker.call(|| async move { reputation.check(ip).await }).await?;

        let evidence = json!({
            "ip": ip.to_string(),
            "categories": verdict.categories,
        });
        let mut indicators = Vec::new();
        if verdict.is_malicious {
            indicators.push(Rule::MaliciousIp.indicator(
                format!("{} is a known malicious address", ip),
                evidence.clone(),
            ));
        }
        if verdict.is_tor {
            indicators.push(Rule::TorExitNode.indicator(
                format!("{} is a Tor exit node", ip),
                evidence.clone(),
            ));
        }
        if verdict.is_proxy || verdict.is_vpn {
            indicators.push(Rule::ProxyOrVpn.indicator(
                format!("{} is a proxy or VPN endpoint", ip),
                json!({
                    "ip": ip.to_string(),
                    "proxy": verdict.is_proxy,
                    "vpn": verdict.is_vpn,
                }),
            ));
        }
        Ok(indicators)
    }
}
