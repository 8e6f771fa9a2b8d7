//! Device fingerprinting and automation detection

use super::{AnalysisInput, Analyzer};
use crate::rules::Rule;
use crate::store::DeviceStore;
use crate::types::{FraudIndicator, TransactionContext};
use crate::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Hex characters kept from the digest
const FINGERPRINT_LEN: usize = 32;

/// Metadata attributes folded into the fingerprint
const FINGERPRINT_ATTRIBUTES: [&str; 3] = ["screen_resolution", "timezone", "language"];

lazy_static! {
    // Headless browsers, automation drivers, HTTP libraries and crawlers
    static ref AUTOMATION_UA: Regex = Regex::new(
        r"(?i)(headless|phantomjs|selenium|webdriver|puppeteer|playwright|curl/|wget/|httpie|python-requests|python-urllib|aiohttp|go-http-client|okhttp|java/|libwww-perl|apache-httpclient|scrapy|\bbot\b|bot/|crawler|spider)"
    )
    .unwrap();
}

/// Whether a user agent looks automated
pub fn is_automated_user_agent(user_agent: &str) -> bool {
    AUTOMATION_UA.is_match(user_agent)
}

/// Stable fingerprint of the client, `None` when there is nothing to hash
pub fn device_fingerprint(context: &TransactionContext) -> Option<String> {
    let user_agent = context.source.user_agent.as_deref().unwrap_or("");
    let device_id = context.source.device_id.as_deref().unwrap_or("");
    let attributes: Vec<&str> = FINGERPRINT_ATTRIBUTES
        .iter()
        .map(|key| context.metadata_str(key).unwrap_or(""))
        .collect();

    if user_agent.is_empty() && device_id.is_empty() && attributes.iter().all(|a| a.is_empty()) {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(device_id.as_bytes());
    for attribute in attributes {
        hasher.update(b"|");
        hasher.update(attribute.as_bytes());
    }

    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    Some(hex[..FINGERPRINT_LEN].to_string())
}

/// Flags unfamiliar devices and automated clients
pub struct DeviceAnalyzer {
    devices: Arc<dyn DeviceStore>,
}

impl DeviceAnalyzer {
    /// Create a new device analyzer
    pub fn new(devices: Arc<dyn DeviceStore>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl Analyzer for DeviceAnalyzer {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>> {
        let ctx = &input.context;
        let mut indicators = Vec::new();

        if let Some(fingerprint) = device_fingerprint(ctx) {
            let known = self.devices.list_devices(&ctx.user_id).await?;
            if !known.is_empty() && !known.iter().any(|d| d.fingerprint == fingerprint) {
                indicators.push(Rule::UnrecognizedDevice.indicator(
                    "Transaction from an unrecognized device",
                    json!({
                        "fingerprint": fingerprint,
                        "known_devices": known.len(),
                    }),
                ));
            }
        }

        if let Some(user_agent) = ctx.source.user_agent.as_deref() {
            if is_automated_user_agent(user_agent) {
                indicators.push(Rule::AutomatedUserAgent.indicator(
                    "User agent matches an automation signature",
                    json!({ "user_agent": user_agent }),
                ));
            }
        }

        Ok(indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::{at, baseline, context, input};
    use crate::memory::InMemoryDeviceStore;
    use crate::types::Severity;
    use crate::Error;

    const BROWSER: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 Version/17.4 Safari/605.1.15";

    fn browser_context() -> TransactionContext {
        let mut ctx = context(2_000);
        ctx.source.user_agent = Some(BROWSER.to_string());
        ctx.source.device_id = Some("dev-1".to_string());
        ctx.metadata
            .insert("timezone".to_string(), json!("Europe/Paris"));
        ctx
    }

    #[test]
    fn test_fingerprint_is_stable_and_truncated() {
        let a = device_fingerprint(&browser_context()).unwrap();
        let b = device_fingerprint(&browser_context()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_depends_on_attributes() {
        let mut other = browser_context();
        other
            .metadata
            .insert("timezone".to_string(), json!("Asia/Tokyo"));
        assert_ne!(device_fingerprint(&browser_context()), device_fingerprint(&other));
    }

    #[test]
    fn test_no_fingerprint_without_client_data() {
        assert_eq!(device_fingerprint(&context(2_000)), None);
    }

    #[test]
    fn test_automation_signatures() {
        assert!(is_automated_user_agent("curl/8.4.0"));
        assert!(is_automated_user_agent("python-requests/2.31.0"));
        assert!(is_automated_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0.0.0 Safari/537.36"
        ));
        assert!(is_automated_user_agent("Googlebot/2.1 (+http://www.google.com/bot.html)"));
        assert!(!is_automated_user_agent(BROWSER));
    }

    #[tokio::test]
    async fn test_unrecognized_device() {
        let store = Arc::new(InMemoryDeviceStore::new());
        store.remember_device("u1", "0123456789abcdef0123456789abcdef", at()).await.unwrap();
        let analyzer = DeviceAnalyzer::new(store);

        let indicators = analyzer
            .analyze(&input(browser_context(), baseline(), vec![]))
            .await
            .unwrap();
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_known_device_is_clean() {
        let store = Arc::new(InMemoryDeviceStore::new());
        let fingerprint = device_fingerprint(&browser_context()).unwrap();
        store.remember_device("u1", &fingerprint, at()).await.unwrap();
        let analyzer = DeviceAnalyzer::new(store);

        let indicators = analyzer
            .analyze(&input(browser_context(), baseline(), vec![]))
            .await
            .unwrap();
        assert!(indicators.is_empty());
    }

    #[tokio::test]
    async fn test_first_device_is_not_flagged() {
        let analyzer = DeviceAnalyzer::new(Arc::new(InMemoryDeviceStore::new()));
        let indicators = analyzer
            .analyze(&input(browser_context(), baseline(), vec![]))
            .await
            .unwrap();
        assert!(indicators.is_empty());
    }

    #[tokio::test]
    async fn test_automated_client() {
        let analyzer = DeviceAnalyzer::new(Arc::new(InMemoryDeviceStore::new()));
        let mut ctx = context(2_000);
        ctx.source.user_agent = Some("curl/8.4.0".to_string());

        let indicators = analyzer.analyze(&input(ctx, baseline(), vec![])).await.unwrap();
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].severity, Severity::High);
        assert_eq!(indicators[0].weight, 25);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(InMemoryDeviceStore::new());
        store.failure.set(true);
        let analyzer = DeviceAnalyzer::new(store);

        let result = analyzer
            .analyze(&input(browser_context(), baseline(), vec![]))
            .await;
        assert!(matches!(result, Err(Error::DeviceStore(_))));
    }
}
