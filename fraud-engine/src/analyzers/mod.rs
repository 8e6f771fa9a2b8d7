//! Indicator analyzers
//!
//! Each analyzer inspects one transaction against the user's profile and
//! recent history and returns the indicators that fired. Analyzers hold no
//! mutable state; the engine runs them concurrently and treats an error as
//! "no indicators".

pub mod behavioral;
pub mod device;
pub mod geolocation;
pub mod network;
pub mod pattern;
pub mod velocity;

pub use behavioral::BehavioralAnalyzer;
pub use device::{device_fingerprint, DeviceAnalyzer};
pub use geolocation::GeolocationAnalyzer;
pub use network::NetworkAnalyzer;
pub use pattern::PatternAnalyzer;
pub use velocity::{VelocityAnalyzer, VelocityStats};

use crate::types::{FraudIndicator, HistoricalTransaction, TransactionContext, UserRiskProfile};
use crate::Result;
use async_trait::async_trait;

/// Everything an analyzer may look at
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    /// Transaction being analyzed
    pub context: TransactionContext,
    /// User's risk profile
    pub profile: UserRiskProfile,
    /// Confirmed transactions in the trailing window, most recent first,
    /// never including the transaction being analyzed
    pub history: Vec<HistoricalTransaction>,
}

/// A single family of fraud heuristics
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name used in logs, metrics and `failed_analyzers`
    fn name(&self) -> &'static str;

    /// Indicators fired by this transaction
    async fn analyze(&self, input: &AnalysisInput) -> Result<Vec<FraudIndicator>>;
}
