//! Enforcement trigger
//!
//! Turns a high score into side effects: a block record and, above a second
//! threshold, a fraud flag on the account. Nothing is written unless real-time
//! blocking is enabled. Failures are logged and counted, never returned; the
//! analysis result is already decided at this point.

use crate::config::EnforcementConfig;
use crate::metrics::Metrics;
use crate::store::{AccountDirectory, BlockStore};
use crate::types::{AccountFlag, BlockRecord, FraudAnalysisResult};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// What the trigger wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementOutcome {
    /// A block record was written
    pub blocked: bool,
    /// The account was flagged
    pub flagged: bool,
}

/// Writes block records and account flags for high-risk results
pub struct EnforcementTrigger {
    config: EnforcementConfig,
    blocks: Arc<dyn BlockStore>,
    accounts: Arc<dyn AccountDirectory>,
    metrics: Arc<Metrics>,
}

impl EnforcementTrigger {
    /// Create a new trigger
    pub fn new(
        config: EnforcementConfig,
        blocks: Arc<dyn BlockStore>,
        accounts: Arc<dyn AccountDirectory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            blocks,
            accounts,
            metrics,
        }
    }

    /// Apply enforcement for a committed result
    pub async fn apply(&self, result: &FraudAnalysisResult) -> EnforcementOutcome {
        let mut outcome = EnforcementOutcome::default();

        if !self.config.real_time_blocking || result.risk_score < self.config.auto_block_threshold {
            return outcome;
        }

        outcome.blocked = self.block(result).await;
        if result.risk_score >= self.config.account_flag_threshold {
            outcome.flagged = self.flag(result).await;
        }
        outcome
    }

    async fn block(&self, result: &FraudAnalysisResult) -> bool {
        let types = result.indicator_types();
        let reason = format!(
            "Risk score {:.1} with {} indicator(s): {}",
            result.risk_score,
            result.indicators.len(),
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let record = BlockRecord {
            block_id: Uuid::new_v4().to_string(),
            transaction_id: result.transaction_id.clone(),
            user_id: result.user_id.clone(),
            risk_score: result.risk_score,
            indicator_types: types,
            reason,
            created_at: Utc::now(),
        };

        match self.blocks.put_block(&record).await {
            Ok(()) => {
                info!(
                    block_id = %record.block_id,
                    transaction_id = %record.transaction_id,
                    risk_score = record.risk_score,
                    "Transaction blocked"
                );
                self.metrics.record_enforcement("block", true);
                true
            }
            Err(e) => {
                error!(
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Failed to write block record"
                );
                self.metrics.record_enforcement("block", false);
                false
            }
        }
    }

    async fn flag(&self, result: &FraudAnalysisResult) -> bool {
        let flag = AccountFlag {
            user_id: result.user_id.clone(),
            transaction_id: result.transaction_id.clone(),
            fraud_suspected: true,
            requires_manual_review: self.config.manual_review_required,
            risk_score: result.risk_score,
            flagged_at: Utc::now(),
        };

        match self.accounts.flag_account(&flag).await {
            Ok(()) => {
                info!(
                    user_id = %flag.user_id,
                    transaction_id = %flag.transaction_id,
                    manual_review = flag.requires_manual_review,
                    "Account flagged for suspected fraud"
                );
                self.metrics.record_enforcement("flag", true);
                true
            }
            Err(e) => {
                error!(user_id = %flag.user_id, error = %e, "Failed to flag account");
                self.metrics.record_enforcement("flag", false);
                false
            }
        }
    }
}
