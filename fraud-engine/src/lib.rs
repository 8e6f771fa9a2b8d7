//! Fraud engine for TxGuard
//!
//! Real-time risk scoring for payment transactions. Each transaction is run
//! through a set of heuristic analyzers; their indicators are aggregated with
//! the user's standing risk profile into a 0-100 score, a risk level and a
//! recommendation (approve / review / investigate / block).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod analyzers;
pub mod cache;
pub mod circuit;
pub mod config;
pub mod decision;
pub mod enforcement;
pub mod engine;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod profile;
pub mod rules;
pub mod store;
pub mod types;

pub use config::FraudConfig;
pub use engine::{Collaborators, FraudEngine};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use rules::Rule;
pub use types::*;
