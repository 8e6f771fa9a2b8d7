//! Circuit breaker for external lookups
//!
//! Closed → Open after `failure_threshold` consecutive failures. Open rejects
//! calls until `timeout_seconds` have passed, then HalfOpen lets calls
//! through; `recovery_threshold` successes close it again and any failure
//! reopens it. A call running past `call_timeout_ms` is abandoned and counted
//! as a failure.

use crate::config::CircuitConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

/// Circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are rejected
    Open,
    /// Probing whether the dependency recovered
    HalfOpen,
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    /// Breaker name
    pub name: String,
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures while closed
    pub failure_count: u32,
    /// Successes while half-open
    pub success_count: u32,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker guarding one dependency
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_threshold: u32,
    open_timeout: Duration,
    call_timeout: Duration,
    state: Arc<RwLock<BreakerState>>,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(name: impl Into<String>, config: &CircuitConfig) -> Self {
        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold.max(1),
            recovery_threshold: config.recovery_threshold.max(1),
            open_timeout: Duration::from_secs(config.timeout_seconds.max(0) as u64),
            call_timeout: Duration::from_millis(config.call_timeout_ms.max(1)),
            state: Arc::new(RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
            })),
        }
    }

    /// Run `f` under breaker protection
    pub async fn call<F, T, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut state = self.state.write().await;
            if state.state == CircuitState::Open {
                if !self.should_attempt_reset(&state) {
                    return Err(Error::CircuitOpen(self.name.clone()));
                }
                info!(breaker = %self.name, "Circuit breaker half-open, probing dependency");
                state.state = CircuitState::HalfOpen;
                state.success_count = 0;
            }
        }

        let outcome = match timeout(self.call_timeout, f()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    breaker = %self.name,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Call timed out"
                );
                Err(Error::Timeout(self.call_timeout.as_millis() as u64))
            }
        };

        match outcome {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(e) => {
                self.on_failure().await;
                Err(e)
            }
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.recovery_threshold {
                    info!(breaker = %self.name, "Circuit breaker closed");
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                }
            }
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.last_failure = Some(Instant::now());

        match state.state {
            CircuitState::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.failure_threshold {
                    warn!(
                        breaker = %self.name,
                        failures = state.failure_count,
                        "Circuit breaker opened"
                    );
                    state.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "Probe failed, circuit breaker reopened");
                state.state = CircuitState::Open;
                state.failure_count = 0;
                state.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    fn should_attempt_reset(&self, state: &BreakerState) -> bool {
        state
            .last_failure
            .map(|at| at.elapsed() >= self.open_timeout)
            .unwrap_or(true)
    }

    /// Current state
    pub async fn snapshot(&self) -> CircuitSnapshot {
        let state = self.state.read().await;
        CircuitSnapshot {
            name: self.name.clone(),
            state: state.state,
            failure_count: state.failure_count,
            success_count: state.success_count,
        }
    }
}
