//! Offline fraud analysis
//!
//! Reads a scenario document from stdin, seeds in-memory collaborators with
//! it, analyzes its transactions in order and prints one JSON result per
//! line on stdout.
//!
//! ```text
//! fraud-analyze [--config <file.toml>] [--metrics] < scenario.json
//! ```
//!
//! Logs go to stderr; set `FRAUD_ENGINE_LOG_FORMAT=json` for JSON logs.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use fraud_engine::memory::{
    InMemoryAccountDirectory, InMemoryAnalysisStore, InMemoryBlockStore, InMemoryDeviceStore,
    InMemoryIpReputation, InMemoryProfileStore, InMemoryTransactionHistory,
};
use fraud_engine::store::DeviceStore;
use fraud_engine::{
    Collaborators, FraudConfig, FraudEngine, HistoricalTransaction, IpReputation,
    TransactionContext, UserAccount,
};
use serde::Deserialize;
use std::io::Read;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SeedTransaction {
    user_id: String,
    #[serde(flatten)]
    transaction: HistoricalTransaction,
}

#[derive(Debug, Deserialize)]
struct SeedFingerprint {
    user_id: String,
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct SeedDevice {
    user_id: String,
    fingerprint: String,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SeedReputation {
    ip: IpAddr,
    #[serde(flatten)]
    reputation: IpReputation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Scenario {
    accounts: Vec<UserAccount>,
    history: Vec<SeedTransaction>,
    payment_fingerprints: Vec<SeedFingerprint>,
    devices: Vec<SeedDevice>,
    reputations: Vec<SeedReputation>,
    transactions: Vec<TransactionContext>,
}

/// Offline fraud analysis of a scenario read from stdin
#[derive(Debug, Parser)]
#[command(name = "fraud-analyze", version)]
struct Cli {
    /// TOML configuration file; defaults to FRAUD_ENGINE_* environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the results
    #[arg(long)]
    metrics: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("FRAUD_ENGINE_LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn seed(scenario: &Scenario) -> anyhow::Result<Collaborators> {
    let history = Arc::new(InMemoryTransactionHistory::new());
    for seed in &scenario.history {
        history.record(&seed.user_id, seed.transaction.clone());
    }
    for seed in &scenario.payment_fingerprints {
        history.record_fingerprint(&seed.user_id, &seed.fingerprint);
    }

    let accounts = Arc::new(InMemoryAccountDirectory::new());
    for account in &scenario.accounts {
        accounts.insert(account.clone());
    }

    let devices = Arc::new(InMemoryDeviceStore::new());
    for device in &scenario.devices {
        devices
            .remember_device(&device.user_id, &device.fingerprint, device.last_seen)
            .await?;
    }

    let reputation = Arc::new(InMemoryIpReputation::new());
    for seed in &scenario.reputations {
        reputation.insert(seed.ip, seed.reputation.clone());
    }

    Ok(Collaborators {
        history,
        profiles: Arc::new(InMemoryProfileStore::new()),
        analyses: Arc::new(InMemoryAnalysisStore::new()),
        devices,
        accounts,
        reputation,
        blocks: Arc::new(InMemoryBlockStore::new()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => FraudConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FraudConfig::from_env().context("loading config from environment")?,
    };

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading scenario from stdin")?;
    let scenario: Scenario = serde_json::from_str(&input).context("parsing scenario")?;

    tracing::info!(
        transactions = scenario.transactions.len(),
        history = scenario.history.len(),
        "Scenario loaded"
    );

    let engine = FraudEngine::new(config, seed(&scenario).await?)?;
    for ctx in &scenario.transactions {
        let result = engine
            .analyze(ctx)
            .await
            .with_context(|| format!("analyzing {}", ctx.transaction_id))?;
        println!("{}", serde_json::to_string(&result)?);
    }

    if args.metrics {
        print!("{}", engine.metrics().render());
    }
    Ok(())
}
