//! # Fault-Proof Node Runtime
//!
//! Runs a proposer and a challenger against an in-process ledger.
//!
//! ## Flow
//!
//! ```text
//! Execution Oracle ──final state per batch──→ Proposer ──submit_output──→ Ledger
//! State Provider ───root per batch──────────↗                                │
//!                Challenger ←──get_output_mpt_root───────────────────────────┘
//!                    │  mismatch
//!                    ↓
//!            create_dispute_game ──→ attack / defend ... step ──→ resolve
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `FP_*` environment variables
//! 2. Validate (factory address, trace length, poll interval)
//! 3. Build subsystems in dependency order
//! 4. Spawn polling tasks
//! 5. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{NodeConfig, NodeRuntime};

/// Load configuration from the environment.
fn load_config() -> NodeConfig {
    NodeConfig::from_lookup(|name| std::env::var(name).ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config();
    config.validate().context("Invalid configuration")?;

    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
