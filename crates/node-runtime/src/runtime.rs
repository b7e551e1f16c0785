//! # Node Runtime
//!
//! Starts the polling services on the shared shutdown signal and stops
//! them again.
//!
//! ## Tasks
//!
//! | Task | Loop |
//! |------|------|
//! | proposer | submit outputs, defend games |
//! | challenger | check outputs, open and advance games |
//! | status | log challenger/proposer stats, prove the latest output |
//! | preimage | debug TCP server (only with `FP_PREIMAGE_ADDR`) |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fp_04_dispute_game::Ledger;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::container::{NodeConfig, SubsystemContainer};
use crate::demo::batch_input_key;

const STATUS_INTERVAL: Duration = Duration::from_secs(30);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating fault-proof node runtime");
        let container = Arc::new(SubsystemContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Fault-Proof Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let config = &self.container.config;
        let mut tasks = Vec::new();

        if let Some(addr) = config.preimage.tcp_addr {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind preimage server to {addr}"))?;
            let server = Arc::clone(&self.container.preimage_server);
            let shutdown = self.shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = server.serve_tcp(listener, shutdown).await {
                    error!("[preimage] Server stopped: {}", e);
                }
            }));
        }

        tasks.push(tokio::spawn(
            Arc::clone(&self.container.proposer).run(self.shutdown_rx.clone()),
        ));
        tasks.push(tokio::spawn(
            Arc::clone(&self.container.challenger).run(self.shutdown_rx.clone()),
        ));

        let container = Arc::clone(&self.container);
        let mut status_shutdown = self.shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATUS_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_status(&container);
                        check_latest_output(&container).await;
                    }
                    _ = status_shutdown.changed() => return,
                }
            }
        }));

        self.tasks.lock().extend(tasks);

        info!("Proposer: 0x{}", hex::encode(self.container.proposer_address));
        info!("Challenger: 0x{}", hex::encode(self.container.challenger_address));
        info!(
            "Trace length: {} (depth {})",
            config.ledger.trace_length,
            config.ledger.trace_length.trailing_zeros()
        );
        Ok(())
    }

    /// Signal every task and wait for them, up to a grace period.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed during shutdown: {}", e),
                Err(_) => warn!("Task did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }

        log_status(&self.container);
        info!("Shutdown complete");
    }

    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }
}

fn log_status(container: &SubsystemContainer) {
    let challenger = container.challenger.stats();
    let proposer = container.proposer.stats();
    info!(
        "[status] outputs submitted={} checked={} | games opened={} active={} won={} lost={}",
        proposer.outputs_submitted,
        challenger.outputs_checked,
        challenger.games_opened,
        challenger.active_games,
        challenger.games_won,
        challenger.games_lost
    );
}

/// Prove the batch input record of the newest output against the root on
/// the ledger. Fails for an output that does not match local state.
async fn check_latest_output(container: &SubsystemContainer) {
    let ledger = container.ledger.client(container.proposer_address);
    let batch_index = match ledger.get_latest_output_index().await {
        Ok(Some(index)) => index,
        Ok(None) => return,
        Err(e) => {
            warn!("[status] Latest output unavailable: {}", e);
            return;
        }
    };
    match container
        .proposer
        .prove_inclusion(batch_index, &batch_input_key())
        .await
    {
        Ok(proof) => debug!(
            "[status] Batch {} output proven ({} nodes)",
            batch_index,
            proof.nodes.len()
        ),
        Err(e) => warn!("[status] Batch {} output not provable: {}", batch_index, e),
    }
}
