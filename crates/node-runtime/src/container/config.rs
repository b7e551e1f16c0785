//! # Node Configuration
//!
//! Defaults for every subsystem, overridden from `FP_*` environment
//! variables.
//!
//! ## Required
//!
//! - `FP_DISPUTE_GAME_FACTORY` MUST be set to a non-zero address

use std::net::SocketAddr;
use std::time::Duration;

use fp_05_bisection::{ChallengerConfig, ProposerConfig};
use serde::{Deserialize, Serialize};
use shared_types::{parse_address, Address, ZERO_ADDRESS};
use thiserror::Error;
use tracing::{info, warn};

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    pub ledger: LedgerConfig,
    pub challenger: ChallengerConfig,
    pub proposer: ProposerConfig,
    pub preimage: PreimageConfig,
    pub demo: DemoConfig,
}

/// Dispute game parameters shared by every game the ledger creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Dispute game factory address. Zero means "not configured".
    pub factory: Address,
    /// Steps covered by one game. Must be a power of two.
    pub trace_length: u64,
    pub challenge_window: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            factory: ZERO_ADDRESS,
            trace_length: 1024,
            challenge_window: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreimageConfig {
    /// Optional TCP address for the debug preimage server.
    pub tcp_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Synthetic batches preloaded into the state provider.
    pub batches: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { batches: 8 }
    }
}

/// Configuration errors. These are the only fatal startup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dispute game factory address is not set (FP_DISPUTE_GAME_FACTORY)")]
    MissingFactory,

    #[error("trace length {0} is not a power of two")]
    InvalidTraceLength(u64),

    #[error("challenger poll interval must be non-zero")]
    ZeroPollInterval,
}

impl NodeConfig {
    /// Build from defaults plus whatever `lookup` returns for each `FP_*`
    /// variable. Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("FP_DISPUTE_GAME_FACTORY") {
            match parse_address(&raw) {
                Some(address) => {
                    config.ledger.factory = address;
                    info!("Loaded dispute game factory from environment");
                }
                None => warn!("FP_DISPUTE_GAME_FACTORY must be 20 bytes (40 hex chars)"),
            }
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FP_POLL_INTERVAL_MS") {
            config.challenger.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "FP_CHALLENGE_EVERY_N") {
            config.challenger.challenge_every_n = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FP_SUBMIT_INTERVAL_MS") {
            config.proposer.submit_interval = Duration::from_millis(ms);
        }
        if let Some(length) = parse_var(&lookup, "FP_TRACE_LENGTH") {
            config.ledger.trace_length = length;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FP_CHALLENGE_WINDOW_SECS") {
            config.ledger.challenge_window = Duration::from_secs(secs);
        }
        if let Some(batch) = parse_var(&lookup, "FP_CORRUPT_OUTPUT") {
            config.proposer.corrupt_output = Some(batch);
        }
        if let Some(addr) = parse_var(&lookup, "FP_PREIMAGE_ADDR") {
            config.preimage.tcp_addr = Some(addr);
        }
        if let Some(batches) = parse_var(&lookup, "FP_DEMO_BATCHES") {
            config.demo.batches = batches;
        }

        config
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.factory == ZERO_ADDRESS {
            return Err(ConfigError::MissingFactory);
        }
        if !self.ledger.trace_length.is_power_of_two() {
            return Err(ConfigError::InvalidTraceLength(self.ledger.trace_length));
        }
        if self.challenger.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::from_lookup(lookup(&[]));
        assert_eq!(config.ledger.trace_length, 1024);
        assert_eq!(config.ledger.challenge_window, Duration::from_secs(300));
        assert_eq!(config.challenger.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.challenger.challenge_every_n, 1);
        assert_eq!(config.proposer.corrupt_output, None);
        assert_eq!(config.preimage.tcp_addr, None);
        assert_eq!(config.demo.batches, 8);
    }

    #[test]
    fn test_overrides() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("FP_DISPUTE_GAME_FACTORY", "0x00000000000000000000000000000000000000fa"),
            ("FP_POLL_INTERVAL_MS", "250"),
            ("FP_CHALLENGE_EVERY_N", "4"),
            ("FP_SUBMIT_INTERVAL_MS", "100"),
            ("FP_TRACE_LENGTH", "64"),
            ("FP_CHALLENGE_WINDOW_SECS", "30"),
            ("FP_CORRUPT_OUTPUT", "3"),
            ("FP_PREIMAGE_ADDR", "127.0.0.1:7070"),
            ("FP_DEMO_BATCHES", "2"),
        ]));

        assert_eq!(config.ledger.factory[19], 0xfa);
        assert_eq!(config.challenger.poll_interval, Duration::from_millis(250));
        assert_eq!(config.challenger.challenge_every_n, 4);
        assert_eq!(config.proposer.submit_interval, Duration::from_millis(100));
        assert_eq!(config.ledger.trace_length, 64);
        assert_eq!(config.ledger.challenge_window, Duration::from_secs(30));
        assert_eq!(config.proposer.corrupt_output, Some(3));
        assert_eq!(config.preimage.tcp_addr, Some("127.0.0.1:7070".parse().unwrap()));
        assert_eq!(config.demo.batches, 2);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("FP_DISPUTE_GAME_FACTORY", "0x1234"),
            ("FP_TRACE_LENGTH", "lots"),
        ]));
        assert_eq!(config.ledger.factory, ZERO_ADDRESS);
        assert_eq!(config.ledger.trace_length, 1024);
    }

    #[test]
    fn test_validate() {
        let mut config = NodeConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingFactory));

        config.ledger.factory = [1; 20];
        config.ledger.trace_length = 1000;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTraceLength(1000)));

        config.ledger.trace_length = 1024;
        config.challenger.poll_interval = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[test]
    fn test_serializes() {
        let json = serde_json::to_string(&NodeConfig::default()).unwrap();
        assert!(json.contains("trace_length"));
    }
}
