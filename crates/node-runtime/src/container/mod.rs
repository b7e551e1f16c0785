//! # Subsystem Container
//!
//! Central container holding all subsystem instances, plus the node
//! configuration they are built from.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, DemoConfig, LedgerConfig, NodeConfig, PreimageConfig};
pub use subsystems::SubsystemContainer;
