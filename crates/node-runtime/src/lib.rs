//! # Node Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary.
//!
//! ## Layout
//!
//! - `container/` - configuration and subsystem construction
//! - `demo` - the program both parties execute and its local inputs
//! - `runtime` - task startup and graceful shutdown

pub mod container;
pub mod demo;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
