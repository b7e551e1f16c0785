pub mod client;

pub use client::{HintWriter, OracleClient};
