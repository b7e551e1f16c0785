pub mod local_oracle;
pub mod state_provider;

pub use local_oracle::LocalExecutionOracle;
pub use state_provider::InMemoryStateProvider;
