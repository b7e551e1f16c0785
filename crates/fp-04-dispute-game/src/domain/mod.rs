pub mod claim;
pub mod config;
pub mod game;
pub mod output;

pub use claim::*;
pub use config::GameConfig;
pub use game::*;
pub use output::OutputProposal;
