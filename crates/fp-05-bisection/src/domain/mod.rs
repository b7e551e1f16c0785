pub mod search;
pub mod strategy;

pub use search::*;
pub use strategy::*;
