pub mod state;
pub mod witness;

pub use state::*;
pub use witness::*;
