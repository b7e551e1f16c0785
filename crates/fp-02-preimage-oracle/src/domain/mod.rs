pub mod key;
pub mod local;
pub mod store;

pub use key::*;
pub use local::{local_ident, GameOracle, LocalContext};
pub use store::PreimageStore;
