pub mod checkpoint;
pub mod signer;

pub use checkpoint::*;
pub use signer::*;
