pub mod anchor;
pub mod packet;
pub mod verifier;

pub use anchor::*;
pub use packet::*;
pub use verifier::*;
