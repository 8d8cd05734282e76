pub mod encoding;
pub mod errors;
pub mod logging;
pub mod types;
pub mod utils;

pub use errors::*;
pub use logging::*;
pub use types::*;
pub use utils::*;
