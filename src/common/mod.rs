pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
