pub mod base;
pub mod logging;
pub mod player;
pub mod upstream;

pub use base::*;
pub use logging::*;
pub use player::*;
pub use upstream::*;
