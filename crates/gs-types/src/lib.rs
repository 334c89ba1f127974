pub mod config;
pub mod errors;
pub mod sweep;

pub use config::*;
pub use errors::*;
pub use sweep::*;
