pub mod config;
pub mod types;

pub use config::{ConfigError, StellarConfig};
pub use types::*;
