pub mod config;
pub mod types;

pub use config::{BalancerConfig, ConfigError, DEFAULT_WINDOW_SIZE};
pub use types::*;
