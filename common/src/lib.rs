pub mod config;
pub mod types;

pub use config::{Config, SimulatorConfig, UiConfig, MAX_TICK_INTERVAL_SECS};
pub use types::*;
