use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_event_probability")]
    pub event_probability: f64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Fixed RNG seed for reproducible feeds; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            tick_interval_secs: default_tick_interval_secs(),
            event_probability: default_event_probability(),
            capacity: default_capacity(),
            seed: None,
        }
    }
}

/// Longest tick period accepted; timestamps and timers stay well in range.
pub const MAX_TICK_INTERVAL_SECS: u64 = 86_400;

impl SimulatorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            bail!("simulator.tick_interval_secs must be at least 1");
        }
        if self.tick_interval_secs > MAX_TICK_INTERVAL_SECS {
            bail!(
                "simulator.tick_interval_secs must be at most {}, got {}",
                MAX_TICK_INTERVAL_SECS,
                self.tick_interval_secs
            );
        }
        if self.capacity == 0 {
            bail!("simulator.capacity must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.event_probability) {
            bail!("simulator.event_probability must be within [0, 1], got {}", self.event_probability);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_notification_secs")]
    pub notification_secs: u64,
    #[serde(default = "default_refresh_millis")]
    pub refresh_millis: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            notification_secs: default_notification_secs(),
            refresh_millis: default_refresh_millis(),
        }
    }
}

fn default_tick_interval_secs() -> u64 { 3 }
fn default_event_probability() -> f64 { 0.3 }
fn default_capacity() -> usize { 10 }
fn default_notification_secs() -> u64 { 3 }
fn default_refresh_millis() -> u64 { 100 }

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise the built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn default_path() -> String {
        std::env::var("ZTNA_CONFIG")
            .unwrap_or_else(|_| "./config/default.toml".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        self.simulator.validate()
    }
}
