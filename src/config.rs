use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EcoError, EcoResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kernel: KernelConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub max_iterations: u64,
    /// Consecutive iterations without messages or activity before the run
    /// loop stops.
    pub quiescent_iterations: u64,
    /// Pause between iterations; 0 only yields to the runtime.
    pub tick_interval_ms: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000,
            quiescent_iterations: 5,
            tick_interval_ms: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> EcoResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> EcoResult<Self> {
        toml::from_str(content).map_err(|e| EcoError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> EcoResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> EcoResult<()> {
        if let Some(value) = env_u64("ECO_MAX_ITERATIONS")? {
            self.kernel.max_iterations = value;
        }
        if let Some(value) = env_u64("ECO_QUIESCENT_ITERATIONS")? {
            self.kernel.quiescent_iterations = value;
        }
        if let Some(value) = env_u64("ECO_TICK_INTERVAL_MS")? {
            self.kernel.tick_interval_ms = value;
        }
        if let Ok(filter) = std::env::var("ECO_LOG") {
            self.log_filter = filter;
        }
        self.validate()
    }

    pub fn validate(&self) -> EcoResult<()> {
        if self.kernel.max_iterations == 0 {
            return Err(EcoError::Config("max_iterations must be positive".to_string()));
        }
        if self.kernel.quiescent_iterations == 0 {
            return Err(EcoError::Config(
                "quiescent_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> EcoResult<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EcoError::Config(format!("{} must be an integer, got {:?}", name, value))),
        Err(_) => Ok(None),
    }
}
