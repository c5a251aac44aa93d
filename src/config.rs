//! Configuration module for countdown settings

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ticks::{DEFAULT_SWITCH_TO_SECONDS, ThresholdSet, TickSequenceGenerator};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Remaining-time marks (seconds) that always produce a tick.
    pub thresholds: Vec<u64>,
    /// Ticks at or below this many seconds are labelled in seconds.
    pub switch_to_seconds: u64,
    /// Lead time given to the display transition before each tick.
    pub anim_duration_ms: u64,
    pub hooks: Hooks,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Hooks {
    pub start: Option<String>,
    pub finish: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSet::default().marks().to_vec(),
            switch_to_seconds: DEFAULT_SWITCH_TO_SECONDS,
            anim_duration_ms: 500,
            hooks: Hooks::default(),
        }
    }
}

impl Config {
    /// Load from `path`, writing a default file first if none exists.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.store(path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
                path: path.to_path_buf(),
                source,
            })?;
        config.generator()?;
        Ok(config)
    }

    pub fn store(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|source| ConfigError::SerializeJson {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn generator(&self) -> Result<TickSequenceGenerator, ConfigError> {
        let thresholds = ThresholdSet::new(self.thresholds.clone())?;
        Ok(TickSequenceGenerator::new(thresholds, self.switch_to_seconds))
    }
}

pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("examtimer").join("config.json"),
        None => PathBuf::from("examtimer-config.json"),
    }
}
