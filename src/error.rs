//! Error types for countdown and configuration operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting or scheduling a countdown
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountdownError {
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    #[error("tick at {tick_secs}s lies outside a {total_secs}s countdown")]
    InvalidDelay { tick_secs: u64, total_secs: u64 },

    #[error("a countdown is already running; reset it first")]
    AlreadyRunning,
}

impl CountdownError {
    pub(crate) fn invalid_duration(input: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason,
        }
    }
}

/// Errors during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON in {path}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config for {path}")]
    SerializeJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write default config to {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(&'static str),
}
