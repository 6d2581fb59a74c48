//! Agency-level checklist settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::{Backoff, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Settings errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid retry setting: {0}")]
    Invalid(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Attempts and base delay for one direction of store traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX)
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySettings {
    fn policy(&self, backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
            backoff,
        }
    }
}

/// Settings read by the session and the authoring surface.
///
/// Every field has a default, so `{}` is a valid settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSettings {
    /// Agency allows clinicians to mark a whole section N/A
    #[serde(default)]
    pub allow_na_skip: bool,
    /// New definitions default to the proficiency format
    #[serde(default)]
    pub new_format_enabled: bool,
    #[serde(default)]
    pub read_retry: RetrySettings,
    #[serde(default)]
    pub write_retry: RetrySettings,
}

impl ChecklistSettings {
    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> SettingsResult<()> {
        if self.read_retry.max_attempts == 0 {
            return Err(SettingsError::Invalid("read_retry.max_attempts must be at least 1".into()));
        }
        if self.write_retry.max_attempts == 0 {
            return Err(SettingsError::Invalid("write_retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Linear policy for loads.
    pub fn read_policy(&self) -> RetryPolicy {
        self.read_retry.policy(Backoff::Linear)
    }

    /// Exponential policy for saves.
    pub fn write_policy(&self) -> RetryPolicy {
        self.write_retry.policy(Backoff::Exponential)
    }
}
