//! Plugin configuration.
//!
//! Settings are plain serde structs so the host can pass them across the
//! bridge as JSON. Missing fields fall back to their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration JSON could not be parsed.
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds an unusable value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a geofire session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofireConfig {
    /// Upper bound on how long a radius query may wait for the store's
    /// ready signal, in seconds. `0` disables the bound.
    pub query_timeout_secs: u64,

    /// How long `getCurrentLocation` waits for a first fix, in seconds.
    pub location_wait_secs: u64,

    /// Capacity of the session's command queue.
    pub command_buffer: usize,

    /// Fixed root for writes and deletes.
    ///
    /// When set, `saveLocation`, `setLocation` and `removeLocation` write
    /// under `<write_root>/<userId>` regardless of the node passed to
    /// `initialize`. Queries always use the initialized node.
    pub write_root: Option<String>,
}

impl Default for GeofireConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 30,
            location_wait_secs: 10,
            command_buffer: 32,
            write_root: None,
        }
    }
}

impl GeofireConfig {
    /// Returns the query timeout, or `None` when unbounded.
    #[must_use]
    pub const fn query_timeout(&self) -> Option<Duration> {
        if self.query_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.query_timeout_secs))
        }
    }

    /// Returns how long to wait for a first location fix.
    #[must_use]
    pub const fn location_wait(&self) -> Duration {
        Duration::from_secs(self.location_wait_secs)
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the command buffer is zero or the
    /// write root is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_buffer == 0 {
            return Err(ConfigError::Invalid(
                "command_buffer must be at least 1".to_string(),
            ));
        }
        if let Some(root) = &self.write_root {
            if root.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "write_root must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Parses and validates a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}
