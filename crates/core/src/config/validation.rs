//! Sanity checks on loaded settings: timeouts, endpoints, viewport.

use crate::config::AppConfig;
use thiserror::Error;

/// Why settings could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` or `render_timeout_ms` is below 100ms or above 5 minutes
    /// - `base_url`, `cdn_url` or `user_agent` is empty
    /// - a viewport dimension is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("timeout_ms", self.timeout_ms), ("render_timeout_ms", self.render_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        for (field, value) in
            [("base_url", &self.base_url), ("cdn_url", &self.cdn_url), ("user_agent", &self.user_agent)]
        {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid { field: "viewport".into(), reason: "dimensions must be non-zero".into() });
        }

        if self.webhook_url.is_some() && self.mention_directory.is_empty() {
            tracing::warn!("webhook_url is set but mention_directory is empty; no notification will be sent");
        }

        Ok(())
    }
}
