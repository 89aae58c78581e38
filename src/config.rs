//! Pipeline configuration.

use std::time::Duration;

use serde::Deserialize;

fn default_check_delay() -> u64 {
    60
}

fn default_promote_interval() -> u64 {
    60
}

/// Knobs for the campaign pipeline.
///
/// Loadable from the environment (`ADMIN_EMAIL`, `CHECK_DELAY_SECS`,
/// `PROMOTE_INTERVAL_SECS`) or constructed directly.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Destination for campaign delivery reports.
    pub admin_email: String,

    /// Delay between completion checks for an in-progress campaign
    /// (default: 60s).
    #[serde(default = "default_check_delay")]
    pub check_delay_secs: u64,

    /// Cadence of the sweep that promotes due campaigns (default: 60s).
    #[serde(default = "default_promote_interval")]
    pub promote_interval_secs: u64,
}

impl PipelineConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        serde_env::from_env().map_err(|e| ConfigError::Env(e.to_string()))
    }

    /// Config with the given report destination and default timings.
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
            check_delay_secs: default_check_delay(),
            promote_interval_secs: default_promote_interval(),
        }
    }

    /// Delay before (re-)checking a campaign for completion.
    pub fn check_delay(&self) -> Duration {
        Duration::from_secs(self.check_delay_secs)
    }

    /// Interval between due-campaign sweeps.
    pub fn promote_interval(&self) -> Duration {
        Duration::from_secs(self.promote_interval_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Env(String),
}
