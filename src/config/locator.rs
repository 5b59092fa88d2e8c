//! Locator Configuration
//!
//! Retry policy for the registry subnet search.

use serde::Deserialize;
use std::time::Duration;

/// Locator retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Pause between two attempts (e.g., "1s", "500ms")
    /// Default: 1s
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub retry_interval: Duration,

    /// Give up after this many attempts (0 = retry forever)
    /// Default: 0
    pub max_attempts: u32,
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            retry_interval: default_retry_interval(),
            max_attempts: 0,
        }
    }
}
