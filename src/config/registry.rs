//! Registry Client Configuration
//!
//! Registry service URLs and the parsed endpoints the locator tests
//! interface subnets against.

use serde::Deserialize;
use url::Url;

use super::ConfigError;

/// Registry client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry service URLs, in priority order
    /// Format: "http://host:port/eureka/"
    #[serde(default)]
    pub service_urls: Vec<String>,

    /// Whether to register with the registry at all
    /// Default: true
    #[serde(default = "default_register")]
    pub register: bool,
}

fn default_register() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            service_urls: Vec::new(),
            register: default_register(),
        }
    }
}

/// A registry server the instance should be able to reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    /// Service URL as configured
    pub url: String,
    /// Host component of the URL (name or IP literal)
    pub host: String,
    /// Explicit port or the scheme's default
    pub port: u16,
}

impl RegistryEndpoint {
    /// Parse a registry service URL
    pub fn parse(service_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(service_url).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid registry service URL '{}': {}",
                service_url, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Registry service URL '{}' must use http or https",
                service_url
            )));
        }

        // IPv6 literals come back bracketed from host_str()
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Registry service URL '{}' has no host",
                    service_url
                ))
            })?;

        let port = url.port_or_known_default().ok_or_else(|| {
            ConfigError::Validation(format!(
                "Registry service URL '{}' has no port",
                service_url
            ))
        })?;

        Ok(Self {
            url: service_url.to_string(),
            host,
            port,
        })
    }
}

impl std::fmt::Display for RegistryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

impl RegistryConfig {
    /// Parse every service URL, keeping configuration order
    pub fn endpoints(&self) -> Result<Vec<RegistryEndpoint>, ConfigError> {
        if self.service_urls.is_empty() {
            return Err(ConfigError::Validation(
                "registry.service_urls must contain at least one URL".to_string(),
            ));
        }

        self.service_urls
            .iter()
            .map(|s| RegistryEndpoint::parse(s.trim()))
            .collect()
    }
}
