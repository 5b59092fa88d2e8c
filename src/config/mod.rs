//! Configuration Module
//!
//! Provides TOML-based configuration for the locator with support for:
//! - Registry service URLs and registration toggle
//! - Application server and management (actuator) ports
//! - Instance overrides (hostname, IP address, instance ID, metadata)
//! - Locator retry policy
//! - Environment variable overrides (SIDECAR__* prefix)

use std::collections::BTreeMap;
use std::path::Path;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

pub use locator::LocatorConfig;
pub use registry::{RegistryConfig, RegistryEndpoint};

mod locator;
mod registry;

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").unwrap();
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests;

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Config(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,
    /// Application identity
    pub application: ApplicationConfig,
    /// Registry client configuration
    pub registry: RegistryConfig,
    /// Application server configuration
    pub server: ServerConfig,
    /// Management (actuator) server configuration
    pub management: ManagementConfig,
    /// Instance registration overrides
    pub instance: InstanceConfig,
    /// JMX remote port advertised in the instance metadata
    pub jmx_port: Option<u16>,
    /// Locator retry policy
    pub locator: LocatorConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Application identity
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name, reported as the registry app name
    pub name: Option<String>,
    /// Name of the configuration context; "bootstrap" never registers
    pub config_name: Option<String>,
}

impl ApplicationConfig {
    /// Whether this process runs the bootstrap configuration context
    pub fn is_bootstrap(&self) -> bool {
        self.config_name.as_deref() == Some("bootstrap")
    }
}

/// Application server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the application listens on
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Servlet-style context path of the application
    #[serde(default = "default_context_path")]
    pub context_path: String,
}

fn default_server_port() -> u16 {
    8080
}

fn default_context_path() -> String {
    "/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            context_path: default_context_path(),
        }
    }
}

/// Management (actuator) server configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ManagementConfig {
    /// Separate port serving the actuator endpoints
    pub port: Option<u16>,
    /// Context path prefixed to the health and status paths
    pub context_path: Option<String>,
}

/// Instance registration overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Explicit instance ID; computed from ip, hostname and port otherwise
    pub instance_id: Option<String>,
    /// Explicit hostname; wins over the computed one
    pub hostname: Option<String>,
    /// Explicit IP address; when set, no interface scan happens
    pub ip_address: Option<String>,
    /// Report the IP address as hostname when no hostname is configured
    #[serde(default = "default_true")]
    pub prefer_ip_address: bool,
    /// Register the secure (https) port instead of the plain one
    pub secure_port_enabled: bool,
    /// Path of the health check endpoint
    #[serde(default = "default_health_check_url_path")]
    pub health_check_url_path: String,
    /// Path of the status page endpoint
    #[serde(default = "default_status_page_url_path")]
    pub status_page_url_path: String,
    /// Extra metadata published with the instance
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_health_check_url_path() -> String {
    "/actuator/health".to_string()
}

fn default_status_page_url_path() -> String {
    "/actuator/info".to_string()
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            hostname: None,
            ip_address: None,
            prefer_ip_address: true,
            secure_port_enabled: false,
            health_check_url_path: default_health_check_url_path(),
            status_page_url_path: default_status_page_url_path(),
            metadata: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax in the TOML file
    /// 2. Override via env vars: `SIDECAR__` prefix with double underscores for nesting:
    ///    - `SIDECAR__SERVER__PORT=9090` overrides `server.port`
    ///    - `SIDECAR__INSTANCE__IP_ADDRESS=10.1.2.3` overrides `instance.ip_address`
    ///    - `SIDECAR__LOCATOR__MAX_ATTEMPTS=30` overrides `locator.max_attempts`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(Some(path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Same sources as [`Config::load`], without validation.
    ///
    /// Lets the caller apply command line overrides before validating.
    /// Without a path only the defaults and `SIDECAR__*` variables apply.
    pub fn read(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("server.port", 8080)?
            .set_default("server.context_path", "/")?
            .set_default("instance.prefer_ip_address", true)?
            .set_default("instance.secure_port_enabled", false)?
            .set_default("instance.health_check_url_path", "/actuator/health")?
            .set_default("instance.status_page_url_path", "/actuator/info")?
            .set_default("registry.register", true)?
            .set_default("locator.retry_interval", "1s")?
            .set_default("locator.max_attempts", 0)?;

        // Load from file with env var substitution
        if let Some(path) = path {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let substituted = substitute_env_vars(&content);
                    builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // File doesn't exist, use defaults
                }
                Err(e) => return Err(ConfigError::Io(e)),
            }
        }

        // SIDECAR__REGISTRY__SERVICE_URLS accepts a comma separated list
        let cfg = builder
            .add_source(
                Environment::with_prefix("SIDECAR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("registry.service_urls")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.endpoints()?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.management.port == Some(0) {
            return Err(ConfigError::Validation(
                "management.port must be non-zero".to_string(),
            ));
        }

        for (name, path) in [
            ("health_check_url_path", &self.instance.health_check_url_path),
            ("status_page_url_path", &self.instance.status_page_url_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "instance.{} must start with '/': {}",
                    name, path
                )));
            }
        }

        if let Some(ref ip) = self.instance.ip_address {
            if ip.parse::<std::net::IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "instance.ip_address is not an IP address: {}",
                    ip
                )));
            }
        }

        if self.locator.retry_interval.is_zero() {
            return Err(ConfigError::Validation(
                "locator.retry_interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the instance should register with the registry.
    ///
    /// The bootstrap configuration context never registers.
    pub fn should_register(&self) -> bool {
        self.registry.register && !self.application.is_bootstrap()
    }
}
