//! Instance Descriptor
//!
//! The identity and connectivity record the instance publishes to the
//! registry, and the template it is built from once the local address is
//! known.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;

use crate::config::Config;

/// Metadata key advertising the management (actuator) port
pub const MANAGEMENT_PORT_KEY: &str = "management.port";
/// Metadata key advertising the JMX remote port
pub const JMX_PORT_KEY: &str = "jmx.port";

/// Self-reported identity of this instance
///
/// Built once by the locator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    instance_id: String,
    hostname: String,
    ip_address: String,
    secure_port_enabled: bool,
    secure_port: Option<u16>,
    non_secure_port_enabled: bool,
    non_secure_port: Option<u16>,
    health_check_url: String,
    status_page_url: String,
    register_with_registry: bool,
    metadata: BTreeMap<String, String>,
}

impl InstanceDescriptor {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn secure_port_enabled(&self) -> bool {
        self.secure_port_enabled
    }

    pub fn secure_port(&self) -> Option<u16> {
        self.secure_port
    }

    pub fn non_secure_port_enabled(&self) -> bool {
        self.non_secure_port_enabled
    }

    pub fn non_secure_port(&self) -> Option<u16> {
        self.non_secure_port
    }

    pub fn health_check_url(&self) -> &str {
        &self.health_check_url
    }

    pub fn status_page_url(&self) -> &str {
        &self.status_page_url
    }

    /// False when the registration client must not publish this instance
    pub fn register_with_registry(&self) -> bool {
        self.register_with_registry
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// Everything in a descriptor that does not depend on the chosen address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTemplate {
    /// Explicit instance ID
    pub instance_id: Option<String>,
    /// Explicit hostname
    pub hostname: Option<String>,
    /// Explicit IP address; the locator skips the interface scan when set
    pub ip_address: Option<IpAddr>,
    /// Report the IP as hostname when no hostname is configured
    pub prefer_ip_address: bool,
    pub secure_port_enabled: bool,
    pub secure_port: Option<u16>,
    pub non_secure_port_enabled: bool,
    pub non_secure_port: Option<u16>,
    /// Health check path, management context path included
    pub health_check_url_path: String,
    /// Status page path, management context path included
    pub status_page_url_path: String,
    /// Registration toggle; the bootstrap context never registers
    pub register_with_registry: bool,
    pub metadata: BTreeMap<String, String>,
}

impl DescriptorTemplate {
    /// Build the template from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let instance = &config.instance;
        let port = config.server.port;

        let (secure_port, non_secure_port) = if instance.secure_port_enabled {
            (Some(port), None)
        } else {
            (None, Some(port))
        };

        // The actuator sits under the application context path unless it
        // has a port of its own
        let server_prefix = match config.management.port {
            Some(_) => "",
            None => config.server.context_path.as_str(),
        };
        let prefix = format!(
            "{}{}",
            normalize_context_path(server_prefix),
            normalize_context_path(config.management.context_path.as_deref().unwrap_or(""))
        );

        let mut metadata = instance.metadata.clone();
        if let Some(management_port) = config.management.port {
            metadata
                .entry(MANAGEMENT_PORT_KEY.to_string())
                .or_insert_with(|| management_port.to_string());
        }
        if let Some(jmx_port) = config.jmx_port {
            metadata
                .entry(JMX_PORT_KEY.to_string())
                .or_insert_with(|| jmx_port.to_string());
        }

        Self {
            instance_id: non_blank(&instance.instance_id),
            hostname: non_blank(&instance.hostname),
            // Config::validate guarantees the override parses
            ip_address: instance
                .ip_address
                .as_deref()
                .and_then(|ip| ip.parse().ok()),
            prefer_ip_address: instance.prefer_ip_address,
            secure_port_enabled: instance.secure_port_enabled,
            secure_port,
            non_secure_port_enabled: !instance.secure_port_enabled,
            non_secure_port,
            health_check_url_path: format!("{}{}", prefix, instance.health_check_url_path),
            status_page_url_path: format!("{}{}", prefix, instance.status_page_url_path),
            register_with_registry: config.should_register(),
            metadata,
        }
    }

    /// Port registered with the registry
    pub fn registered_port(&self) -> u16 {
        let port = if self.secure_port_enabled {
            self.secure_port
        } else {
            self.non_secure_port
        };
        port.unwrap_or_default()
    }

    /// URL scheme for health and status pages
    pub fn scheme(&self) -> &'static str {
        if self.secure_port_enabled {
            "https"
        } else {
            "http"
        }
    }

    /// Build the descriptor for the chosen local address.
    ///
    /// Configured overrides win; the address only fills what is not set.
    pub fn build(&self, ip: IpAddr) -> InstanceDescriptor {
        let ip_address = self.ip_address.unwrap_or(ip);
        let ip_string = ip_address.to_string();

        let hostname = self
            .hostname
            .clone()
            .unwrap_or_else(|| self.default_hostname(&ip_string));

        let port = self.registered_port();
        let instance_id = self
            .instance_id
            .clone()
            .unwrap_or_else(|| format!("{}:{}:{}", ip_string, hostname, port));

        let url_host = match ip_address {
            IpAddr::V4(_) => ip_string.clone(),
            IpAddr::V6(_) => format!("[{}]", ip_string),
        };
        // The management port is only advertised through the metadata
        let base = format!("{}://{}:{}", self.scheme(), url_host, port);

        InstanceDescriptor {
            instance_id,
            hostname,
            ip_address: ip_string,
            secure_port_enabled: self.secure_port_enabled,
            secure_port: self.secure_port,
            non_secure_port_enabled: self.non_secure_port_enabled,
            non_secure_port: self.non_secure_port,
            health_check_url: format!("{}{}", base, self.health_check_url_path),
            status_page_url: format!("{}{}", base, self.status_page_url_path),
            register_with_registry: self.register_with_registry,
            metadata: self.metadata.clone(),
        }
    }

    fn default_hostname(&self, ip: &str) -> String {
        if self.prefer_ip_address {
            return ip.to_string();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| ip.to_string())
    }
}

/// "/" and "" become "", otherwise a leading slash and no trailing one
fn normalize_context_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
