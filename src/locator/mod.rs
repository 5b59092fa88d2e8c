//! Instance Locator
//!
//! Finds the local interface that shares a subnet with one of the configured
//! registry servers and builds the instance descriptor from its address.
//!
//! Each attempt walks the interfaces in enumeration order and, for every
//! interface, the registry endpoints in configuration order. The first
//! (interface, endpoint) pair whose subnet contains the endpoint wins.
//! Without a match the locator sleeps for the retry interval and starts
//! over, until a match is found, the retry policy runs out or shutdown is
//! signalled.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigError, LocatorConfig, RegistryEndpoint};
use crate::descriptor::{DescriptorTemplate, InstanceDescriptor};
use crate::net::{self, InterfaceProvider, Resolver};


/// Why [`InstanceLocator::locate_until`] gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateError {
    /// The retry policy allowed no further attempt
    Exhausted { attempts: u32 },
    /// Shutdown was signalled (or the shutdown sender dropped)
    Cancelled { attempts: u32 },
}

impl LocateError {
    /// Attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            LocateError::Exhausted { attempts } | LocateError::Cancelled { attempts } => *attempts,
        }
    }
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::Exhausted { attempts } => write!(
                f,
                "No local interface shares a subnet with the registry after {} attempts",
                attempts
            ),
            LocateError::Cancelled { attempts } => {
                write!(f, "Locating cancelled after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for LocateError {}

/// How often and how long to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between two attempts
    pub interval: Duration,
    /// Maximum number of attempts (0 = unbounded)
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LocatorConfig) -> Self {
        Self {
            interval: config.retry_interval,
            max_attempts: config.max_attempts,
        }
    }

    /// Whether another attempt is allowed after `attempts` attempts
    fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }
}

/// Locates the registry-facing interface and builds the instance descriptor
pub struct InstanceLocator<I, R> {
    endpoints: Vec<RegistryEndpoint>,
    template: DescriptorTemplate,
    interfaces: I,
    resolver: R,
    policy: RetryPolicy,
}

impl<I: InterfaceProvider, R: Resolver> InstanceLocator<I, R> {
    /// Create a locator with the default (unbounded, 1s) retry policy
    pub fn new(
        endpoints: Vec<RegistryEndpoint>,
        template: DescriptorTemplate,
        interfaces: I,
        resolver: R,
    ) -> Self {
        Self {
            endpoints,
            template,
            interfaces,
            resolver,
            policy: RetryPolicy::default(),
        }
    }

    /// Create a locator from the loaded configuration
    pub fn from_config(config: &Config, interfaces: I, resolver: R) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.registry.endpoints()?,
            DescriptorTemplate::from_config(config),
            interfaces,
            resolver,
        )
        .with_retry_policy(RetryPolicy::from_config(&config.locator)))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoints(&self) -> &[RegistryEndpoint] {
        &self.endpoints
    }

    pub fn template(&self) -> &DescriptorTemplate {
        &self.template
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Locate without a shutdown signal.
    ///
    /// With an unbounded retry policy this only returns once a descriptor
    /// has been built.
    pub async fn locate(&self) -> Result<InstanceDescriptor, LocateError> {
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.locate_until(shutdown_rx).await
    }

    /// Locate, retrying until a match is found, the retry policy runs out
    /// or `shutdown` fires.
    ///
    /// Shutdown is checked before every retry sleep and wakes the sleep.
    /// A dropped shutdown sender counts as shutdown.
    pub async fn locate_until(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<InstanceDescriptor, LocateError> {
        if let Some(ip) = self.template.ip_address {
            info!("Using configured IP address {}, skipping interface scan", ip);
            return Ok(self.template.build(ip));
        }

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            info!("Locating registry subnet, attempt {}", attempts);

            match self.locate_once().await {
                Ok(Some(descriptor)) => {
                    info!(
                        "Located instance {} after {} attempt(s)",
                        descriptor.instance_id(),
                        attempts
                    );
                    return Ok(descriptor);
                }
                Ok(None) => {
                    warn!(
                        "No local interface shares a subnet with any of {} registry server(s)",
                        self.endpoints.len()
                    );
                }
                Err(e) => {
                    error!("Error while detecting the registry client address: {}", e);
                }
            }

            if !self.policy.allows_retry(attempts) {
                error!("Giving up after {} attempts", attempts);
                return Err(LocateError::Exhausted { attempts });
            }

            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => {
                    info!("Shutdown requested, stopping after {} attempts", attempts);
                    return Err(LocateError::Cancelled { attempts });
                }
            }

            debug!("Retrying in {:?}", self.policy.interval);
            tokio::select! {
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = shutdown.recv() => {
                    info!("Shutdown requested, stopping after {} attempts", attempts);
                    return Err(LocateError::Cancelled { attempts });
                }
            }
        }
    }

    /// Run a single attempt.
    ///
    /// Returns `Ok(None)` when no interface matches, and the enumeration
    /// error when the interfaces could not be listed.
    pub async fn locate_once(&self) -> io::Result<Option<InstanceDescriptor>> {
        let addresses = self.interfaces.interfaces()?;
        let servers = self.resolve_endpoints().await;

        if servers.is_empty() {
            warn!("No registry server could be resolved to an IPv4 address");
            return Ok(None);
        }

        for address in &addresses {
            if address.is_loopback() {
                debug!("Skipping loopback interface {}", address);
                continue;
            }

            let local = match address.ip {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(_) => {
                    info!("Skipping IPv6 from interface {}", address);
                    continue;
                }
            };

            info!("Interface {}", address);

            for (endpoint, server_ip) in &servers {
                let matches = net::contains(local, address.prefix_len, *server_ip);
                info!("Testing server {} ({}): {}", endpoint, server_ip, matches);

                if matches {
                    info!("Found interface {}: {}", address.name, local);
                    return Ok(Some(self.template.build(IpAddr::V4(local))));
                }
            }
        }

        Ok(None)
    }

    /// Resolve every endpoint to its first IPv4 address, in configuration order.
    ///
    /// Endpoints that fail to resolve are logged and left out of this attempt.
    async fn resolve_endpoints(&self) -> Vec<(&RegistryEndpoint, Ipv4Addr)> {
        let mut resolved = Vec::with_capacity(self.endpoints.len());

        for endpoint in &self.endpoints {
            let addrs = match endpoint.host.parse::<IpAddr>() {
                Ok(ip) => vec![ip],
                Err(_) => match self.resolver.resolve(&endpoint.host, endpoint.port).await {
                    Ok(addrs) => addrs,
                    Err(e) => {
                        warn!("Failed to resolve registry server {}: {}", endpoint, e);
                        continue;
                    }
                },
            };

            let v4 = addrs.into_iter().find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            });

            match v4 {
                Some(ip) => resolved.push((endpoint, ip)),
                None => warn!("Registry server {} has no IPv4 address", endpoint),
            }
        }

        resolved
    }
}
