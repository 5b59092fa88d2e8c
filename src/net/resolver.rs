//! Registry Host Resolution

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;

use async_trait::async_trait;

/// Resolves registry host names to addresses
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to its addresses, in resolver order
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// System resolver (getaddrinfo through tokio's blocking pool)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Fixed host table, for tests and hosts-file style deployments
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host entry
    pub fn with_host(mut self, host: impl Into<String>, addrs: Vec<IpAddr>) -> Self {
        self.hosts.insert(host.into(), addrs);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> io::Result<Vec<IpAddr>> {
        self.hosts.get(host).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("failed to lookup address information: {}", host),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver =
            StaticResolver::new().with_host("registry", vec!["10.0.0.1".parse().unwrap()]);

        let addrs = resolver.resolve("registry", 8761).await.unwrap();
        assert_eq!(addrs, vec!["10.0.0.1".parse::<IpAddr>().unwrap()]);

        let err = resolver.resolve("unknown", 8761).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_system_resolver_ip_literal() {
        let addrs = SystemResolver.resolve("127.0.0.1", 80).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }
}
