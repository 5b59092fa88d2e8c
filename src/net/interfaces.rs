//! Interface Enumeration
//!
//! The locator sees the host's interfaces through [`InterfaceProvider`] so
//! the subnet search can run against a fixed interface table as well as
//! the live system.

use std::fmt;
use std::io;
use std::net::IpAddr;

use if_addrs::IfAddr;
use tracing::warn;

/// One address bound to a network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name (e.g. "eth0", "lo")
    pub name: String,
    /// Address bound to the interface
    pub ip: IpAddr,
    /// Network prefix length of the address
    pub prefix_len: u8,
}

impl InterfaceAddress {
    pub fn new(name: impl Into<String>, ip: IpAddr, prefix_len: u8) -> Self {
        Self {
            name: name.into(),
            ip,
            prefix_len,
        }
    }

    /// Loopback interfaces are named "lo", "lo0", ... on the platforms we run on
    pub fn is_loopback(&self) -> bool {
        self.name.starts_with("lo") || self.ip.is_loopback()
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.name, self.ip, self.prefix_len)
    }
}

/// Source of the host's interface addresses
pub trait InterfaceProvider: Send + Sync {
    /// List every address of every interface, in enumeration order
    fn interfaces(&self) -> io::Result<Vec<InterfaceAddress>>;
}

/// Live interface table of the running host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceProvider for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceAddress>> {
        let addrs = if_addrs::get_if_addrs()?;

        Ok(addrs
            .into_iter()
            .filter_map(|iface| {
                let prefix = match &iface.addr {
                    IfAddr::V4(v4) => ipnet::ipv4_mask_to_prefix(v4.netmask),
                    IfAddr::V6(v6) => ipnet::ipv6_mask_to_prefix(v6.netmask),
                };
                match prefix {
                    Ok(prefix_len) => Some(InterfaceAddress::new(
                        iface.name.clone(),
                        iface.ip(),
                        prefix_len,
                    )),
                    Err(_) => {
                        warn!(
                            "Ignoring {} on interface {}: non-contiguous netmask",
                            iface.ip(),
                            iface.name
                        );
                        None
                    }
                }
            })
            .collect())
    }
}

/// Fixed interface table
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces {
    addresses: Vec<InterfaceAddress>,
}

impl StaticInterfaces {
    pub fn new(addresses: Vec<InterfaceAddress>) -> Self {
        Self { addresses }
    }
}

impl InterfaceProvider for StaticInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceAddress>> {
        Ok(self.addresses.clone())
    }
}
