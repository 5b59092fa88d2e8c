//! Network Primitives
//!
//! Interface enumeration, registry host resolution and the subnet
//! containment check the locator is built on.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

mod interfaces;
mod resolver;

pub use interfaces::{InterfaceAddress, InterfaceProvider, StaticInterfaces, SystemInterfaces};
pub use resolver::{Resolver, StaticResolver, SystemResolver};

/// Check whether `candidate` lies in the network `subnet_address/prefix_len`.
///
/// Plain CIDR semantics: the network and broadcast addresses are inside the
/// range, prefix 0 contains everything and a prefix above 32 contains nothing.
pub fn contains(subnet_address: Ipv4Addr, prefix_len: u8, candidate: Ipv4Addr) -> bool {
    match Ipv4Net::new(subnet_address, prefix_len) {
        Ok(net) => net.trunc().contains(&candidate),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test_case("10.0.0.5", 24, "10.0.0.1", true ; "same /24")]
    #[test_case("10.0.0.5", 24, "10.0.1.1", false ; "neighbour /24")]
    #[test_case("10.0.0.5", 24, "10.0.0.0", true ; "network address")]
    #[test_case("10.0.0.5", 24, "10.0.0.255", true ; "broadcast address")]
    #[test_case("172.17.0.3", 16, "172.17.200.9", true ; "docker bridge /16")]
    #[test_case("192.168.1.10", 32, "192.168.1.10", true ; "host route self")]
    #[test_case("192.168.1.10", 32, "192.168.1.11", false ; "host route other")]
    #[test_case("192.168.1.10", 0, "8.8.8.8", true ; "default route")]
    #[test_case("10.128.0.7", 20, "10.128.15.254", true ; "gcp /20 upper edge")]
    #[test_case("10.128.0.7", 20, "10.128.16.1", false ; "gcp /20 outside")]
    fn test_contains(subnet: &str, prefix: u8, candidate: &str, expected: bool) {
        assert_eq!(contains(ip(subnet), prefix, ip(candidate)), expected);
    }

    #[test]
    fn test_invalid_prefix_contains_nothing() {
        assert!(!contains(ip("10.0.0.5"), 33, ip("10.0.0.5")));
    }

    proptest! {
        #[test]
        fn prop_contains_matches_mask(subnet: u32, candidate: u32, prefix in 0u8..=32) {
            let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
            let expected = subnet & mask == candidate & mask;
            prop_assert_eq!(
                contains(Ipv4Addr::from(subnet), prefix, Ipv4Addr::from(candidate)),
                expected
            );
        }

        #[test]
        fn prop_address_in_own_subnet(addr: u32, prefix in 0u8..=32) {
            let addr = Ipv4Addr::from(addr);
            prop_assert!(contains(addr, prefix, addr));
        }
    }
}
