//! Sidecar Locator - registry-facing address discovery for monitoring sidecars
//!
//! Finds the local network interface that shares a subnet with the service
//! registry and builds the instance descriptor the registration client
//! publishes.

pub mod config;
pub mod descriptor;
pub mod locator;
pub mod net;

pub use config::Config;
pub use descriptor::{DescriptorTemplate, InstanceDescriptor};
pub use locator::{InstanceLocator, LocateError, RetryPolicy};
pub use net::{InterfaceProvider, Resolver, SystemInterfaces, SystemResolver};
