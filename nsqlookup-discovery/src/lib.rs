//! # nsqlookup-discovery
//!
//! Resolvers answering "which nsqlookupd instances are live right now".
//!
//! This crate provides:
//! - `Resolver` trait shared by every discovery backend
//! - `Servers` for a fixed address list and `resolver_fn` for ad-hoc logic
//! - `CachedResolver` for time-bounded memoization
//! - `MultiResolver` for fanning out over several resolvers
//! - `ConsulResolver` for the Consul health API (with `consul` feature)
//! - `DnsResolver` for A/AAAA and SRV lookups (with `dns` feature)

mod cache;
mod multi;
mod resolver;

#[cfg(feature = "consul")]
mod consul;

#[cfg(feature = "dns")]
mod dns;

pub use cache::CachedResolver;
pub use multi::{FailurePolicy, MultiResolver};
pub use resolver::{BoxResolver, Resolver, ResolverExt, ResolverFn, Servers, resolver_fn};

#[cfg(feature = "consul")]
pub use consul::{ConsulConfig, ConsulResolver, DEFAULT_ADDRESS, DEFAULT_SERVICE, RegistryError};

#[cfg(feature = "dns")]
pub use dns::DnsResolver;
