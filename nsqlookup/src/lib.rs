//! # nsqlookup
//!
//! Cancellation-aware discovery of nsqlookupd addresses.
//!
//! nsqlookup provides:
//! - **One trait** ([`Resolver`]) answering "which lookup nodes are live"
//! - **Static lists** and **ad-hoc closures** as resolvers
//! - **Consul** health-API discovery and optional **DNS** discovery
//! - **Caching** with a freshness window and coalesced refreshes
//! - **Fan-out** over any mix of resolvers
//!
//! Every call takes a [`Context`]; cancelling it (or letting its deadline
//! pass) makes any resolver, cached or not, fail with
//! [`ResolveError::Canceled`].
//!
//! ## Quick Start
//!
//! ```rust
//! use nsqlookup::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ResolveError> {
//! // Static fallbacks plus whatever else is configured, cached for 30s
//! let resolver = MultiResolver::new()
//!     .with(Servers::new(["10.0.0.1:4161", "10.0.0.2:4161"]))
//!     .cached(Duration::from_secs(30));
//!
//! let ctx = Context::with_timeout(Duration::from_secs(5));
//! let addrs = resolver.resolve(&ctx).await?;
//! assert_eq!(addrs.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `consul` (default) - Enable the Consul health-API resolver
//! - `dns` - Enable DNS-based discovery (A/AAAA and SRV)
//! - `full` - Enable all features
//!
//! ## Architecture
//!
//! nsqlookup is composed of several crates:
//!
//! - [`nsqlookup-core`] - Resolve context and error types
//! - [`nsqlookup-discovery`] - The resolver trait and its implementations

// Re-export core types
pub use nsqlookup_core::{BoxError, CancellationToken, Context, ResolveError};

// Re-export discovery
pub use nsqlookup_discovery::{
    BoxResolver, CachedResolver, FailurePolicy, MultiResolver, Resolver, ResolverExt, ResolverFn,
    Servers, resolver_fn,
};

#[cfg(feature = "consul")]
pub use nsqlookup_discovery::{
    ConsulConfig, ConsulResolver, DEFAULT_ADDRESS, DEFAULT_SERVICE, RegistryError,
};

#[cfg(feature = "dns")]
pub use nsqlookup_discovery::DnsResolver;

/// Prelude module for convenient imports.
///
/// ```rust
/// use nsqlookup::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CachedResolver, Context, MultiResolver, ResolveError, Resolver, ResolverExt, Servers,
        resolver_fn,
    };

    #[cfg(feature = "consul")]
    pub use crate::ConsulResolver;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
