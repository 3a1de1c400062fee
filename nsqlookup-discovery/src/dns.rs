//! DNS-based discovery.

use std::cmp::Reverse;
use std::net::{IpAddr, SocketAddr};

use hickory_resolver::Resolver as HickoryResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::rdata::SRV;
use nsqlookup_core::{Context, ResolveError};

use crate::resolver::Resolver;

/// Type alias for the Tokio-based hickory resolver.
type TokioResolver = HickoryResolver<TokioConnectionProvider>;

/// DNS-based nsqlookupd resolver.
///
/// Supports:
/// - SRV record lookup for names starting with `_`
///   (e.g. `_nsqlookupd._tcp.example.com`)
/// - A/AAAA record lookup with a fixed port for any other name
///
/// ## Example
///
/// ```rust,no_run
/// use nsqlookup_discovery::DnsResolver;
///
/// // Every A/AAAA record of the name, on port 4161
/// let resolver = DnsResolver::host("nsqlookupd.internal", 4161);
///
/// // SRV records carry their own ports
/// let srv = DnsResolver::srv("_nsqlookupd._tcp.example.com");
///
/// // Actual DNS resolution requires network access and is async:
/// // let addrs = resolver.resolve(&Context::new()).await?;
/// ```
pub struct DnsResolver {
    resolver: TokioResolver,
    name: String,
    port: Option<u16>,
}

impl DnsResolver {
    /// Resolve A/AAAA records of `name`, pairing each address with `port`.
    #[must_use]
    pub fn host(name: impl Into<String>, port: u16) -> Self {
        Self::with_config(name, Some(port), ResolverConfig::default(), ResolverOpts::default())
    }

    /// Resolve SRV records of `name`.
    #[must_use]
    pub fn srv(name: impl Into<String>) -> Self {
        Self::with_config(name, None, ResolverConfig::default(), ResolverOpts::default())
    }

    /// Create a resolver with custom DNS configuration.
    ///
    /// Names not starting with `_` need a `port`.
    #[must_use]
    pub fn with_config(
        name: impl Into<String>,
        port: Option<u16>,
        config: ResolverConfig,
        opts: ResolverOpts,
    ) -> Self {
        let resolver =
            HickoryResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        Self {
            resolver,
            name: name.into(),
            port,
        }
    }

    /// The name being resolved.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve SRV records for the configured name.
    ///
    /// A target that fails to resolve fails the whole call.
    async fn resolve_srv(&self) -> Result<Vec<String>, ResolveError> {
        let lookup = self
            .resolver
            .srv_lookup(self.name.as_str())
            .await
            .map_err(ResolveError::failed)?;

        let mut records: Vec<&SRV> = lookup.iter().collect();
        sort_srv(&mut records);

        let mut addrs = Vec::new();

        for record in records {
            let target = record.target().to_string();

            let ips = self
                .resolver
                .lookup_ip(target.as_str())
                .await
                .map_err(|e| {
                    tracing::debug!(
                        srv_target = %target,
                        error = %e,
                        "srv target lookup failed"
                    );
                    ResolveError::failed(e)
                })?;

            addrs.extend(socket_addrs(ips.iter(), record.port()));
        }

        self.non_empty(addrs)
    }

    /// Resolve A/AAAA records for the configured name.
    async fn resolve_host(&self, port: u16) -> Result<Vec<String>, ResolveError> {
        let lookup = self
            .resolver
            .lookup_ip(self.name.as_str())
            .await
            .map_err(ResolveError::failed)?;

        self.non_empty(socket_addrs(lookup.iter(), port))
    }

    fn non_empty(&self, addrs: Vec<String>) -> Result<Vec<String>, ResolveError> {
        if addrs.is_empty() {
            return Err(ResolveError::failed(format!(
                "no addresses found for {}",
                self.name
            )));
        }
        Ok(addrs)
    }
}

/// Order SRV records by priority ascending, then weight descending.
fn sort_srv(records: &mut [&SRV]) {
    records.sort_by_key(|r| (r.priority(), Reverse(r.weight())));
}

/// Pair every address with `port`; IPv6 addresses come out bracketed.
fn socket_addrs(ips: impl Iterator<Item = IpAddr>, port: u16) -> Vec<String> {
    ips.map(|ip| SocketAddr::new(ip, port).to_string()).collect()
}

impl Resolver for DnsResolver {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        let lookup = async {
            if self.name.starts_with('_') {
                return self.resolve_srv().await;
            }

            match self.port {
                Some(port) => self.resolve_host(port).await,
                None => Err(ResolveError::failed(format!(
                    "no port configured for {}",
                    self.name
                ))),
            }
        };

        let addrs = ctx.run(lookup).await?;
        tracing::debug!(name = %self.name, count = addrs.len(), "resolved name from dns");
        Ok(addrs)
    }
}
