//! Resolver trait and common types.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use nsqlookup_core::{Context, ResolveError};

use crate::cache::CachedResolver;

/// Trait for nsqlookupd address resolvers.
///
/// A resolver answers one question: which `host:port` addresses are live
/// right now. Every call receives a [`Context`]; implementations must fail
/// with [`ResolveError::Canceled`] once it is cancelled, including when the
/// answer is already at hand.
///
/// ## Example
///
/// ```rust
/// use nsqlookup_core::Context;
/// use nsqlookup_discovery::{Resolver, Servers};
///
/// # async fn example() -> Result<(), nsqlookup_core::ResolveError> {
/// let servers = Servers::new(["10.0.0.1:4161", "10.0.0.2:4161"]);
/// let addrs = servers.resolve(&Context::new()).await?;
/// assert_eq!(addrs, ["10.0.0.1:4161", "10.0.0.2:4161"]);
/// # Ok(())
/// # }
/// ```
pub trait Resolver: Send + Sync + 'static {
    /// Resolve the current list of addresses.
    fn resolve(
        &self,
        ctx: &Context,
    ) -> impl Future<Output = Result<Vec<String>, ResolveError>> + Send;
}

impl<R: Resolver> Resolver for Arc<R> {
    fn resolve(
        &self,
        ctx: &Context,
    ) -> impl Future<Output = Result<Vec<String>, ResolveError>> + Send {
        (**self).resolve(ctx)
    }
}

/// Combinators available on every resolver.
pub trait ResolverExt: Resolver + Sized {
    /// Erase the concrete type so resolvers can be stored together.
    fn boxed(self) -> BoxResolver {
        BoxResolver::new(self)
    }

    /// Memoize results for `ttl`.
    fn cached(self, ttl: Duration) -> CachedResolver<Self> {
        CachedResolver::new(self, ttl)
    }
}

impl<R: Resolver> ResolverExt for R {}

/// A fixed list of addresses.
///
/// Useful when the lookup tier is known at configuration time, or as a
/// stand-in during tests. An empty list resolves to no addresses rather
/// than to an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Servers(Vec<String>);

impl Servers {
    /// Create a server list from any sequence of addresses.
    #[must_use]
    pub fn new<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addrs.into_iter().collect()
    }

    /// The configured addresses.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of configured addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no addresses are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Servers {
    fn from(addrs: Vec<String>) -> Self {
        Self(addrs)
    }
}

impl<S: Into<String>> FromIterator<S> for Servers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Resolver for Servers {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        ctx.check()?;
        Ok(self.0.clone())
    }
}

/// Adapter turning an async closure into a [`Resolver`].
///
/// Created with [`resolver_fn`].
#[derive(Clone)]
pub struct ResolverFn<F> {
    f: F,
}

/// Wrap a closure as a resolver.
///
/// The closure receives a clone of the caller's context and is responsible
/// for honoring it.
///
/// ```rust
/// use nsqlookup_core::{Context, ResolveError};
/// use nsqlookup_discovery::{Resolver, resolver_fn};
///
/// # async fn example() -> Result<(), nsqlookup_core::ResolveError> {
/// let resolver = resolver_fn(|ctx: Context| async move {
///     ctx.check()?;
///     Ok::<_, ResolveError>(vec!["127.0.0.1:4161".to_string()])
/// });
///
/// let addrs = resolver.resolve(&Context::new()).await?;
/// assert_eq!(addrs, ["127.0.0.1:4161"]);
/// # Ok(())
/// # }
/// ```
pub fn resolver_fn<F, Fut>(f: F) -> ResolverFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, ResolveError>> + Send,
{
    ResolverFn { f }
}

impl<F, Fut> Resolver for ResolverFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, ResolveError>> + Send,
{
    fn resolve(
        &self,
        ctx: &Context,
    ) -> impl Future<Output = Result<Vec<String>, ResolveError>> + Send {
        (self.f)(ctx.clone())
    }
}

impl<F> std::fmt::Debug for ResolverFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverFn").finish_non_exhaustive()
    }
}

/// Object-safe twin of [`Resolver`].
trait DynResolver: Send + Sync + 'static {
    fn resolve_boxed<'a>(&'a self, ctx: &'a Context)
        -> BoxFuture<'a, Result<Vec<String>, ResolveError>>;
}

impl<R: Resolver> DynResolver for R {
    fn resolve_boxed<'a>(
        &'a self,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Vec<String>, ResolveError>> {
        Box::pin(self.resolve(ctx))
    }
}

/// A type-erased, cheaply cloneable resolver.
#[derive(Clone)]
pub struct BoxResolver {
    inner: Arc<dyn DynResolver>,
}

impl BoxResolver {
    /// Erase the type of `resolver`.
    #[must_use]
    pub fn new(resolver: impl Resolver) -> Self {
        Self {
            inner: Arc::new(resolver),
        }
    }
}

impl std::fmt::Debug for BoxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxResolver").finish_non_exhaustive()
    }
}

impl Resolver for BoxResolver {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        self.inner.resolve_boxed(ctx).await
    }
}
