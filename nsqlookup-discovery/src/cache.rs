//! Time-bounded caching decorator.

use std::time::Duration;

use async_lock::Mutex;
use nsqlookup_core::{Context, ResolveError};
use tokio::time::Instant;

use crate::resolver::Resolver;

/// Caching wrapper around a resolver.
///
/// A successful answer is reused for `ttl`; within that window the wrapped
/// resolver is not called. Failures are never cached. The entry lock is held
/// across the upstream call, so concurrent callers hitting a cold or expired
/// cache share a single upstream resolve.
///
/// A cancelled context always fails with [`ResolveError::Canceled`], even
/// when a fresh entry is available.
///
/// ## Example
///
/// ```rust
/// use nsqlookup_core::Context;
/// use nsqlookup_discovery::{CachedResolver, Resolver, Servers};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), nsqlookup_core::ResolveError> {
/// let resolver = CachedResolver::new(Servers::new(["10.0.0.1:4161"]), Duration::from_secs(30));
/// let addrs = resolver.resolve(&Context::new()).await?;
/// assert_eq!(addrs, ["10.0.0.1:4161"]);
/// # Ok(())
/// # }
/// ```
pub struct CachedResolver<R> {
    inner: R,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    addrs: Vec<String>,
    fetched: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched.elapsed() < ttl
    }
}

impl<R: Resolver> CachedResolver<R> {
    /// Create a new caching resolver.
    ///
    /// A zero `ttl` disables caching: every call goes upstream.
    #[must_use]
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The freshness duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The wrapped resolver.
    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Drop the cached entry so the next call goes upstream.
    pub async fn invalidate(&self) {
        self.entry.lock().await.take();
    }
}

impl<R: Resolver> Resolver for CachedResolver<R> {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        ctx.check()?;

        let mut entry = ctx
            .run(async { Ok::<_, ResolveError>(self.entry.lock().await) })
            .await?;

        if let Some(cached) = &*entry {
            if cached.is_fresh(self.ttl) {
                tracing::debug!(
                    request_id = ctx.request_id,
                    count = cached.addrs.len(),
                    "resolver cache hit"
                );
                return Ok(cached.addrs.clone());
            }
        }

        tracing::debug!(request_id = ctx.request_id, "resolver cache miss");

        // Stale data must not outlive a failed refresh.
        entry.take();

        let addrs = ctx.run(self.inner.resolve(ctx)).await?;

        // A cancellation racing the upstream answer still wins.
        ctx.check()?;

        *entry = Some(CacheEntry {
            addrs: addrs.clone(),
            fetched: Instant::now(),
        });

        Ok(addrs)
    }
}

impl<R> std::fmt::Debug for CachedResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResolver")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
