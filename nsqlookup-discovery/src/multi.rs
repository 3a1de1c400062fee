//! Fan-out over several resolvers.

use futures::future::{join_all, try_join_all};
use nsqlookup_core::{Context, ResolveError};

use crate::resolver::{BoxResolver, Resolver};

/// How [`MultiResolver`] treats failing children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failure fails the whole call; partial results are dropped.
    #[default]
    FailFast,

    /// Failing children are skipped. The call only fails when every child
    /// failed, with the first failure in construction order.
    BestEffort,
}

/// Resolver that queries several resolvers and concatenates their answers.
///
/// Children run concurrently. Results keep construction order across
/// children and each child's own order within it. Duplicates are kept:
/// two sources naming the same address is information, not noise.
///
/// A cancelled context always yields [`ResolveError::Canceled`].
///
/// ## Example
///
/// ```rust
/// use nsqlookup_core::Context;
/// use nsqlookup_discovery::{MultiResolver, Resolver, Servers};
///
/// # async fn example() -> Result<(), nsqlookup_core::ResolveError> {
/// let resolver = MultiResolver::new()
///     .with(Servers::new(["A"]))
///     .with(Servers::new(["B", "C"]));
///
/// let addrs = resolver.resolve(&Context::new()).await?;
/// assert_eq!(addrs, ["A", "B", "C"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultiResolver {
    resolvers: Vec<BoxResolver>,
    policy: FailurePolicy,
}

impl MultiResolver {
    /// Create a new resolver with no children.
    ///
    /// With no children it resolves to an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child resolver.
    #[must_use]
    pub fn with(self, resolver: impl Resolver) -> Self {
        self.with_boxed(BoxResolver::new(resolver))
    }

    /// Add an already type-erased child resolver.
    #[must_use]
    pub fn with_boxed(mut self, resolver: BoxResolver) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the failure policy.
    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Get the number of child resolvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Check if there are no child resolvers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    async fn resolve_fail_fast(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        let results = try_join_all(self.resolvers.iter().map(|r| r.resolve(ctx))).await?;
        Ok(results.concat())
    }

    async fn resolve_best_effort(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        let results = join_all(self.resolvers.iter().map(|r| r.resolve(ctx))).await;

        let mut addrs = Vec::new();
        let mut first_error = None;
        let mut succeeded = 0usize;

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(list) => {
                    succeeded += 1;
                    addrs.extend(list);
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = ctx.request_id,
                        resolver = index,
                        error = %e,
                        "skipping failed resolver"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(addrs),
        }
    }
}

impl FromIterator<BoxResolver> for MultiResolver {
    fn from_iter<I: IntoIterator<Item = BoxResolver>>(iter: I) -> Self {
        Self {
            resolvers: iter.into_iter().collect(),
            policy: FailurePolicy::default(),
        }
    }
}

impl Resolver for MultiResolver {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        ctx.check()?;

        // Children share a scope that ends with this call, so work a child
        // detached is told to stop once a sibling has failed.
        let scope = ctx.child();
        let _scope_guard = scope.token().clone().drop_guard();

        let result = match self.policy {
            FailurePolicy::FailFast => ctx.run(self.resolve_fail_fast(&scope)).await,
            FailurePolicy::BestEffort => ctx.run(self.resolve_best_effort(&scope)).await,
        };

        // A child may report its own failure after the caller gave up.
        if ctx.is_cancelled() {
            return Err(ResolveError::Canceled);
        }

        let addrs = result?;
        tracing::debug!(
            request_id = ctx.request_id,
            resolvers = self.resolvers.len(),
            count = addrs.len(),
            "fan-out resolve complete"
        );
        Ok(addrs)
    }
}
