//! Error types for address resolution.

use std::error::Error as StdError;
use std::sync::Arc;

/// Boxed error accepted as the cause of a failed resolve.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error returned by every resolver.
///
/// Callers can tell "I gave up" ([`Canceled`](Self::Canceled)) apart from
/// "the upstream is broken" ([`ResolveFailed`](Self::ResolveFailed)).
/// Composite resolvers surface their children's errors unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// The context was cancelled or its deadline passed.
    #[error("resolve cancelled")]
    Canceled,

    /// An upstream dependency (transport, registry, decoder) failed.
    #[error("resolve failed: {source}")]
    ResolveFailed {
        /// Underlying cause.
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
}

impl ResolveError {
    /// Create a resolve failure from any error or message.
    #[must_use]
    pub fn failed(cause: impl Into<BoxError>) -> Self {
        Self::ResolveFailed {
            source: Arc::from(cause.into()),
        }
    }

    /// Check if this error comes from cancellation.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if this error is an upstream failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::ResolveFailed { .. })
    }
}
