//! Resolve context carrying cancellation and deadlines.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;

/// Global request ID counter for unique IDs.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Context threaded through every resolve call.
///
/// A `Context` is cheap to clone; clones share the same cancellation
/// token, so cancelling any clone cancels them all. A context counts as
/// cancelled once its token is cancelled or its deadline has passed.
///
/// ## Example
///
/// ```rust
/// use nsqlookup_core::Context;
/// use std::time::Duration;
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(!ctx.is_cancelled());
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    /// Unique identifier for this resolve request.
    pub request_id: u64,

    /// Absolute deadline for this request.
    /// If `None`, the request only ends through cancellation.
    pub deadline: Option<Instant>,

    token: CancellationToken,
}

impl Context {
    /// Create a new context with a fresh cancellation token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a context driven by an existing cancellation token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            request_id: next_request_id(),
            deadline: None,
            token,
        }
    }

    /// Create a context with a timeout from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().timeout(timeout)
    }

    /// Set the deadline for this context.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a timeout from now.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The cancellation token backing this context.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Check if the token was cancelled or the deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.is_expired()
    }

    /// Fail with [`ResolveError::Canceled`] if this context is already done.
    pub fn check(&self) -> Result<(), ResolveError> {
        if self.is_cancelled() {
            Err(ResolveError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Wait until the token is cancelled or the deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Drive `fut` to completion unless this context is cancelled first.
    ///
    /// Cancellation wins ties: if the context is done when `fut` becomes
    /// ready, the result is discarded and `Canceled` is returned.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ResolveError>
    where
        F: Future<Output = Result<T, ResolveError>>,
    {
        self.check()?;

        tokio::select! {
            biased;
            () = self.cancelled() => Err(ResolveError::Canceled),
            result = fut => result,
        }
    }

    /// Create a child context for nested calls.
    ///
    /// The child inherits the deadline and is cancelled with its parent;
    /// cancelling the child leaves the parent untouched.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            request_id: next_request_id(),
            deadline: self.deadline,
            token: self.token.child_token(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self::with_token(token)
    }
}
