//! # nsqlookup-core
//!
//! Core types shared by the nsqlookup resolvers.
//!
//! This crate provides:
//! - Resolve context (`Context`) carrying cancellation and deadlines
//! - Error types (`ResolveError`)

mod context;
mod error;

pub use context::Context;
pub use error::{BoxError, ResolveError};

pub use tokio_util::sync::CancellationToken;
