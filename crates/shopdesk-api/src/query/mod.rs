//! Query coordination: memoized reads keyed by resource and parameters,
//! deduplicated in-flight fetches, and mutation-driven invalidation.

mod client;
mod entry;
mod handle;

pub use client::QueryClient;
pub use entry::{Fetcher, QueryResult};
pub use handle::{QueryHandle, QueryOptions};

use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Wraps an async closure as a [`Fetcher`].
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = QueryResult> + Send + 'static,
{
    Arc::new(move || f().boxed())
}
