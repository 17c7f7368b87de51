//! Bundled plugins for the courier execution pipeline.
//!
//! Each plugin implements one or more of the capability traits in
//! [`crate::plugin`] and is registered through a
//! [`crate::PluginEntry`]:
//!
//! - [`BearerAuth`] - adds `Authorization: Bearer <token>` (Transform)
//! - [`BasicAuth`] - adds `Authorization: Basic <base64>` (Transform)
//! - [`RequestLogger`] - logs lifecycle events using `tracing` (Observer)
//! - [`RequestMetrics`] - records request metrics (Observer)
//! - [`ExponentialBackoff`] - retries transient transport failures with
//!   growing delays (Retry)
//! - [`MemoryCache`] - TTL'd response cache answering repeat GETs
//!   without transport dispatch (ShortCircuit + Observer)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
//! let engine = ExecutionEngine::builder()
//!     .base_url(base)
//!     .plugin(PluginEntry::transform(Arc::new(BearerAuth::new(token))))
//!     .plugin(PluginEntry::observer(Arc::new(RequestLogger::new())))
//!     .plugin(PluginEntry::retry(Arc::new(ExponentialBackoff::new(3))))
//!     .plugin(cache.entry())
//!     .build();
//! ```

mod backoff;
mod basic_auth;
mod bearer_auth;
mod cache;
mod logging;
mod metrics;

pub use backoff::ExponentialBackoff;
pub use basic_auth::BasicAuth;
pub use bearer_auth::BearerAuth;
pub use cache::{CACHE_SOURCE, MemoryCache};
pub use logging::{LogLevel, RequestLogger};
pub use metrics::RequestMetrics;
