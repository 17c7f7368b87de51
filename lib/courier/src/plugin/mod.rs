//! Plugin capability protocols.
//!
//! A plugin is a unit implementing one or more of four independent
//! capability traits:
//!
//! - [`TransformPlugin`] - rewrite the spec, the built request, or the
//!   response; strictly sequential, each plugin sees the previous one's
//!   work product
//! - [`ObserverPlugin`] - lifecycle notifications over immutable
//!   snapshots; fanned out concurrently, failures never abort the call
//! - [`RetryPlugin`] - vote on re-attempting after a transport failure;
//!   first non-default decision wins
//! - [`ShortCircuitPlugin`] - answer a call without touching the
//!   transport; first non-miss decision wins
//!
//! Capabilities are declared at registration through [`PluginEntry`]
//! rather than discovered by downcasting: an entry names exactly the
//! capability lists its plugin joins, and a single instance may join
//! several by registering `Arc` clones of itself.
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
//! let engine = ExecutionEngine::builder()
//!     .transport(transport)
//!     .plugin(PluginEntry::transform(Arc::new(BearerAuth::new("token"))))
//!     .plugin(
//!         PluginEntry::short_circuit(Arc::clone(&cache) as _).and_observer(cache),
//!     )
//!     .build();
//! ```

mod runner;

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    BuiltRequest, Error, RequestSpec, Response, Result, RetryDecision, ShortCircuitDecision,
};

pub use runner::PluginRunner;

use crate::context::Snapshot;

/// Request/response mutation hooks.
///
/// Each hook defaults to the identity so a plugin can implement only the
/// stage it cares about.
#[async_trait]
pub trait TransformPlugin: Send + Sync {
    /// Rewrites the spec before the request is built.
    async fn prepare_request(&self, spec: RequestSpec) -> Result<RequestSpec> {
        Ok(spec)
    }

    /// Rewrites the built request before dispatch.
    async fn adapt_request(&self, request: BuiltRequest) -> Result<BuiltRequest> {
        Ok(request)
    }

    /// Rewrites the response before it is returned.
    async fn process_response(&self, response: Response) -> Result<Response> {
        Ok(response)
    }
}

/// Lifecycle notification hooks.
///
/// Observers are non-failing by contract: the hooks return nothing and
/// a panicking observer is caught and dropped by the runner.
#[async_trait]
pub trait ObserverPlugin: Send + Sync {
    /// The request is about to be dispatched (or short-circuited).
    async fn will_send(&self, snapshot: &Snapshot) {
        let _ = snapshot;
    }

    /// A processed response was recorded for the call.
    async fn did_receive(&self, snapshot: &Snapshot) {
        let _ = snapshot;
    }

    /// The call failed terminally.
    async fn did_fail(&self, snapshot: &Snapshot) {
        let _ = snapshot;
    }
}

/// Retry decision hooks, consulted after a transport failure.
#[async_trait]
pub trait RetryPlugin: Send + Sync {
    /// Votes on re-attempting the failed call.
    ///
    /// Polled in registration order; returning anything other than
    /// [`RetryDecision::DoNotRetry`] wins and stops polling.
    async fn should_retry(&self, snapshot: &Snapshot, error: &Error) -> RetryDecision;

    /// Hears the winning decision before the re-attempt.
    ///
    /// Broadcast to every retry plugin in order, not just the author of
    /// the decision, so secondary plugins can keep books on it.
    async fn will_retry(&self, snapshot: &Snapshot, error: &Error, decision: &RetryDecision) {
        let _ = (snapshot, error, decision);
    }
}

/// Short-circuit hook, consulted before transport dispatch.
#[async_trait]
pub trait ShortCircuitPlugin: Send + Sync {
    /// Offers a synthetic outcome for the call.
    ///
    /// Polled in registration order; the first non-miss decision wins
    /// and the transport is skipped entirely.
    async fn evaluate(&self, snapshot: &Snapshot) -> ShortCircuitDecision;
}

/// A plugin registration: one list position, any subset of capabilities.
///
/// The runner partitions entries into four per-capability lists,
/// preserving relative registration order within each.
#[derive(Clone, Default)]
pub struct PluginEntry {
    pub(crate) transform: Option<Arc<dyn TransformPlugin>>,
    pub(crate) observer: Option<Arc<dyn ObserverPlugin>>,
    pub(crate) retry: Option<Arc<dyn RetryPlugin>>,
    pub(crate) short_circuit: Option<Arc<dyn ShortCircuitPlugin>>,
}

impl PluginEntry {
    /// Registers a transform plugin.
    #[must_use]
    pub fn transform(plugin: Arc<dyn TransformPlugin>) -> Self {
        Self::default().and_transform(plugin)
    }

    /// Registers an observer plugin.
    #[must_use]
    pub fn observer(plugin: Arc<dyn ObserverPlugin>) -> Self {
        Self::default().and_observer(plugin)
    }

    /// Registers a retry plugin.
    #[must_use]
    pub fn retry(plugin: Arc<dyn RetryPlugin>) -> Self {
        Self::default().and_retry(plugin)
    }

    /// Registers a short-circuit plugin.
    #[must_use]
    pub fn short_circuit(plugin: Arc<dyn ShortCircuitPlugin>) -> Self {
        Self::default().and_short_circuit(plugin)
    }

    /// Adds the transform capability to this entry.
    #[must_use]
    pub fn and_transform(mut self, plugin: Arc<dyn TransformPlugin>) -> Self {
        self.transform = Some(plugin);
        self
    }

    /// Adds the observer capability to this entry.
    #[must_use]
    pub fn and_observer(mut self, plugin: Arc<dyn ObserverPlugin>) -> Self {
        self.observer = Some(plugin);
        self
    }

    /// Adds the retry capability to this entry.
    #[must_use]
    pub fn and_retry(mut self, plugin: Arc<dyn RetryPlugin>) -> Self {
        self.retry = Some(plugin);
        self
    }

    /// Adds the short-circuit capability to this entry.
    #[must_use]
    pub fn and_short_circuit(mut self, plugin: Arc<dyn ShortCircuitPlugin>) -> Self {
        self.short_circuit = Some(plugin);
        self
    }
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("transform", &self.transform.is_some())
            .field("observer", &self.observer.is_some())
            .field("retry", &self.retry.is_some())
            .field("short_circuit", &self.short_circuit.is_some())
            .finish()
    }
}
