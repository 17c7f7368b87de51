//! Per-request execution context.
//!
//! One [`RequestContext`] exists per logical call, owned by the engine
//! for the call's lifetime and discarded afterwards. Only the engine
//! writes to it (the mutators are crate-private); plugins observe state
//! exclusively through immutable [`Snapshot`] values, so concurrently
//! running observer tasks never race the engine's updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use courier_core::{BuiltRequest, Error, RequestSpec, Response};

/// Process-unique identity of a logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Mutable, concurrency-safe state for one logical call.
#[derive(Debug)]
pub struct RequestContext {
    id: RequestId,
    spec: Arc<RequestSpec>,
    start_time: Instant,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    built_request: Option<Arc<BuiltRequest>>,
    response: Option<Arc<Response>>,
    error: Option<Error>,
    retry_count: u32,
}

impl RequestContext {
    /// Creates a context for the given (already prepared) spec.
    #[must_use]
    pub fn new(spec: RequestSpec) -> Self {
        Self {
            id: RequestId::next(),
            spec: Arc::new(spec),
            start_time: Instant::now(),
            state: Mutex::new(State::default()),
        }
    }

    /// Call identity.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The originating (prepared) spec.
    #[must_use]
    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// When handling of this call began.
    #[must_use]
    pub const fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Records the adapted built request. Set once per call.
    pub(crate) fn record_built_request(&self, request: Arc<BuiltRequest>) {
        self.lock().built_request = Some(request);
    }

    /// Records the latest processed response.
    pub(crate) fn record_response(&self, response: Arc<Response>) {
        self.lock().response = Some(response);
    }

    /// Records the latest error.
    pub(crate) fn record_error(&self, error: &Error) {
        self.lock().error = Some(error.clone());
    }

    /// Bumps the retry counter. Called once per honored retry decision;
    /// the counter never resets within a call.
    pub(crate) fn increment_retry_count(&self) {
        self.lock().retry_count += 1;
    }

    /// Atomically copies every field into an immutable [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            id: self.id,
            spec: Arc::clone(&self.spec),
            start_time: self.start_time,
            built_request: state.built_request.clone(),
            response: state.response.clone(),
            error: state.error.clone(),
            retry_count: state.retry_count,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Mutations are plain field stores; a poisoned lock can only
        // mean a panic mid-store, where the previous value is intact.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Immutable, self-consistent copy of a context's fields at one moment.
///
/// Cheap to clone; shared substructures are behind `Arc` and carry no
/// interior mutability, so plugins cannot leak writes across calls.
#[derive(Debug, Clone)]
pub struct Snapshot {
    id: RequestId,
    spec: Arc<RequestSpec>,
    start_time: Instant,
    built_request: Option<Arc<BuiltRequest>>,
    response: Option<Arc<Response>>,
    error: Option<Error>,
    retry_count: u32,
}

impl Snapshot {
    /// Call identity.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The originating spec.
    #[must_use]
    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// When handling of the call began.
    #[must_use]
    pub const fn start_time(&self) -> Instant {
        self.start_time
    }

    /// The adapted built request, once recorded.
    #[must_use]
    pub fn built_request(&self) -> Option<&BuiltRequest> {
        self.built_request.as_deref()
    }

    /// The last processed response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// The last recorded error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Number of retry decisions honored so far.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }
}
