//! Deferred request tasks.
//!
//! A [`RequestTask`] pairs an optional progress stream with a deferred,
//! at-most-once response computation. The transport returns one for
//! uploads and downloads; the execution engine wraps it (or builds its
//! own) so callers can observe progress while the response is pending.

use std::future::Future;
use std::pin::Pin;

use crate::progress::ProgressStream;
use crate::{Response, Result};

type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// A deferred response computation.
///
/// Resolution consumes the value, so the computation runs at most once
/// by construction. The inner future is lazy: no work happens until
/// [`DeferredResponse::resolve`] is awaited.
pub struct DeferredResponse {
    future: ResponseFuture,
}

impl DeferredResponse {
    /// Wraps a future as a deferred response.
    #[must_use]
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Response>> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
        }
    }

    /// Runs the computation and produces the response.
    pub async fn resolve(self) -> Result<Response> {
        self.future.await
    }
}

impl std::fmt::Debug for DeferredResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredResponse").finish_non_exhaustive()
    }
}

/// A started request: optional progress plus the deferred response.
#[derive(Debug)]
pub struct RequestTask {
    progress: Option<ProgressStream>,
    response: DeferredResponse,
}

impl RequestTask {
    /// Creates a task from its parts.
    #[must_use]
    pub fn new(progress: Option<ProgressStream>, response: DeferredResponse) -> Self {
        Self { progress, response }
    }

    /// A progress stream for this task, if the operation reports one.
    ///
    /// The stream is multi-consumer; each call returns an independent
    /// clone and the task keeps its own.
    #[must_use]
    pub fn progress(&self) -> Option<ProgressStream> {
        self.progress.clone()
    }

    /// Resolves the response.
    ///
    /// The task's own progress handle stays alive until the response
    /// completes, so resolving without consuming progress does not
    /// cancel the transfer.
    pub async fn resolve(self) -> Result<Response> {
        let Self { progress, response } = self;
        let result = response.resolve().await;
        drop(progress);
        result
    }

    /// Splits the task into its parts.
    ///
    /// Dropping the returned progress stream (and any clones) before the
    /// response resolves cancels the underlying transfer.
    #[must_use]
    pub fn into_parts(self) -> (Option<ProgressStream>, DeferredResponse) {
        (self.progress, self.response)
    }
}
