//! The transport boundary.
//!
//! The engine hands a fully resolved [`BuiltRequest`] to a [`Transport`]
//! and only reasons about the outcome; connection handling, TLS, and
//! wire encoding live behind this trait. [`crate::HyperTransport`] is
//! the production implementation; tests substitute scripted ones.

use async_trait::async_trait;
use courier_core::{BuiltRequest, RequestTask, Response, Result, UploadSource};

/// Performs the actual network operation for a call.
///
/// `send` is the plain request path the engine may invoke repeatedly
/// under retry. `upload` and `download` start a transfer and return a
/// [`RequestTask`]: a progress stream plus a deferred response whose
/// resolution consumes it, so the response computation runs at most
/// once. Dropping every handle on a task's progress stream before the
/// response resolves must cancel the underlying transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and produces a response or fails.
    async fn send(&self, request: &BuiltRequest) -> Result<Response>;

    /// Starts an upload, encoding the source into the request body.
    async fn upload(&self, request: &BuiltRequest, source: UploadSource) -> Result<RequestTask>;

    /// Starts a download with byte-level progress.
    async fn download(&self, request: &BuiltRequest) -> Result<RequestTask>;
}
