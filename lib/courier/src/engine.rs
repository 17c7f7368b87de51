//! The per-call execution pipeline.
//!
//! [`ExecutionEngine`] orchestrates the full lifecycle of a logical
//! call: prepare the spec through the transform chain, build and adapt
//! the request, snapshot the fresh context, notify observers, consult
//! the short-circuit chain, and dispatch to the transport with the
//! retry protocol scoped to plain requests. Upload and download
//! dispatch is single-shot: their byte sources are not guaranteed
//! re-readable, so a failed transfer is never re-attempted.
//!
//! # Example
//!
//! ```ignore
//! let engine = ExecutionEngine::builder()
//!     .base_url(url::Url::parse("https://api.example.com")?)
//!     .plugin(PluginEntry::transform(Arc::new(BearerAuth::new(token))))
//!     .plugin(PluginEntry::retry(Arc::new(ExponentialBackoff::new(3))))
//!     .build();
//!
//! let user: User = engine
//!     .execute_decoded(RequestSpec::get("/users/42"), &JsonDecoder)
//!     .await?;
//! ```

use std::sync::Arc;

use courier_core::{
    Body, BuiltRequest, DeferredResponse, RequestSpec, RequestTask, Response, ResponseDecoder,
    Result, RetryDecision, ShortCircuitDecision, UploadSource,
};
use tracing::{debug, info, warn};

use crate::builder::RequestBuilder;
use crate::context::{RequestContext, Snapshot};
use crate::hyper_transport::HyperTransport;
use crate::plugin::{
    ObserverPlugin, PluginEntry, PluginRunner, RetryPlugin, ShortCircuitPlugin, TransformPlugin,
};
use crate::transport::Transport;

/// Orchestrates request execution through the plugin pipeline.
///
/// Cheap to clone; clones share the transport, builder, and plugin
/// runner. Every entry point runs the same pipeline; concurrent calls
/// share nothing but those components, each owning its own
/// [`RequestContext`].
#[derive(Clone)]
pub struct ExecutionEngine {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    runner: PluginRunner,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("builder", &self.inner.builder)
            .finish_non_exhaustive()
    }
}

/// A prepared call, past the build/adapt stages with observers already
/// notified via `will_send`.
struct Pipeline {
    context: Arc<RequestContext>,
    request: Arc<BuiltRequest>,
    snapshot: Snapshot,
}

impl ExecutionEngine {
    /// Create an engine builder.
    #[must_use]
    pub fn builder() -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::default()
    }

    /// Executes the spec and returns the processed response.
    ///
    /// # Errors
    ///
    /// Returns build, transport, or transform errors per the pipeline's
    /// error taxonomy; only transport errors are routed through the
    /// retry chain first.
    pub async fn execute(&self, spec: RequestSpec) -> Result<Response> {
        let task = self.execute_task(spec).await?;
        task.resolve().await
    }

    /// Executes the spec and decodes the response body.
    ///
    /// # Errors
    ///
    /// In addition to [`ExecutionEngine::execute`] failures, returns a
    /// decode error when the body does not match `T`. Decode failures
    /// are terminal and never retried.
    pub async fn execute_decoded<T, D>(&self, spec: RequestSpec, decoder: &D) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        D: ResponseDecoder,
    {
        let pipeline = self.prepare(spec).await?;
        let context = Arc::clone(&pipeline.context);

        let task = match self.try_short_circuit(&pipeline).await {
            Some(task) => task,
            None => self.dispatch(pipeline).await?,
        };
        let response = task.resolve().await?;

        match decoder.decode(response.body()) {
            Ok(decoded) => Ok(decoded),
            Err(error) => {
                warn!(id = %context.id(), error = %error, "response decoding failed");
                context.record_error(&error);
                self.notify_did_fail(&context).await;
                Err(error)
            }
        }
    }

    /// Executes the spec as a task, exposing the progress stream
    /// alongside the deferred response.
    ///
    /// Plain requests carry no progress stream; upload specs report
    /// upload progress. The response computation resolves at most once.
    ///
    /// # Errors
    ///
    /// Returns build/prepare/adapt errors, or the upload-start failure
    /// for upload specs.
    pub async fn execute_task(&self, spec: RequestSpec) -> Result<RequestTask> {
        let pipeline = self.prepare(spec).await?;
        match self.try_short_circuit(&pipeline).await {
            Some(task) => Ok(task),
            None => self.dispatch(pipeline).await,
        }
    }

    /// Executes the spec as a download with byte-level progress.
    ///
    /// Downloads run the identical pipeline but are exempt from the
    /// retry protocol, like uploads.
    ///
    /// # Errors
    ///
    /// Returns build/prepare/adapt errors, or the download-start
    /// failure.
    pub async fn execute_download(&self, spec: RequestSpec) -> Result<RequestTask> {
        let pipeline = self.prepare(spec).await?;
        if let Some(task) = self.try_short_circuit(&pipeline).await {
            return Ok(task);
        }

        debug!(id = %pipeline.context.id(), url = %pipeline.request.url(), "dispatching download");
        match self.inner.transport.download(&pipeline.request).await {
            Ok(task) => Ok(self.wrap_single_shot(task, pipeline.context)),
            Err(error) => {
                pipeline.context.record_error(&error);
                self.notify_did_fail(&pipeline.context).await;
                Err(error)
            }
        }
    }

    /// Steps 1-4 of the pipeline: transform the spec, build, adapt,
    /// create the context, and notify `will_send` with the first
    /// snapshot.
    ///
    /// Failures here precede context creation and surface without
    /// observer notification.
    async fn prepare(&self, spec: RequestSpec) -> Result<Pipeline> {
        let prepared = self.inner.runner.prepare_request(spec).await?;
        let built = self.inner.builder.build(&prepared)?;
        let adapted = self.inner.runner.adapt_request(built).await?;

        let request = Arc::new(adapted);
        let context = Arc::new(RequestContext::new(prepared));
        context.record_built_request(Arc::clone(&request));

        let snapshot = context.snapshot();
        self.inner.runner.will_send(&snapshot).await;

        Ok(Pipeline {
            context,
            request,
            snapshot,
        })
    }

    /// Step 5: poll the short-circuit chain against the same snapshot
    /// `will_send` saw; a hit answers the call without touching the
    /// transport.
    async fn try_short_circuit(&self, pipeline: &Pipeline) -> Option<RequestTask> {
        match self.inner.runner.evaluate(&pipeline.snapshot).await {
            ShortCircuitDecision::Miss => None,
            ShortCircuitDecision::HitResult { response, source } => {
                info!(
                    id = %pipeline.context.id(),
                    source = source.as_deref().unwrap_or("unknown"),
                    "short-circuit hit"
                );
                let engine = self.clone();
                let context = Arc::clone(&pipeline.context);
                Some(RequestTask::new(
                    None,
                    DeferredResponse::new(async move {
                        let processed = engine.process_response(response, &context).await?;
                        engine.notify_did_receive(&context).await;
                        Ok(processed)
                    }),
                ))
            }
            ShortCircuitDecision::HitError { error, source } => {
                info!(
                    id = %pipeline.context.id(),
                    source = source.as_deref().unwrap_or("unknown"),
                    "short-circuit error"
                );
                let engine = self.clone();
                let context = Arc::clone(&pipeline.context);
                Some(RequestTask::new(
                    None,
                    DeferredResponse::new(async move {
                        context.record_error(&error);
                        engine.notify_did_fail(&context).await;
                        Err(error)
                    }),
                ))
            }
        }
    }

    /// Step 6: hand the call to the transport. Upload specs take the
    /// single-shot path; everything else enters the retry loop.
    async fn dispatch(&self, pipeline: Pipeline) -> Result<RequestTask> {
        let upload_source = match &pipeline.context.spec().payload().body {
            Body::Upload(source) => Some(source.clone()),
            _ => None,
        };

        match upload_source {
            Some(source) => self.dispatch_upload(pipeline, source).await,
            None => {
                debug!(id = %pipeline.context.id(), url = %pipeline.request.url(), "dispatching request");
                let engine = self.clone();
                let Pipeline {
                    context, request, ..
                } = pipeline;
                Ok(RequestTask::new(
                    None,
                    DeferredResponse::new(async move {
                        engine.perform_with_retry(&context, &request).await
                    }),
                ))
            }
        }
    }

    async fn dispatch_upload(
        &self,
        pipeline: Pipeline,
        source: UploadSource,
    ) -> Result<RequestTask> {
        debug!(id = %pipeline.context.id(), url = %pipeline.request.url(), "dispatching upload");
        match self.inner.transport.upload(&pipeline.request, source).await {
            Ok(task) => Ok(self.wrap_single_shot(task, pipeline.context)),
            Err(error) => {
                pipeline.context.record_error(&error);
                self.notify_did_fail(&pipeline.context).await;
                Err(error)
            }
        }
    }

    /// Step 7: the retry loop. The built request is reused verbatim
    /// between attempts; only the transport call is inside the loop.
    async fn perform_with_retry(
        &self,
        context: &RequestContext,
        request: &BuiltRequest,
    ) -> Result<Response> {
        loop {
            match self.inner.transport.send(request).await {
                Ok(response) => {
                    let processed = self.process_response(response, context).await?;
                    self.notify_did_receive(context).await;
                    return Ok(processed);
                }
                Err(error) => {
                    context.record_error(&error);
                    let snapshot = context.snapshot();
                    let decision = self.inner.runner.should_retry(&snapshot, &error).await;
                    match decision {
                        RetryDecision::DoNotRetry => {
                            warn!(id = %context.id(), error = %error, "request failed");
                            self.notify_did_fail(context).await;
                            return Err(error);
                        }
                        RetryDecision::Retry => {
                            debug!(
                                id = %context.id(),
                                attempt = snapshot.retry_count() + 1,
                                "retrying immediately"
                            );
                            self.inner.runner.will_retry(&snapshot, &error, &decision).await;
                            context.increment_retry_count();
                        }
                        RetryDecision::RetryAfter(delay) => {
                            debug!(
                                id = %context.id(),
                                attempt = snapshot.retry_count() + 1,
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                "retrying after delay"
                            );
                            self.inner.runner.will_retry(&snapshot, &error, &decision).await;
                            context.increment_retry_count();
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
    }

    /// Wraps a transport task so resolving it runs the response through
    /// the transform chain and the observer notifications; failures are
    /// terminal (no retry on this path).
    fn wrap_single_shot(&self, task: RequestTask, context: Arc<RequestContext>) -> RequestTask {
        let engine = self.clone();
        let (progress, deferred) = task.into_parts();
        RequestTask::new(
            progress,
            DeferredResponse::new(async move {
                match deferred.resolve().await {
                    Ok(response) => {
                        let processed = engine.process_response(response, &context).await?;
                        engine.notify_did_receive(&context).await;
                        Ok(processed)
                    }
                    Err(error) => {
                        context.record_error(&error);
                        engine.notify_did_fail(&context).await;
                        Err(error)
                    }
                }
            }),
        )
    }

    /// Runs the transform chain over the response and records the
    /// result. A transform failure after transport success is terminal:
    /// it is recorded, `did_fail` fires, and the error propagates
    /// without consulting the retry chain.
    async fn process_response(
        &self,
        response: Response,
        context: &RequestContext,
    ) -> Result<Response> {
        match self.inner.runner.process_response(response).await {
            Ok(processed) => {
                context.record_response(Arc::new(processed.clone()));
                Ok(processed)
            }
            Err(error) => {
                warn!(id = %context.id(), error = %error, "response transform failed");
                context.record_error(&error);
                self.notify_did_fail(context).await;
                Err(error)
            }
        }
    }

    async fn notify_did_receive(&self, context: &RequestContext) {
        let snapshot = context.snapshot();
        self.inner.runner.did_receive(&snapshot).await;
    }

    async fn notify_did_fail(&self, context: &RequestContext) {
        let snapshot = context.snapshot();
        self.inner.runner.did_fail(&snapshot).await;
    }
}

/// Builder for [`ExecutionEngine`].
///
/// The plugin list is flat and ordered; registration order is the
/// execution order for the transform chain and the polling order for
/// the retry and short-circuit chains.
#[derive(Default)]
pub struct ExecutionEngineBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<url::Url>,
    entries: Vec<PluginEntry>,
}

impl std::fmt::Debug for ExecutionEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngineBuilder")
            .field("base_url", &self.base_url)
            .field("plugin_count", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl ExecutionEngineBuilder {
    /// Set the transport. Defaults to [`HyperTransport`] with default
    /// configuration.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set an already-shared transport.
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the base URL relative paths resolve against.
    #[must_use]
    pub fn base_url(mut self, base_url: url::Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Register a plugin entry at the next list position.
    #[must_use]
    pub fn plugin(mut self, entry: PluginEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Register several plugin entries, preserving their order.
    #[must_use]
    pub fn plugins(mut self, entries: impl IntoIterator<Item = PluginEntry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Build the engine.
    #[must_use]
    pub fn build(self) -> ExecutionEngine {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HyperTransport::new()));
        ExecutionEngine {
            inner: Arc::new(Inner {
                transport,
                builder: RequestBuilder::new(self.base_url),
                runner: PluginRunner::new(self.entries),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_hyper_transport() {
        let engine = ExecutionEngine::builder().build();
        assert!(format!("{engine:?}").contains("ExecutionEngine"));
    }

    #[test]
    fn builder_debug_reports_plugin_count() {
        let builder = ExecutionEngine::builder().plugin(PluginEntry::default());
        assert!(format!("{builder:?}").contains("plugin_count: 1"));
    }
}
