//! Request lifecycle logging plugin.
//!
//! Logs call lifecycle events using the `tracing` crate.

use async_trait::async_trait;
use courier_core::Response;
use tracing::{debug, info, warn};

use crate::context::Snapshot;
use crate::plugin::ObserverPlugin;

/// Observer plugin that logs lifecycle events.
///
/// # Example
///
/// ```ignore
/// let engine = ExecutionEngine::builder()
///     .plugin(PluginEntry::observer(Arc::new(RequestLogger::new())))
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger {
    level: LogLevel,
}

/// Log level for the logging plugin.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl RequestLogger {
    /// Create a new logging plugin with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging plugin that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }
}

/// Elapsed milliseconds since the call started, saturating.
fn elapsed_ms(snapshot: &Snapshot) -> u64 {
    u64::try_from(snapshot.start_time().elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ObserverPlugin for RequestLogger {
    async fn will_send(&self, snapshot: &Snapshot) {
        let method = snapshot.spec().method();
        let url = snapshot
            .built_request()
            .map_or_else(|| snapshot.spec().path().to_string(), |r| r.url().to_string());

        match self.level {
            LogLevel::Debug => {
                debug!(
                    id = %snapshot.id(),
                    %method,
                    %url,
                    headers = ?snapshot.built_request().map(courier_core::BuiltRequest::headers),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(id = %snapshot.id(), %method, %url, "sending request");
            }
        }
    }

    async fn did_receive(&self, snapshot: &Snapshot) {
        let elapsed_ms = elapsed_ms(snapshot);
        let Some(status) = snapshot.response().map(Response::status) else {
            return;
        };

        if snapshot.response().is_some_and(Response::is_success) {
            info!(
                id = %snapshot.id(),
                status,
                elapsed_ms,
                retries = snapshot.retry_count(),
                "request completed"
            );
        } else {
            warn!(
                id = %snapshot.id(),
                status,
                elapsed_ms,
                retries = snapshot.retry_count(),
                "request completed with HTTP error"
            );
        }
    }

    async fn did_fail(&self, snapshot: &Snapshot) {
        let elapsed_ms = elapsed_ms(snapshot);
        match snapshot.error() {
            Some(error) => warn!(
                id = %snapshot.id(),
                error = %error,
                elapsed_ms,
                retries = snapshot.retry_count(),
                "request failed"
            ),
            None => warn!(id = %snapshot.id(), elapsed_ms, "request failed"),
        }
    }
}
