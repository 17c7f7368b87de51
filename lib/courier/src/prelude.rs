//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::plugins::{
    BasicAuth, BearerAuth, ExponentialBackoff, MemoryCache, RequestLogger, RequestMetrics,
};
pub use crate::{
    Body, BuiltRequest, Error, ExecutionEngine, Form, HyperTransport, JsonDecoder, Method,
    ObserverPlugin, Part, Payload, PluginEntry, ProgressStream, ProgressUpdate, RequestSpec,
    RequestTask, Response, ResponseDecoder, Result, RetryDecision, RetryPlugin,
    ShortCircuitDecision, ShortCircuitPlugin, Snapshot, StatusCode, Transport, TransformPlugin,
    TransportConfig, UploadSource, header,
};
pub use serde::{Deserialize, Serialize};
