//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Body, BuiltRequest, DeferredResponse, Error, Form, JsonDecoder, Method, Part, Payload,
    ProgressStream, ProgressUpdate, RequestSpec, RequestTask, ResponseDecoder, Response, Result,
    RetryDecision, ShortCircuitDecision, StatusCode, UploadSource,
};
