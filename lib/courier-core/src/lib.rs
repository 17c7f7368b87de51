//! Core types for the courier request-execution pipeline.
//!
//! This crate provides the value types shared by the engine and its
//! plugins:
//! - [`RequestSpec`] and [`Payload`] - the caller's description of a call
//! - [`BuiltRequest`] - the resolved, transport-ready request
//! - [`Response`] - buffered HTTP response
//! - [`Error`] and [`Result`] - error handling
//! - [`RetryDecision`] and [`ShortCircuitDecision`] - plugin decision protocols
//! - [`ProgressUpdate`], [`ProgressStream`] - coalescing progress reporting
//! - [`RequestTask`] and [`DeferredResponse`] - deferred response computations
//! - [`ResponseDecoder`] / [`JsonDecoder`] - typed response decoding
//! - [`multipart`] - ordered multipart form bodies
//! - [`Method`] - HTTP methods (re-exported from the `http` crate)

pub mod decode;
mod decision;
pub mod encode;
mod error;
pub mod multipart;
pub mod prelude;
mod progress;
mod request;
mod response;
mod spec;
mod task;

pub use decode::{JsonDecoder, ResponseDecoder};
pub use decision::{RetryDecision, ShortCircuitDecision};
pub use error::{Error, Result};
pub use multipart::{Form, Part};
pub use progress::{ProgressSender, ProgressStream, ProgressUpdate, progress_channel};
pub use request::BuiltRequest;
pub use response::Response;
pub use spec::{Body, DEFAULT_TIMEOUT, Payload, RequestSpec, UploadSource};
pub use task::{DeferredResponse, RequestTask};

// Re-export http crate types for methods, status codes, and headers
pub use http::{Method, StatusCode, header};
