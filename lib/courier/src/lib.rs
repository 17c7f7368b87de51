//! Plugin-orchestrated request execution for Rust.
//!
//! Courier sits between application call sites and an HTTP transport
//! and lets cross-cutting concerns (auth injection, logging, caching,
//! retry, response shaping) be added as independent, composable
//! plugins without touching either side:
//!
//! - [`ExecutionEngine`] runs each call through prepare → build → adapt
//!   → snapshot → short-circuit → transport dispatch (with the retry
//!   protocol scoped to plain requests) → response transform → notify.
//! - Plugins implement any subset of the four capability traits in
//!   [`plugin`] and register through a [`PluginEntry`]; the
//!   [`PluginRunner`] composes them so the engine never special-cases
//!   one plugin vs many.
//! - [`Transport`] is the boundary to the network;
//!   [`HyperTransport`] is the production implementation over
//!   hyper-util with rustls.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier::prelude::*;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let engine = ExecutionEngine::builder()
//!     .base_url(url::Url::parse("https://api.example.com")?)
//!     .plugin(PluginEntry::transform(Arc::new(BearerAuth::new(token))))
//!     .plugin(PluginEntry::observer(Arc::new(RequestLogger::new())))
//!     .plugin(PluginEntry::retry(Arc::new(ExponentialBackoff::new(3))))
//!     .build();
//!
//! let user: User = engine
//!     .execute_decoded(RequestSpec::get("/users/42"), &JsonDecoder)
//!     .await?;
//! ```

mod builder;
mod config;
mod connector;
mod context;
mod engine;
mod hyper_transport;
pub mod plugin;
pub mod plugins;
pub mod prelude;
mod transport;

pub use builder::RequestBuilder;
pub use config::{TransportConfig, TransportConfigBuilder};
pub use context::{RequestContext, RequestId, Snapshot};
pub use engine::{ExecutionEngine, ExecutionEngineBuilder};
pub use hyper_transport::HyperTransport;
pub use plugin::{
    ObserverPlugin, PluginEntry, PluginRunner, RetryPlugin, ShortCircuitPlugin, TransformPlugin,
};
pub use transport::Transport;

// Re-export core types
pub use courier_core::{
    Body, BuiltRequest, DeferredResponse, Error, Form, JsonDecoder, Part, Payload, ProgressStream,
    ProgressUpdate, RequestSpec, RequestTask, Response, ResponseDecoder, Result, RetryDecision,
    ShortCircuitDecision, UploadSource,
};

// Re-export http types for methods, status codes, and headers
pub use courier_core::{Method, StatusCode, header};
