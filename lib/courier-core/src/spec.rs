//! Request specifications.
//!
//! A [`RequestSpec`] describes an intended call before any URL
//! resolution or body encoding happens. Specs are plain values: the
//! transform chain takes a spec and returns a (possibly different) spec,
//! so every builder-style method consumes and returns `self`.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, RequestSpec};
//!
//! let spec = RequestSpec::new(Method::GET, "/users")
//!     .query("page", "1")
//!     .header("Accept", "application/json");
//! assert_eq!(spec.path(), "/users");
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use crate::multipart::Form;
use crate::{Method, Result};

/// Default per-request timeout when none is specified.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable description of an intended call.
///
/// Produced by the caller, transformed by plugins, and finally resolved
/// into a [`crate::BuiltRequest`] by the request builder.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    path: String,
    method: Method,
    payload: Payload,
    base_url: Option<url::Url>,
    headers: HashMap<String, String>,
    timeout: Duration,
}

impl RequestSpec {
    /// Creates a new spec for the given method and path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            payload: Payload::default(),
            base_url: None,
            headers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Shorthand for a GET spec.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST spec.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a PUT spec.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a DELETE spec.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Request path, resolved against the base URL at build time.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Query items and body.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Per-spec base URL override, if any.
    #[must_use]
    pub const fn base_url(&self) -> Option<&url::Url> {
        self.base_url.as_ref()
    }

    /// Header overrides applied at build time.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replaces the payload.
    #[must_use]
    pub fn payload_with(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Appends a query item.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.query.push((name.into(), value.into()));
        self
    }

    /// Appends query items from a serializable struct.
    ///
    /// Repeated parameters (`Vec<T>` fields) are supported.
    ///
    /// # Errors
    ///
    /// Returns an error if query serialization fails.
    pub fn query_struct<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let pairs = crate::encode::to_query_pairs(value)?;
        self.payload.query.extend(pairs);
        Ok(self)
    }

    /// Sets a header override.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Overrides the base URL for this spec only.
    #[must_use]
    pub fn base_url_override(mut self, base_url: url::Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn timeout_after(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a JSON body.
    ///
    /// The value is converted eagerly so transform plugins can inspect
    /// and rewrite it as a [`serde_json::Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| crate::Error::encode(e.to_string()))?;
        self.payload.body = Body::Json(value);
        Ok(self)
    }

    /// Sets a form-urlencoded body from key/value pairs.
    #[must_use]
    pub fn form(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.payload.body = Body::Form(pairs.into_iter().collect());
        self
    }

    /// Sets a raw bytes body.
    #[must_use]
    pub fn bytes(mut self, data: impl Into<Bytes>) -> Self {
        self.payload.body = Body::Raw(data.into());
        self
    }

    /// Sets an upload body.
    ///
    /// Upload bodies are handed to the transport unencoded and are
    /// exempt from the retry protocol.
    #[must_use]
    pub fn upload(mut self, source: UploadSource) -> Self {
        self.payload.body = Body::Upload(source);
        self
    }
}

/// Query items plus a body variant.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    /// Query items, appended to the resolved URL in order.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: Body,
}

impl Payload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the body is an upload.
    #[must_use]
    pub const fn is_upload(&self) -> bool {
        matches!(self.body, Body::Upload(_))
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// JSON body, encoded by the builder.
    Json(serde_json::Value),
    /// Form-urlencoded body from ordered key/value pairs.
    Form(Vec<(String, String)>),
    /// Raw bytes body.
    Raw(Bytes),
    /// Upload body, encoded by the transport.
    Upload(UploadSource),
}

/// Source of bytes for an upload request.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// In-memory bytes.
    Bytes(Bytes),
    /// File on disk, read by the transport.
    File(PathBuf),
    /// Ordered multipart form parts.
    Multipart(Form),
}

impl UploadSource {
    /// Total upload size in bytes, when knowable without I/O.
    #[must_use]
    pub fn known_len(&self) -> Option<u64> {
        match self {
            Self::Bytes(data) => Some(data.len() as u64),
            Self::File(_) => None,
            Self::Multipart(form) => Some(form.encoded_len()),
        }
    }
}
