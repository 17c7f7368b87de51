//! Error types for courier.
//!
//! The error enum is deliberately flat and cloneable: the execution
//! engine records the last error in the per-request context while the
//! original value is still propagated to the caller, so wrapped sources
//! are flattened to strings at construction.

use derive_more::{Display, Error, From};

/// Main error type for courier operations.
///
/// Errors fall into three classes with different pipeline behavior:
/// build errors are terminal and surface before any transport dispatch,
/// transport errors are the only class routed through the retry chain,
/// and decode errors surface after a response was already obtained.
/// Use [`Error::is_build`], [`Error::is_transport`], and
/// [`Error::is_decode`] to classify.
#[derive(Debug, Clone, Display, Error, From)]
pub enum Error {
    /// Request could not be built (invalid path, missing base URL).
    #[display("request build failed: {_0}")]
    #[from(skip)]
    Build(#[error(not(source))] String),

    /// Request body could not be encoded.
    #[display("body encoding failed: {_0}")]
    #[from(skip)]
    Encode(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The transport did not produce a response in time.
    #[display("request timeout")]
    Timeout,

    /// The transfer was cancelled before a response was produced.
    #[display("transfer cancelled")]
    Cancelled,

    /// I/O failure while reading an upload source or response body.
    #[display("I/O error: {_0}")]
    #[from(skip)]
    Io(#[error(not(source))] String),

    /// Response body failed to decode with path context.
    #[display("response decoding failed at '{path}': {message}")]
    #[from(skip)]
    Decode {
        /// Path to the field that failed (e.g. `user.address.city`).
        path: String,
        /// Decoder error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a build error.
    #[must_use]
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Create a body encoding error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a decode error with path context.
    #[must_use]
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error arose while building the request.
    ///
    /// Build errors are never retried.
    #[must_use]
    pub const fn is_build(&self) -> bool {
        matches!(self, Self::Build(_) | Self::Encode(_) | Self::InvalidUrl(_))
    }

    /// Returns `true` if this error came from the transport.
    ///
    /// Transport errors are the only class subject to the retry protocol.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Tls(_) | Self::Timeout | Self::Cancelled | Self::Io(_)
        )
    }

    /// Returns `true` if this is a response decoding error.
    ///
    /// Decode errors surface only after a response was obtained and never
    /// trigger a retry.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the transfer was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
