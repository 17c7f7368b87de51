//! Decision types for the retry and short-circuit protocols.

use std::time::Duration;

use crate::{Error, Response};

/// Outcome of polling a retry plugin after a transport failure.
///
/// The retry chain is first-match-wins: the first plugin returning a
/// value other than [`RetryDecision::DoNotRetry`] decides for the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryDecision {
    /// Let the failure stand.
    #[default]
    DoNotRetry,
    /// Re-attempt immediately.
    Retry,
    /// Re-attempt after the given delay.
    RetryAfter(Duration),
}

impl RetryDecision {
    /// Returns `true` for any decision other than [`Self::DoNotRetry`].
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        !matches!(self, Self::DoNotRetry)
    }

    /// Delay before the next attempt, if the decision carries one.
    #[must_use]
    pub const fn delay(&self) -> Option<Duration> {
        match self {
            Self::RetryAfter(delay) => Some(*delay),
            Self::DoNotRetry | Self::Retry => None,
        }
    }
}

/// Outcome of polling a short-circuit plugin before transport dispatch.
///
/// Polled in registration order; the first non-miss decision wins and
/// skips the transport entirely.
#[derive(Debug, Clone, Default)]
pub enum ShortCircuitDecision {
    /// No synthetic result; proceed to the transport.
    #[default]
    Miss,
    /// Answer the call with a synthetic response.
    HitResult {
        /// The synthetic response.
        response: Response,
        /// Optional tag identifying the deciding plugin (for logs).
        source: Option<String>,
    },
    /// Fail the call with a synthetic error.
    HitError {
        /// The synthetic error.
        error: Error,
        /// Optional tag identifying the deciding plugin (for logs).
        source: Option<String>,
    },
}

impl ShortCircuitDecision {
    /// Convenience constructor for a result hit.
    #[must_use]
    pub fn hit_result(response: Response) -> Self {
        Self::HitResult {
            response,
            source: None,
        }
    }

    /// Convenience constructor for a tagged result hit.
    #[must_use]
    pub fn hit_result_from(response: Response, source: impl Into<String>) -> Self {
        Self::HitResult {
            response,
            source: Some(source.into()),
        }
    }

    /// Convenience constructor for an error hit.
    #[must_use]
    pub fn hit_error(error: Error) -> Self {
        Self::HitError {
            error,
            source: None,
        }
    }

    /// Convenience constructor for a tagged error hit.
    #[must_use]
    pub fn hit_error_from(error: Error, source: impl Into<String>) -> Self {
        Self::HitError {
            error,
            source: Some(source.into()),
        }
    }

    /// Returns `true` if this is a miss.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}
