//! Basic authentication plugin.
//!
//! Adds an `Authorization: Basic <base64(user:pass)>` header to every
//! built request that does not already carry one.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use courier_core::{BuiltRequest, Result};

use crate::plugin::TransformPlugin;

/// Transform plugin injecting basic credentials during `adapt_request`.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    /// Base64-encoded "username:password".
    encoded_credentials: Arc<str>,
}

impl BasicAuth {
    /// Create a new basic auth plugin with the given username and password.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            encoded_credentials: Arc::from(encoded),
        }
    }
}

#[async_trait]
impl TransformPlugin for BasicAuth {
    async fn adapt_request(&self, mut request: BuiltRequest) -> Result<BuiltRequest> {
        request.set_header_if_absent(
            "Authorization",
            format!("Basic {}", self.encoded_credentials),
        );
        Ok(request)
    }
}
