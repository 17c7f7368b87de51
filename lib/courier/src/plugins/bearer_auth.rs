//! Bearer token authentication plugin.
//!
//! Adds an `Authorization: Bearer <token>` header to every built
//! request that does not already carry one.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{BuiltRequest, Result};

use crate::plugin::TransformPlugin;

/// Transform plugin injecting a bearer token during `adapt_request`.
///
/// # Example
///
/// ```ignore
/// let engine = ExecutionEngine::builder()
///     .plugin(PluginEntry::transform(Arc::new(BearerAuth::new("my-secret-token"))))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: Arc<str>,
}

impl BearerAuth {
    /// Create a new bearer auth plugin with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }
}

#[async_trait]
impl TransformPlugin for BearerAuth {
    async fn adapt_request(&self, mut request: BuiltRequest) -> Result<BuiltRequest> {
        request.set_header_if_absent("Authorization", format!("Bearer {}", self.token));
        Ok(request)
    }
}
