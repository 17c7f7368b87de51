//! Resolved, transport-ready requests.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::Method;

/// A fully resolved request: final URL, method, headers, timeout, and
/// the encoded body.
///
/// Built exactly once per logical call from a (possibly plugin-mutated)
/// [`crate::RequestSpec`], then handed to the transform chain's
/// `adapt_request` hook before dispatch. Upload requests carry no
/// encoded body; the transport encodes their [`crate::UploadSource`].
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    timeout: Duration,
    body: Option<Bytes>,
}

impl BuiltRequest {
    /// Creates a built request.
    #[must_use]
    pub fn new(
        method: Method,
        url: url::Url,
        headers: HashMap<String, String>,
        timeout: Duration,
        body: Option<Bytes>,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            timeout,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Final request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Sets a header, replacing any existing value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Sets a header only when absent.
    pub fn set_header_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if !self.headers.contains_key(name) {
            self.headers.insert(name.to_string(), value.into());
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Encoded body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, timeout, body).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Method,
        url::Url,
        HashMap<String, String>,
        Duration,
        Option<Bytes>,
    ) {
        (self.method, self.url, self.headers, self.timeout, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BuiltRequest {
        let url = url::Url::parse("https://api.example.com/users?page=1").expect("valid URL");
        BuiltRequest::new(
            Method::GET,
            url,
            HashMap::new(),
            Duration::from_secs(30),
            None,
        )
    }

    #[test]
    fn built_request_accessors() {
        let built = request();
        assert_eq!(built.method(), &Method::GET);
        assert_eq!(built.url().path(), "/users");
        assert_eq!(built.timeout(), Duration::from_secs(30));
        assert!(built.body().is_none());
    }

    #[test]
    fn set_header_if_absent_keeps_existing() {
        let mut built = request();
        built.set_header("Content-Type", "application/json");
        built.set_header_if_absent("Content-Type", "text/plain");
        assert_eq!(built.header("Content-Type"), Some("application/json"));

        built.set_header_if_absent("Accept", "application/json");
        assert_eq!(built.header("Accept"), Some("application/json"));
    }
}
