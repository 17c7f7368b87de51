//! Resolution of request specs into transport-ready requests.

use bytes::Bytes;
use courier_core::{Body, BuiltRequest, Error, RequestSpec, Result, UploadSource, encode};

/// Resolves a (possibly plugin-mutated) [`RequestSpec`] into a
/// [`BuiltRequest`].
///
/// Holds the engine-level base URL; a spec's own base URL override takes
/// precedence. Building happens exactly once per logical call, before
/// the transform chain's `adapt_request` hook.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    base_url: Option<url::Url>,
}

impl RequestBuilder {
    /// Creates a builder resolving paths against the given base URL.
    #[must_use]
    pub fn new(base_url: Option<url::Url>) -> Self {
        Self { base_url }
    }

    /// The configured base URL, if any.
    #[must_use]
    pub const fn base_url(&self) -> Option<&url::Url> {
        self.base_url.as_ref()
    }

    /// Builds a transport-ready request from the spec.
    ///
    /// # Errors
    ///
    /// Returns a build error when the path cannot be resolved (invalid
    /// path, or a relative path with no base URL) or the body cannot be
    /// encoded. Build errors are terminal and never retried.
    pub fn build(&self, spec: &RequestSpec) -> Result<BuiltRequest> {
        let url = self.resolve_url(spec)?;
        let (body, content_type) = encode_body(&spec.payload().body)?;

        let mut request = BuiltRequest::new(
            spec.method().clone(),
            url,
            spec.headers().clone(),
            spec.timeout(),
            body,
        );
        if let Some(content_type) = content_type {
            request.set_header_if_absent("Content-Type", content_type);
        }
        Ok(request)
    }

    fn resolve_url(&self, spec: &RequestSpec) -> Result<url::Url> {
        let base = spec.base_url().or(self.base_url.as_ref());
        let mut url = match base {
            Some(base) => base
                .join(spec.path())
                .map_err(|e| Error::build(format!("invalid path '{}': {e}", spec.path())))?,
            None => url::Url::parse(spec.path()).map_err(|_| {
                Error::build(format!(
                    "missing base URL for relative path '{}'",
                    spec.path()
                ))
            })?,
        };

        if !spec.payload().query.is_empty() {
            url.query_pairs_mut().extend_pairs(&spec.payload().query);
        }
        Ok(url)
    }
}

/// Encodes the body and picks the `Content-Type` applied when the spec
/// did not set one explicitly.
///
/// Upload bodies stay unencoded; the transport encodes the source (and
/// owns the multipart boundary header).
fn encode_body(body: &Body) -> Result<(Option<Bytes>, Option<&'static str>)> {
    match body {
        Body::Empty => Ok((None, None)),
        Body::Json(value) => Ok((Some(encode::to_json(value)?), Some("application/json"))),
        Body::Form(pairs) => Ok((
            Some(encode::to_form(pairs)?),
            Some("application/x-www-form-urlencoded; charset=utf-8"),
        )),
        Body::Raw(data) => Ok((Some(data.clone()), Some("application/octet-stream"))),
        Body::Upload(source) => {
            let content_type = match source {
                UploadSource::Multipart(_) => None,
                UploadSource::Bytes(_) | UploadSource::File(_) => {
                    Some("application/octet-stream")
                }
            };
            Ok((None, content_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{Form, Method};

    use super::*;

    fn base() -> url::Url {
        url::Url::parse("https://api.example.com/v1/").expect("valid URL")
    }

    fn builder() -> RequestBuilder {
        RequestBuilder::new(Some(base()))
    }

    #[test]
    fn joins_path_against_base_url() {
        let built = builder()
            .build(&RequestSpec::get("users/42"))
            .expect("build");
        assert_eq!(built.url().as_str(), "https://api.example.com/v1/users/42");
        assert_eq!(built.method(), &Method::GET);
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let built = builder().build(&RequestSpec::get("/users")).expect("build");
        assert_eq!(built.url().as_str(), "https://api.example.com/users");
    }

    #[test]
    fn spec_base_url_overrides_engine_base() {
        let other = url::Url::parse("https://staging.example.com/").expect("valid URL");
        let spec = RequestSpec::get("/ping").base_url_override(other);
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.url().as_str(), "https://staging.example.com/ping");
    }

    #[test]
    fn missing_base_url_is_a_build_error() {
        let err = RequestBuilder::default()
            .build(&RequestSpec::get("/users"))
            .expect_err("should fail");
        assert!(err.is_build());
        assert!(err.to_string().contains("missing base URL"));
    }

    #[test]
    fn absolute_url_path_needs_no_base() {
        let built = RequestBuilder::default()
            .build(&RequestSpec::get("https://example.com/direct"))
            .expect("build");
        assert_eq!(built.url().as_str(), "https://example.com/direct");
    }

    #[test]
    fn query_pairs_appended_in_order() {
        let spec = RequestSpec::get("/search").query("q", "rust").query("page", "2");
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.url().query(), Some("q=rust&page=2"));
    }

    #[test]
    fn json_body_sets_content_type_when_absent() {
        let spec = RequestSpec::post("/users")
            .json(&serde_json::json!({"name": "alice"}))
            .expect("json");
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.header("Content-Type"), Some("application/json"));
        assert_eq!(
            built.body().map(|b| b.as_ref()),
            Some(br#"{"name":"alice"}"#.as_ref())
        );
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let spec = RequestSpec::post("/users")
            .header("Content-Type", "application/vnd.api+json")
            .json(&serde_json::json!({}))
            .expect("json");
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.header("Content-Type"), Some("application/vnd.api+json"));
    }

    #[test]
    fn form_body_is_urlencoded() {
        let spec = RequestSpec::post("/login").form([
            ("user".to_string(), "alice".to_string()),
            ("pass".to_string(), "a&b".to_string()),
        ]);
        let built = builder().build(&spec).expect("build");
        assert_eq!(
            built.header("Content-Type"),
            Some("application/x-www-form-urlencoded; charset=utf-8")
        );
        assert_eq!(built.body().map(|b| b.as_ref()), Some(b"user=alice&pass=a%26b".as_ref()));
    }

    #[test]
    fn raw_body_defaults_to_octet_stream() {
        let spec = RequestSpec::post("/blob").bytes(Bytes::from_static(b"\x00\x01"));
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.header("Content-Type"), Some("application/octet-stream"));
        assert!(built.body().is_some());
    }

    #[test]
    fn upload_body_stays_unencoded() {
        let spec = RequestSpec::post("/files")
            .upload(UploadSource::Bytes(Bytes::from_static(b"payload")));
        let built = builder().build(&spec).expect("build");
        assert!(built.body().is_none());
        assert_eq!(built.header("Content-Type"), Some("application/octet-stream"));
    }

    #[test]
    fn multipart_upload_leaves_content_type_to_the_transport() {
        let form = Form::with_boundary("xyz").text("name", "Jane");
        let spec = RequestSpec::post("/files").upload(UploadSource::Multipart(form));
        let built = builder().build(&spec).expect("build");
        assert!(built.body().is_none());
        assert!(built.header("Content-Type").is_none());
    }

    #[test]
    fn headers_and_timeout_carry_over() {
        let spec = RequestSpec::get("/data")
            .header("Accept", "application/json")
            .timeout_after(std::time::Duration::from_secs(5));
        let built = builder().build(&spec).expect("build");
        assert_eq!(built.header("Accept"), Some("application/json"));
        assert_eq!(built.timeout(), std::time::Duration::from_secs(5));
    }
}
