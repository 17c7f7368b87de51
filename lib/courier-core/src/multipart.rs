//! Multipart form bodies for uploads.
//!
//! Parts keep their insertion order; the encoded body is deterministic
//! for a given form and boundary.
//!
//! # Example
//!
//! ```
//! use courier_core::multipart::{Form, Part};
//!
//! let form = Form::with_boundary("xyz")
//!     .part(Part::text("name", "Jane"))
//!     .part(Part::file("avatar", "photo.png", vec![1u8, 2, 3]));
//! assert_eq!(form.content_type(), "multipart/form-data; boundary=xyz");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};

/// A single part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Creates a part with the given field name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Creates a `text/plain` part.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(value.into()))
            .content_typed("text/plain; charset=utf-8")
    }

    /// Creates an `application/octet-stream` part.
    #[must_use]
    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, data).content_typed("application/octet-stream")
    }

    /// Creates a file part; the content type is inferred from the
    /// filename extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        let mut part = Self::new(name, data).content_typed(content_type);
        part.filename = Some(filename);
        part
    }

    /// Sets the filename.
    #[must_use]
    pub fn named_file(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_typed(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Part data.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    fn encoded_len(&self, boundary_len: usize) -> u64 {
        // "--<boundary>\r\n" + disposition line + optional content-type
        // line + blank line + data + "\r\n"
        let mut len = 2 + boundary_len + 2;
        len += b"Content-Disposition: form-data; name=\"\"\r\n".len() + self.name.len();
        if let Some(filename) = &self.filename {
            len += b"; filename=\"\"".len() + filename.len();
        }
        if let Some(content_type) = &self.content_type {
            len += b"Content-Type: \r\n".len() + content_type.len();
        }
        len += 2 + self.data.len() + 2;
        len as u64
    }
}

/// An ordered multipart form.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Creates an empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            boundary: next_boundary(),
        }
    }

    /// Creates an empty form with a caller-chosen boundary.
    ///
    /// The boundary must not occur in any part's data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Appends a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Appends a file field.
    #[must_use]
    pub fn file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.part(Part::file(name, filename, data))
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `Content-Type` header value for this form.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Size of the encoded body in bytes, without encoding it.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        let parts: u64 = self
            .parts
            .iter()
            .map(|p| p.encoded_len(self.boundary.len()))
            .sum();
        parts + (2 + self.boundary.len() + 4) as u64
    }

    /// Encodes the form into body bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

/// Content type inferred from a filename extension.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// Boundaries only need to be unique per process; a counter mixed with
/// the process start offset is enough and keeps encoding deterministic
/// under test.
fn next_boundary() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----CourierBoundary{timestamp:x}{count:04x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_text() {
        let part = Part::text("field", "value");
        assert_eq!(part.name(), "field");
        assert_eq!(part.data().as_ref(), b"value");
        assert_eq!(part.content_type(), Some("text/plain; charset=utf-8"));
        assert!(part.filename().is_none());
    }

    #[test]
    fn part_file_infers_content_type() {
        let part = Part::file("avatar", "photo.PNG", vec![1u8, 2, 3]);
        assert_eq!(part.filename(), Some("photo.PNG"));
        assert_eq!(part.content_type(), Some("image/png"));

        let part = Part::file("blob", "dump.bin", vec![0u8]);
        assert_eq!(part.content_type(), Some("application/octet-stream"));
    }

    #[test]
    fn form_encodes_in_order() {
        let form = Form::with_boundary("xyz")
            .text("name", "Jane")
            .part(Part::new("raw", Bytes::from_static(b"data")));

        let body = form.encode();
        let text = std::str::from_utf8(&body).expect("utf8");

        let expected = "--xyz\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            Jane\r\n\
            --xyz\r\n\
            Content-Disposition: form-data; name=\"raw\"\r\n\
            \r\n\
            data\r\n\
            --xyz--\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn form_encoded_len_matches_encoding() {
        let form = Form::with_boundary("boundary-123")
            .text("name", "Jane")
            .file("avatar", "photo.png", vec![1u8, 2, 3, 4, 5]);

        assert_eq!(form.encoded_len(), form.encode().len() as u64);
    }

    #[test]
    fn boundaries_are_unique() {
        let a = Form::new();
        let b = Form::new();
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn form_content_type() {
        let form = Form::with_boundary("abc");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=abc");
    }
}
