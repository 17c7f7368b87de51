//! Response decoding.

use bytes::Bytes;

use crate::Result;

/// Deserialize JSON bytes with path-aware error messages.
///
/// Uses `serde_path_to_error` so decode failures name the exact field
/// that failed (e.g. `user.address.city`).
///
/// # Errors
///
/// Returns a decode error if deserialization fails.
///
/// # Example
///
/// ```
/// use courier_core::decode::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| crate::Error::decode(e.path().to_string(), e.inner().to_string()))
}

/// Decodes a response body into a caller-expected shape.
///
/// Passed to the engine's `execute_decoded`; implement it to support
/// formats other than JSON or to add decoding policies (lenient field
/// handling, envelope unwrapping, ...).
pub trait ResponseDecoder: Send + Sync {
    /// Decode the body bytes.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body does not match `T`.
    fn decode<T: serde::de::DeserializeOwned>(&self, body: &Bytes) -> Result<T>;
}

/// JSON decoder with path-aware errors, the default for
/// `execute_decoded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn decode<T: serde::de::DeserializeOwned>(&self, body: &Bytes) -> Result<T> {
        from_json(body)
    }
}
