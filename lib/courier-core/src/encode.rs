//! Body and query encoding helpers.

use bytes::Bytes;

use crate::{Error, Result};

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::encode::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::encode(e.to_string()))
}

/// Serialize ordered key/value pairs to form-urlencoded bytes.
///
/// # Errors
///
/// Returns an error if form serialization fails.
pub fn to_form(pairs: &[(String, String)]) -> Result<Bytes> {
    serde_urlencoded::to_string(pairs)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(|e| Error::encode(e.to_string()))
}

/// Serialize a value to query parameter pairs.
///
/// Uses `serde_html_form`, which supports `Vec<T>` fields for repeated
/// parameters (e.g. `tags=a&tags=b`).
///
/// # Errors
///
/// Returns an error if query serialization fails.
pub fn to_query_pairs<T: serde::Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    let encoded = serde_html_form::to_string(value).map_err(|e| Error::encode(e.to_string()))?;
    Ok(serde_html_form::from_str::<Vec<(String, String)>>(&encoded)
        .map_err(|e| Error::encode(e.to_string()))?)
}
