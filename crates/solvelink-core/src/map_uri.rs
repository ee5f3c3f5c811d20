//! Self-contained map references (`data:` URIs).
//!
//! A solve call carries the map inline so the backend never has to share
//! storage with the client: `data:text/plain;charset=utf-8,<percent-encoded>`.
//! Decoding also accepts `;base64` payloads produced by other clients.

use base64::Engine;
use thiserror::Error;

const DATA_PREFIX: &str = "data:";
const TEXT_MEDIA_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapUriError {
    #[error("not a data URI (expected 'data:' prefix)")]
    NotDataUri,

    #[error("data URI has no ',' separating header and payload")]
    MissingPayload,

    #[error("invalid percent-encoding in data URI: {0}")]
    InvalidPercentEncoding(String),

    #[error("invalid base64 payload in data URI: {0}")]
    InvalidBase64(String),

    #[error("map payload is not valid UTF-8")]
    NotUtf8,
}

/// Encode map text as a percent-encoded `data:` URI.
pub fn encode(content: &str) -> String {
    format!(
        "{}{},{}",
        DATA_PREFIX,
        TEXT_MEDIA_TYPE,
        urlencoding::encode(content)
    )
}

/// Decode a `data:` URI back into map text.
pub fn decode(uri: &str) -> Result<String, MapUriError> {
    let rest = uri.strip_prefix(DATA_PREFIX).ok_or(MapUriError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(MapUriError::MissingPayload)?;
    if header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| MapUriError::InvalidBase64(e.to_string()))?;
        return String::from_utf8(bytes).map_err(|_| MapUriError::NotUtf8);
    }
    urlencoding::decode(payload)
        .map(|s| s.into_owned())
        .map_err(|e| MapUriError::InvalidPercentEncoding(e.to_string()))
}

/// Whether `uri` looks like something [`decode`] accepts.
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with(DATA_PREFIX) && uri.contains(',')
}
