//! Share-state codec: `#` followed by the URL-safe base64 of a JSON object
//! mapping filenames to code.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use indexmap::IndexMap;

/// Unpadded on encode; padding is accepted on decode.
const SHARE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("share state is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share state is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("share state is not a map of file contents: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode(files: &IndexMap<String, String>) -> String {
    // A map of strings always serializes.
    let json = serde_json::to_string(files).unwrap_or_default();
    format!("#{}", SHARE_ENGINE.encode(json))
}

pub fn decode(state: &str) -> Result<IndexMap<String, String>, ShareError> {
    let state = state.trim();
    let state = state.strip_prefix('#').unwrap_or(state);
    let bytes = SHARE_ENGINE.decode(state)?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}
