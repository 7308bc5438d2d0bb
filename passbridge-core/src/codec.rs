//! JSON text <-> ceremony values at the host boundary.
//!
//! Decoding tolerates unknown fields; a missing required field fails with
//! an error naming both the input and the field.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Decode `text` as a `T`, labelling failures with `what`.
pub fn decode<T: DeserializeOwned>(what: &'static str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| BridgeError::Decode {
        what,
        reason: e.to_string(),
    })
}

/// Encode `value` as JSON text, labelling failures with `what`.
pub fn encode<T: Serialize + ?Sized>(what: &'static str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| BridgeError::Encode {
        what,
        reason: e.to_string(),
    })
}

/// Serde adapter for binary identifiers.
///
/// Emits base64url without padding, which is how the engine writes every
/// binary value. Accepts standard or URL-safe base64 (padded or not) and
/// plain byte arrays, since hosts produce all three.
pub mod bytes {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw(Vec<u8>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Raw(raw) => Ok(raw),
            Repr::Text(text) => decode_lenient(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid base64 identifier: {text}"))),
        }
    }

    pub(crate) fn decode_lenient(text: &str) -> Option<Vec<u8>> {
        [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(text).ok())
    }
}
