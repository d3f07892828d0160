//! Codecs for persisted plan fragments.
//!
//! CBOR is the compact binary form; JSON is the human-readable form used by
//! explain output and tests. Both go through serde data models owned by the
//! modules that persist themselves.

mod cbor;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

/// Upper bound on a single persisted plan fragment.
pub const MAX_PERSISTED_BYTES: usize = 16 * 1024 * 1024;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

/// Serialize a value into CBOR bytes.
pub fn serialize<T>(ty: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    cbor::serialize(ty)
}

/// Deserialize a value produced by [`serialize`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    cbor::deserialize(bytes)
}

/// Serialize a value into its JSON text form.
pub fn to_json<T>(ty: &T) -> Result<String, SerializeError>
where
    T: Serialize,
{
    serde_json::to_string(ty).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize a value from its JSON text form.
pub fn from_json<T>(text: &str) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if text.len() > MAX_PERSISTED_BYTES {
        return Err(SerializeError::Deserialize(
            "payload exceeds maximum allowed size".into(),
        ));
    }

    serde_json::from_str(text).map_err(|e| SerializeError::Deserialize(e.to_string()))
}
