//! Byte encoding shared by every engine that persists through the store
//! traits.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::StoreError;

/// Encode a value for storage.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode the bytes stored under `key`. Bytes that do not decode mean the
/// store no longer holds what the engine wrote.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corruption(format!("{key}: {e}")))
}

/// Decode a required entry, failing with `NotFound` when it is absent.
pub fn decode_required<T: DeserializeOwned>(
    key: &str,
    bytes: Option<Vec<u8>>,
) -> Result<T, StoreError> {
    let bytes = bytes.ok_or_else(|| StoreError::NotFound(key.to_string()))?;
    decode(key, &bytes)
}
