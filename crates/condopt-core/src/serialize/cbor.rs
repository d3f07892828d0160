use crate::serialize::{MAX_PERSISTED_BYTES, SerializeError};
use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::{from_slice, to_vec};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Serialize a value into CBOR bytes.
pub(super) fn serialize<T>(t: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    to_vec(t).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize CBOR bytes into a value.
///
/// Input size is bounded before decode, and a panic inside the decoder is
/// reported as a deserialize error instead of escaping.
pub(super) fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if bytes.len() > MAX_PERSISTED_BYTES {
        return Err(SerializeError::Deserialize(
            "payload exceeds maximum allowed size".into(),
        ));
    }

    let result = catch_unwind(AssertUnwindSafe(|| from_slice(bytes)));

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SerializeError::Deserialize(err.to_string())),
        Err(_) => Err(SerializeError::Deserialize(
            "panic during CBOR deserialization".into(),
        )),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_payload_is_reported_not_panicked() {
        let bytes = serialize(&vec![1u32, 2, 3]).expect("encode");
        let err = deserialize::<Vec<u32>>(&bytes[..bytes.len() - 1]).expect_err("truncated");

        assert!(matches!(err, SerializeError::Deserialize(_)));
    }

    #[test]
    fn oversized_payload_is_rejected_before_decode() {
        let bytes = vec![0u8; MAX_PERSISTED_BYTES + 1];
        let err = deserialize::<Vec<u8>>(&bytes).expect_err("oversized");

        assert!(err.to_string().contains("maximum allowed size"));
    }
}
