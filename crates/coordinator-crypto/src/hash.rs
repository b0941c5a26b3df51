use serde::Serialize;
use sha2::{Digest, Sha256};

use coordinator_core::types::EventId;

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `event_id = SHA-256(canonical_encode(body))` for any signing-body value.
pub fn event_id_from_body<T: Serialize>(body: &T) -> Result<EventId, crate::cbor::CborError> {
    let bytes = crate::cbor::canonical_encode(body)?;
    Ok(EventId::from_bytes(sha256(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256(b"abc"), sha256(b"abc"));
        assert_ne!(sha256(b"abc"), sha256(b"abd"));
    }
}
