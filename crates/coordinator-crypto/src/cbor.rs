//! Deterministic CBOR encoding (RFC 8949 §4.2 core deterministic rules):
//! shortest-length integers, definite-length maps/arrays, and map keys
//! sorted by their own encoded bytes. `ciborium` gives us a correct
//! shortest-length encoder but does not sort map keys for us, so we first
//! serialize into a generic `ciborium::Value` tree and canonicalize that
//! tree before encoding it to bytes. Two semantically-equal values always
//! produce byte-identical output, independent of struct field order or
//! map insertion order.

use ciborium::value::Value;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CborError {
    #[error("cbor value serialization failed: {0}")]
    Value(String),

    #[error("cbor encoding failed: {0}")]
    Encode(String),

    #[error("cbor decoding failed: {0}")]
    Decode(String),
}

/// Encode `value` into canonical (deterministic) CBOR bytes.
pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CborError> {
    let raw = ciborium::value::Value::serialized(value)
        .map_err(|e| CborError::Value(e.to_string()))?;
    let canonical = canonicalize(raw);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&canonical, &mut out)
        .map_err(|e| CborError::Encode(e.to_string()))?;
    Ok(out)
}

/// Recursively sort every map's keys by their own canonical encoding, per
/// RFC 8949's "deterministic encoding" map key ordering rule.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Map(entries) => {
            let mut entries: Vec<(Value, Value)> = entries
                .into_iter()
                .map(|(k, v)| (canonicalize(k), canonicalize(v)))
                .collect();
            entries.sort_by(|(a, _), (b, _)| encoded_bytes(a).cmp(&encoded_bytes(b)));
            Value::Map(entries)
        }
        other => other,
    }
}

fn encoded_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).expect("encoding a Value is infallible");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct A {
        z: u8,
        a: u8,
    }

    #[derive(Serialize)]
    struct B {
        a: u8,
        z: u8,
    }

    #[test]
    fn field_order_does_not_affect_output() {
        let a = canonical_encode(&A { z: 1, a: 2 }).unwrap();
        let b = canonical_encode(&B { a: 2, z: 1 }).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn map_insertion_order_does_not_affect_output() {
        let mut m1 = BTreeMap::new();
        m1.insert("b", 1);
        m1.insert("a", 2);
        let mut m2 = BTreeMap::new();
        m2.insert("a", 2);
        m2.insert("b", 1);
        assert_eq!(
            canonical_encode(&m1).unwrap(),
            canonical_encode(&m2).unwrap()
        );
    }

    #[test]
    fn distinct_values_encode_differently() {
        let a = canonical_encode(&A { z: 1, a: 2 }).unwrap();
        let b = canonical_encode(&A { z: 3, a: 2 }).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn event_body_payload_encodes_as_cbor_byte_string() {
        use coordinator_core::event::EventBody;
        use coordinator_core::types::{PubKey, RefHash};

        let from = PubKey::from_bytes([0u8; 32]);
        let reference = RefHash::from_bytes([0u8; 32]);
        let body: &[u8] = &[1, 2, 3];
        let preimage = EventBody {
            v: 1,
            kind: 1,
            from: &from,
            reference: &reference,
            body,
            sats: 0,
            ts: 0,
        };
        let encoded = canonical_encode(&preimage).unwrap();
        // A 3-byte CBOR byte string (major type 2) is encoded as 0x43
        // followed by the raw bytes; a 3-element array (major type 4, what
        // serde's default `&[u8]` impl would produce) is 0x83 followed by
        // three separate integer items. The byte string form must appear
        // verbatim in the preimage.
        assert!(encoded.windows(4).any(|w| w == [0x43, 1, 2, 3]));
        assert!(!encoded.windows(4).any(|w| w == [0x83, 1, 2, 3]));
    }
}
