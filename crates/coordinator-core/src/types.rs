use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount in satoshis. Non-negative by construction at every boundary that
/// accepts one from the wire.
pub type Sats = u64;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Epoch sequence number, counted from the configured genesis timestamp.
pub type EpochId = u64;

/// Monotonic, dense append position in the event log.
pub type Seq = u64;

macro_rules! hash32_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        // Serialized as a raw 32-byte string, never as hex text or a JSON
        // array of integers: this keeps both the canonical CBOR encoding
        // (a CBOR byte string, per the data model's own "byte strings as
        // byte strings" rule) and the bincode on-disk form compact and
        // stable. Every HTTP-facing hex string is a `coordinator-http` DTO
        // concern, not a property of the domain type.
        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct Visitor;
                impl<'de> serde::de::Visitor<'de> for Visitor {
                    type Value = [u8; 32];
                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "32 bytes")
                    }
                    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                        v.try_into().map_err(|_| E::invalid_length(v.len(), &self))
                    }
                    fn visit_seq<A: serde::de::SeqAccess<'de>>(
                        self,
                        mut seq: A,
                    ) -> Result<Self::Value, A::Error> {
                        let mut out = [0u8; 32];
                        for (i, slot) in out.iter_mut().enumerate() {
                            *slot = seq
                                .next_element()?
                                .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                        }
                        Ok(out)
                    }
                }
                Ok(Self(deserializer.deserialize_bytes(Visitor)?))
            }
        }

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn from_bytes(b: [u8; 32]) -> Self {
                Self(b)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                if bytes.len() != 32 {
                    return Err(hex::FromHexError::InvalidStringLength);
                }
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}…)"), &self.to_hex()[..12])
            }
        }
    };
}

hash32_newtype!(EventId, "SHA-256 over the canonical encoding of an event envelope minus its signature.");
hash32_newtype!(PubKey, "32-byte Ed25519 public key, the `from` field of an event and the identity of a host or client.");
hash32_newtype!(RefHash, "32-byte content/reference hash addressed by bounty pools, host-serve claims and citation edges.");
hash32_newtype!(PaymentHash, "Lightning payment hash; globally unique per settled invoice.");

/// The PIN_POLICY cid-funding budget is tracked separately from pool refs, but
/// shares the same 32-byte key space since a pin always targets a `RefHash`.
pub type PinId = RefHash;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let id = EventId::from_bytes([7u8; 32]);
        let hex = id.to_hex();
        assert_eq!(EventId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn zero_sentinel() {
        assert!(RefHash::ZERO.is_zero());
        assert!(!EventId::from_bytes([1u8; 32]).is_zero());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(EventId::from_hex("abcd").is_err());
    }
}
