use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::CoordinatorError;
use crate::types::{EventId, PubKey, RefHash, Sats, Seq, TimestampMs};

/// Serializes `body` as a CBOR/bincode byte string rather than a sequence
/// of integers. Serde's blanket `Vec<u8>`/`&[u8]` impls go through
/// `serialize_seq`, which would encode the canonical preimage as a CBOR
/// array (major type 4) instead of a byte string (major type 2) — the same
/// pitfall the 32-byte hash newtypes in `types.rs` already sidestep with a
/// hand-written `serialize_bytes` impl.
mod body_bytes {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = Vec<u8>;
            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "a byte string")
            }
            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }
            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(v)
            }
            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element()? {
                    out.push(byte);
                }
                Ok(out)
            }
        }
        deserializer.deserialize_bytes(Visitor)
    }

    /// Serialize-only variant for the borrowed preimage view (`EventBody`),
    /// which never needs to round-trip through `Deserialize`.
    pub fn serialize_ref<S: Serializer>(bytes: &&[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }
}

/// A signed, append-only statement. The wire representation hex-encodes the
/// binary fields; `body_bytes` carries the decoded, canonically-encoded
/// per-kind payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub v: u8,
    pub kind: u8,
    pub from: PubKey,
    #[serde(rename = "ref")]
    pub reference: RefHash,
    #[serde(with = "body_bytes")]
    pub body: Vec<u8>,
    pub sats: Sats,
    pub ts: TimestampMs,
    pub sig: Vec<u8>,
    /// Required only when `sats == 0` and the node enforces free-write PoW.
    pub pow_nonce: Option<u64>,
}

impl Event {
    /// The subset of fields that are signed over and hashed into the
    /// `event_id`. `sig` (and `pow_nonce`, which is authenticated indirectly
    /// through the PoW challenge rather than the signature) are excluded.
    pub fn signing_body(&self) -> EventBody<'_> {
        EventBody {
            v: self.v,
            kind: self.kind,
            from: &self.from,
            reference: &self.reference,
            body: &self.body,
            sats: self.sats,
            ts: self.ts,
        }
    }

    pub fn validate_shape(&self) -> Result<(), CoordinatorError> {
        if self.v != EVENT_VERSION {
            return Err(CoordinatorError::UnsupportedVersion(self.v));
        }
        if self.body.len() > EVENT_MAX_BODY {
            return Err(CoordinatorError::BodyTooLarge {
                max: EVENT_MAX_BODY,
            });
        }
        Ok(())
    }
}

/// By-reference subset of [`Event`] used as the canonical-encoding preimage
/// for both the event id hash and the Ed25519 signature.
#[derive(Clone, Debug, Serialize)]
pub struct EventBody<'a> {
    pub v: u8,
    pub kind: u8,
    pub from: &'a PubKey,
    #[serde(rename = "ref")]
    pub reference: &'a RefHash,
    #[serde(serialize_with = "body_bytes::serialize_ref")]
    pub body: &'a [u8],
    pub sats: Sats,
    pub ts: TimestampMs,
}

/// Decoded ANNOUNCE payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnnounceBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub author_pubkey: Option<String>,
    #[serde(default)]
    pub revshare_bps: Option<u16>,
}

/// Decoded POST payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostBody {
    pub text: String,
}

/// Decoded HOST payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostBody {
    pub endpoint: String,
    #[serde(default)]
    pub pricing: Option<HostPricing>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostPricing {
    pub min_request_sats: u64,
    pub sats_per_gb: u64,
}

/// Decoded LIST payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub items: Vec<String>,
}

/// Decoded PIN_POLICY payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinPolicyBody {
    pub min_copies: u32,
    pub duration_epochs: u64,
}

/// What the ingest pipeline reports back to the caller.
#[derive(Clone, Debug, Serialize)]
pub struct IngestOutcome {
    pub ok: bool,
    pub event_id: EventId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_credit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_fee: Option<u64>,
    pub seq: Seq,
}
