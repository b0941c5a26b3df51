use coordinator_core::constants::{POW_DIFFICULTY_BITS, POW_DOMAIN_TAG};
use coordinator_core::types::{PubKey, RefHash, TimestampMs};

use crate::hash::sha256;

/// Build the proof-of-work challenge preimage for a free (`sats == 0`)
/// event: `SHA-256("EV1_POW" || from || ts(be u64) || kind || ref ||
/// SHA-256(body))`.
pub fn pow_challenge(
    from: &PubKey,
    ts: TimestampMs,
    kind: u8,
    reference: &RefHash,
    body: &[u8],
) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(POW_DOMAIN_TAG.len() + 32 + 8 + 1 + 32 + 32);
    preimage.extend_from_slice(POW_DOMAIN_TAG);
    preimage.extend_from_slice(from.as_bytes());
    preimage.extend_from_slice(&ts.to_be_bytes());
    preimage.push(kind);
    preimage.extend_from_slice(reference.as_bytes());
    preimage.extend_from_slice(&sha256(body));
    sha256(&preimage)
}

/// `SHA-256(challenge || nonce)`, interpreted as a big-endian 256-bit
/// integer, compared against the `2^240` threshold implied by
/// [`POW_DIFFICULTY_BITS`] (the top 16 bits / 2 bytes must be zero).
fn pow_hash(challenge: &[u8; 32], nonce: u64) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(40);
    preimage.extend_from_slice(challenge);
    preimage.extend_from_slice(&nonce.to_be_bytes());
    sha256(&preimage)
}

fn meets_difficulty(hash: &[u8; 32]) -> bool {
    let zero_bytes = (POW_DIFFICULTY_BITS / 8) as usize;
    hash[..zero_bytes].iter().all(|&b| b == 0)
}

pub fn verify_pow(challenge: &[u8; 32], nonce: u64) -> bool {
    meets_difficulty(&pow_hash(challenge, nonce))
}

/// Brute-force a nonce satisfying the difficulty target. Only used in tests
/// and the free-write dev path; real clients mine this themselves.
pub fn mine_pow(challenge: &[u8; 32]) -> u64 {
    let mut nonce = 0u64;
    loop {
        if meets_difficulty(&pow_hash(challenge, nonce)) {
            return nonce;
        }
        nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_round_trip() {
        let challenge = sha256(b"challenge");
        let nonce = mine_pow(&challenge);
        assert!(verify_pow(&challenge, nonce));
    }

    #[test]
    fn wrong_nonce_fails() {
        let challenge = sha256(b"challenge");
        let nonce = mine_pow(&challenge);
        assert!(!verify_pow(&challenge, nonce.wrapping_add(1)));
    }

    #[test]
    fn challenge_preimage_is_deterministic() {
        let from = PubKey::from_bytes([1u8; 32]);
        let reference = RefHash::from_bytes([2u8; 32]);
        let a = pow_challenge(&from, 1000, 1, &reference, b"body");
        let b = pow_challenge(&from, 1000, 1, &reference, b"body");
        assert_eq!(a, b);
        let c = pow_challenge(&from, 1001, 1, &reference, b"body");
        assert_ne!(a, c);
    }
}
