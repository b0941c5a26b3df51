use coordinator_core::constants::*;
use coordinator_core::error::CoordinatorError;
use coordinator_core::event::Event;
use coordinator_crypto::{event_id_from_body, pow_challenge, verify_pow, verify_signature};

/// Structural validation (§4.1 step "Validation"): shape only, no
/// signature, no payment, no registry side effects.
pub fn validate_shape(event: &Event) -> Result<(), CoordinatorError> {
    if event.v != EVENT_VERSION {
        return Err(CoordinatorError::UnsupportedVersion(event.v));
    }
    if event.body.len() > EVENT_MAX_BODY {
        return Err(CoordinatorError::BodyTooLarge {
            max: EVENT_MAX_BODY,
        });
    }
    Ok(())
}

/// Recompute the canonical encoding of the envelope minus `sig`, and verify
/// the Ed25519 signature against `from`.
pub fn validate_signature(event: &Event) -> Result<(), CoordinatorError> {
    let preimage = coordinator_crypto::canonical_encode(&event.signing_body())
        .map_err(|e| CoordinatorError::Serialization(e.to_string()))?;
    verify_signature(&event.from, &preimage, &event.sig)
        .map_err(|_| CoordinatorError::InvalidSignature)
}

/// For free (`sats == 0`) events under a PoW-enforcing node, verify the
/// nonce against the challenge derived from the envelope.
pub fn validate_pow(event: &Event) -> Result<(), CoordinatorError> {
    let nonce = event.pow_nonce.ok_or(CoordinatorError::PowRequired)?;
    let challenge = pow_challenge(&event.from, event.ts, event.kind, &event.reference, &event.body);
    if verify_pow(&challenge, nonce) {
        Ok(())
    } else {
        Err(CoordinatorError::InvalidPow)
    }
}

/// Compute the `event_id` for a validated, signed event.
pub fn compute_event_id(
    event: &Event,
) -> Result<coordinator_core::types::EventId, CoordinatorError> {
    event_id_from_body(&event.signing_body()).map_err(|e| CoordinatorError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::types::{PubKey, RefHash};
    use coordinator_crypto::CoordinatorSigner;

    fn signed_event(sats: u64, kind: u8) -> Event {
        let signer = CoordinatorSigner::generate();
        let mut event = Event {
            v: EVENT_VERSION,
            kind,
            from: signer.public_key,
            reference: RefHash::ZERO,
            body: vec![],
            sats,
            ts: 1_000,
            sig: vec![],
            pow_nonce: None,
        };
        let preimage = coordinator_crypto::canonical_encode(&event.signing_body()).unwrap();
        event.sig = signer.sign(&preimage);
        event
    }

    #[test]
    fn valid_signature_passes() {
        let event = signed_event(0, EVENT_KIND_POST);
        assert!(validate_signature(&event).is_ok());
    }

    #[test]
    fn tampered_from_fails_signature() {
        let mut event = signed_event(0, EVENT_KIND_POST);
        event.from = PubKey::from_bytes([9u8; 32]);
        assert!(validate_signature(&event).is_err());
    }

    #[test]
    fn event_id_is_stable_for_equal_envelopes() {
        let signer = CoordinatorSigner::generate();
        let make = || Event {
            v: EVENT_VERSION,
            kind: EVENT_KIND_POST,
            from: signer.public_key,
            reference: RefHash::ZERO,
            body: vec![1, 2, 3],
            sats: 0,
            ts: 42,
            sig: vec![],
            pow_nonce: None,
        };
        let a = compute_event_id(&make()).unwrap();
        let b = compute_event_id(&make()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pow_required_when_missing() {
        let event = signed_event(0, EVENT_KIND_POST);
        assert!(matches!(validate_pow(&event), Err(CoordinatorError::PowRequired)));
    }
}
