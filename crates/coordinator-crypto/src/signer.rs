use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;
use zeroize::Zeroizing;

use coordinator_core::types::PubKey;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed public key")]
    MalformedPublicKey,

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature does not verify")]
    VerificationFailed,
}

/// Sign `message` with a raw 32-byte Ed25519 secret key.
pub fn sign(secret_key: &[u8; 32], message: &[u8]) -> Vec<u8> {
    let signing_key = SigningKey::from_bytes(secret_key);
    signing_key.sign(message).to_bytes().to_vec()
}

/// Verify an Ed25519 signature against a public key and message.
pub fn verify_signature(
    public_key: &PubKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let verifying_key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|_| SignatureError::MalformedPublicKey)?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| SignatureError::MalformedSignature)?;
    let sig = Signature::from_bytes(&sig_bytes);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Holds a keypair for local signing. The secret key is zeroized on drop.
pub struct CoordinatorSigner {
    pub public_key: PubKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl CoordinatorSigner {
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        let public_key = PubKey::from_bytes(signing_key.verifying_key().to_bytes());
        Self {
            public_key,
            secret_key: Zeroizing::new(signing_key.to_bytes()),
        }
    }

    pub fn from_secret_key(secret_key: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret_key);
        let public_key = PubKey::from_bytes(signing_key.verifying_key().to_bytes());
        Self {
            public_key,
            secret_key: Zeroizing::new(secret_key),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        sign(&self.secret_key, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = CoordinatorSigner::generate();
        let msg = b"hello coordinator";
        let sig = signer.sign(msg);
        assert!(verify_signature(&signer.public_key, msg, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let signer = CoordinatorSigner::generate();
        let sig = signer.sign(b"original");
        assert!(verify_signature(&signer.public_key, b"tampered", &sig).is_err());
    }

    #[test]
    fn tampered_signature_fails() {
        let signer = CoordinatorSigner::generate();
        let mut sig = signer.sign(b"original");
        sig[0] ^= 0xff;
        assert!(verify_signature(&signer.public_key, b"original", &sig).is_err());
    }
}
