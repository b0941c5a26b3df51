pub mod cbor;
pub mod hash;
pub mod merkle;
pub mod pow;
pub mod signer;

pub use cbor::{canonical_encode, CborError};
pub use hash::{event_id_from_body, sha256};
pub use merkle::merkle_root;
pub use pow::{mine_pow, pow_challenge, verify_pow};
pub use signer::{verify_signature, CoordinatorSigner, SignatureError};
