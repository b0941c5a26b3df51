use thiserror::Error;

/// The single flat error type threaded through every coordinator crate.
/// `coordinator-http` owns the only translation from a variant to an HTTP
/// status code; every other crate just returns these.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    // ── Event envelope validation (422) ──────────────────────────────────────
    #[error("unsupported event version: {0}")]
    UnsupportedVersion(u8),

    #[error("invalid event kind")]
    InvalidKind,

    #[error("invalid `from` public key")]
    InvalidFrom,

    #[error("invalid `ref` hash")]
    InvalidRef,

    #[error("body exceeds maximum size of {max} bytes")]
    BodyTooLarge { max: usize },

    #[error("invalid body encoding")]
    InvalidBody,

    #[error("invalid `sats` value")]
    InvalidSats,

    #[error("invalid `ts` value")]
    InvalidTs,

    #[error("proof-of-work required for zero-sats events")]
    PowRequired,

    #[error("invalid proof-of-work")]
    InvalidPow,

    #[error("sats value does not match the bound payment amount")]
    SatsMismatch,

    // ── Authority (401) ───────────────────────────────────────────────────────
    #[error("invalid signature")]
    InvalidSignature,

    // ── Payment (402) ──────────────────────────────────────────────────────────
    #[error("payment required; call POST /payreq first")]
    PaymentRequired,

    #[error("bound invoice has not settled")]
    PaymentNotSettled,

    #[error("settled payment amount is less than the required sats")]
    PaymentInsufficient,

    // ── External dependency (503) ─────────────────────────────────────────────
    #[error("lightning backend unavailable: {0}")]
    LndUnavailable(String),

    // ── Receipts ──────────────────────────────────────────────────────────────
    #[error("no mint public keys configured")]
    NoMintPubkeysConfigured,

    #[error("invalid receipt")]
    InvalidReceipt,

    #[error("receipt epoch is out of the acceptable range")]
    EpochOutOfRange,

    #[error("duplicate receipt")]
    DuplicateReceipt,

    // ── Settlement / epoch ────────────────────────────────────────────────────
    #[error("epoch {0} has not yet closed")]
    EpochNotClosed(u64),

    // ── Pin contracts ─────────────────────────────────────────────────────────
    #[error("pin budget below minimum of {min} sats")]
    PinBudgetTooLow { min: u64 },

    #[error("pin copy count out of range (1..={max})")]
    PinCopiesOutOfRange { max: u32 },

    #[error("pin duration_epochs must be at least 1")]
    PinDurationInvalid,

    #[error("pin contract not found: {0}")]
    PinNotFound(String),

    #[error("pin contract is not active")]
    PinNotActive,

    // ── Lookup ────────────────────────────────────────────────────────────────
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("event not found: {0}")]
    EventNotFound(String),

    // ── Serialization / storage ───────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}
