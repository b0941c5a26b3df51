//! ─── Coordinator protocol constants ─────────────────────────────────────────
//!
//! The coordinator pays no one directly; it only decides who is *owed* what.
//! These constants pin the numbers that decision depends on.

// ── Epochs ───────────────────────────────────────────────────────────────────

/// Epoch length: 4 hours.
pub const EPOCH_LENGTH_MS: u64 = 4 * 60 * 60 * 1000;

/// How far back a receipt may still be accepted, relative to the current
/// epoch, before it is rejected as `epoch_out_of_range`.
pub const RECEIPT_MAX_EPOCH_LAG: u64 = 2;

// ── Events ───────────────────────────────────────────────────────────────────

/// Maximum body size, in raw bytes, for a single event (the `body` field is
/// hex-encoded on the wire, so the wire length cap is twice this).
pub const EVENT_MAX_BODY: usize = 16_384;

/// Only protocol version currently understood.
pub const EVENT_VERSION: u8 = 1;

// Recognized event kinds. Unrecognized kinds are still stored; they simply
// carry no registry side effect.
pub const EVENT_KIND_FUND: u8 = 0x01;
pub const EVENT_KIND_ANNOUNCE: u8 = 0x02;
pub const EVENT_KIND_POST: u8 = 0x03;
pub const EVENT_KIND_HOST: u8 = 0x04;
pub const EVENT_KIND_LIST: u8 = 0x07;
pub const EVENT_KIND_PIN_POLICY: u8 = 0x08;
pub const EVENT_KIND_RECEIPT_SUBMIT: u8 = 0x20;
pub const EVENT_KIND_EPOCH_SUMMARY: u8 = 0x21;

/// Domain separation tag mixed into the proof-of-work challenge preimage.
pub const POW_DOMAIN_TAG: &[u8] = b"EV1_POW";

/// Proof-of-work target: `SHA-256(challenge || nonce)`, interpreted as a
/// big-endian 256-bit integer, must be strictly less than 2^240. That is a
/// fixed 16-bit (two leading zero bytes) difficulty — deliberately cheap,
/// since PoW here only deters spam on free (`sats = 0`) events, not mining.
pub const POW_DIFFICULTY_BITS: u32 = 16;

// ── Bounty pools / founder royalty ───────────────────────────────────────────

/// Royalty rate at zero cumulative protocol volume.
pub const FOUNDER_ROYALTY_R0: f64 = 0.15;

/// Cumulative volume, in sats, at which the royalty curve has halved once.
pub const V_STAR: f64 = 125_000_000.0;

/// Curve exponent: log(2)/log(9), chosen so the rate is ~7.5% at 10 BTC
/// cumulative volume and ~3.75% at 100 BTC.
pub const FOUNDER_ROYALTY_ALPHA: f64 = std::f64::consts::LN_2 / 9f64.ln();

// ── Settlement ────────────────────────────────────────────────────────────────

/// Share of a CID's epoch drain taken by the aggregator (off the top, before
/// the per-host split).
pub const AGGREGATOR_FEE_PCT: f64 = 0.10;

/// Share of a CID's epoch balance that may be drained in a single epoch.
pub const CID_EPOCH_CAP_PCT: f64 = 0.10;

/// Share of total proven egress credited back into the CID's pool each
/// epoch (the auto-bid reinvestment flywheel).
pub const AUTO_BID_PCT: f64 = 0.02;

/// Flat protocol royalty on a CID's total proven egress per epoch.
pub const EGRESS_ROYALTY_PCT: f64 = 0.01;

/// Default availability score assigned to a host with no recorded checks,
/// used when weighting settlement splits.
pub const DEFAULT_UPTIME_RATIO: f64 = 0.5;

// ── Availability monitor ──────────────────────────────────────────────────────

/// Number of past epochs folded into a host's rolling availability score.
pub const AVAILABILITY_WINDOW_EPOCHS: usize = 6;

/// Score at or above which a host is promoted to TRUSTED.
pub const AVAILABILITY_TRUSTED_THRESHOLD: f64 = 0.6;

/// Hard timeout for a single spot-check probe.
pub const SPOT_CHECK_TIMEOUT_SECS: u64 = 30;

// ── Pin contracts ─────────────────────────────────────────────────────────────

/// Minimum sats a PIN_POLICY event must fund to open a pin contract.
pub const PIN_MIN_BUDGET_SATS: u64 = 10_000;

/// Maximum requested replica count for a pin contract.
pub const PIN_MAX_COPIES: u32 = 20;

/// Cancellation fee retained by the protocol on early pin cancellation.
pub const PIN_CANCEL_FEE_PCT: f64 = 0.05;

// ── Payment binding store ─────────────────────────────────────────────────────

/// TTL for an unconsumed payment binding.
pub const PAYMENT_BINDING_TTL_SECS: u64 = 10 * 60;

// ── Queries / pagination ──────────────────────────────────────────────────────

pub const MAX_EVENTS_PER_QUERY: usize = 200;
pub const THREAD_MAX_DEPTH: usize = 10;
pub const THREAD_MAX_REPLIES: usize = 500;
pub const HOST_CHECK_HISTORY_LEN: usize = 50;
