use serde::{Deserialize, Serialize};

use crate::types::{EpochId, RefHash, Sats};

/// A bounty pool: the running balance available to pay hosts serving `key`,
/// plus the lifetime totals that feed the founder royalty curve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub key: RefHash,
    /// Never negative. Drained by settlement, credited by FUND events and
    /// by auto-bid reinvestment.
    pub balance: Sats,
    /// Cumulative sats ever credited to this pool, pre-royalty. Feeds
    /// `founder_royalty_rate` for subsequent credits on the *same* pool —
    /// the curve is evaluated against the protocol-wide cumulative volume,
    /// tracked separately in `ProtocolVolume`, not per-pool.
    pub total_tipped: Sats,
    #[serde(default)]
    pub last_payout_epoch: Option<EpochId>,
}

impl Pool {
    pub fn new(key: RefHash) -> Self {
        Self {
            key,
            balance: 0,
            total_tipped: 0,
            last_payout_epoch: None,
        }
    }
}

/// Tracks the protocol-wide cumulative volume the founder royalty curve is
/// evaluated against. A singleton row in the state database.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProtocolVolume {
    pub cumulative_sats: Sats,
}
