use serde::{Deserialize, Serialize};

use crate::types::{EpochId, EventId, PaymentHash, PubKey, RefHash, Sats};

/// A client-signed proof of a paid fetch from a host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Receipt {
    pub epoch: EpochId,
    pub host_pubkey: PubKey,
    pub block_cid: RefHash,
    #[serde(default)]
    pub file_root: Option<RefHash>,
    #[serde(default)]
    pub asset_root: Option<RefHash>,
    pub client_pubkey: PubKey,
    pub payment_hash: PaymentHash,
    pub response_hash: RefHash,
    pub price_sats: Sats,
    pub nonce: u64,
    pub pow_hash: [u8; 32],
    pub receipt_token: Vec<u8>,
    pub client_sig: Vec<u8>,
}

impl Receipt {
    /// The CID a receipt's reward accrues to: `asset_root` when present,
    /// else `file_root`, else the block itself.
    pub fn cid(&self) -> RefHash {
        self.asset_root
            .or(self.file_root)
            .unwrap_or(self.block_cid)
    }
}

/// One row per settled `(epoch, host, cid)` group. Existence of any row for
/// an epoch marks that epoch as settled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpochSummaryRow {
    pub epoch: EpochId,
    pub host_pubkey: PubKey,
    pub cid: RefHash,
    pub receipt_count: u64,
    pub unique_clients: u64,
    pub reward_sats: Sats,
    pub auto_bid_sats: Sats,
    pub egress_royalty_sats: Sats,
}

/// Aggregate totals appended to the log as an EPOCH_SUMMARY event body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpochSummaryTotals {
    pub epoch: EpochId,
    pub groups_settled: u64,
    pub total_reward_sats: Sats,
    pub total_auto_bid_sats: Sats,
    pub total_egress_royalty_sats: Sats,
}

/// Returned by the settlement engine for a single settle() call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettlementResult {
    pub epoch: EpochId,
    pub already_settled: bool,
    pub rows: Vec<EpochSummaryRow>,
    pub source_event: Option<EventId>,
}
