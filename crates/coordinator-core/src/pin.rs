use serde::{Deserialize, Serialize};

use crate::types::{EpochId, PinId, PubKey, RefHash, Sats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinStatus {
    Active,
    Exhausted,
    Cancelled,
}

/// An earmarked storage budget distinct from the CID's bounty pool: funding
/// a pin does not credit the pool, it opens a separate drip-fed allowance
/// settlement draws down each epoch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinContract {
    pub id: PinId,
    pub cid: RefHash,
    pub funder_pubkey: PubKey,
    pub min_copies: u32,
    pub duration_epochs: u64,
    pub created_epoch: EpochId,
    pub remaining_budget: Sats,
    pub drain_rate: Sats,
    pub status: PinStatus,
}

impl PinContract {
    pub fn new(
        id: PinId,
        cid: RefHash,
        funder_pubkey: PubKey,
        min_copies: u32,
        duration_epochs: u64,
        created_epoch: EpochId,
        budget: Sats,
    ) -> Self {
        let drain_rate = if duration_epochs == 0 {
            budget
        } else {
            budget / duration_epochs
        };
        Self {
            id,
            cid,
            funder_pubkey,
            min_copies,
            duration_epochs,
            created_epoch,
            remaining_budget: budget,
            drain_rate,
            status: PinStatus::Active,
        }
    }
}
