use serde::{Deserialize, Serialize};

use crate::types::{EpochId, PubKey, RefHash};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostStatus {
    Pending,
    Trusted,
    Degraded,
    Inactive,
    Unbonding,
    Slashed,
}

impl HostStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HostStatus::Unbonding | HostStatus::Slashed)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Host {
    pub pubkey: PubKey,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub stake: u64,
    pub status: HostStatus,
    #[serde(default)]
    pub min_request_sats: u64,
    #[serde(default)]
    pub sats_per_gb: u64,
    #[serde(default)]
    pub availability_score: f64,
    pub registered_epoch: EpochId,
    #[serde(default)]
    pub unbond_epoch: Option<EpochId>,
}

impl Host {
    pub fn new(pubkey: PubKey, registered_epoch: EpochId) -> Self {
        Self {
            pubkey,
            endpoint: None,
            stake: 0,
            status: HostStatus::Pending,
            min_request_sats: 0,
            sats_per_gb: 0,
            availability_score: 0.0,
            registered_epoch,
            unbond_epoch: None,
        }
    }
}

/// `(host_pubkey, cid)` claim that a host is serving a given reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostServe {
    pub host_pubkey: PubKey,
    pub cid: RefHash,
    pub registered_epoch: EpochId,
}

/// One spot-check result, retained for the availability monitor's rolling
/// window and for the `/hosts/:pubkey/checks` history endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckResult {
    pub host_pubkey: PubKey,
    pub cid: RefHash,
    pub epoch: EpochId,
    pub passed: bool,
    pub latency_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}
