use std::sync::Arc;

use coordinator_availability::AvailabilityMonitor;
use coordinator_core::types::PubKey;
use coordinator_crypto::CoordinatorSigner;
use coordinator_lightning::LightningBackend;
use coordinator_settlement::{EpochClock, SettlementEngine};
use coordinator_state::{PaymentBindingStore, StateDb};

/// Shared handle threaded through every axum handler. Mirrors the shape of
/// this codebase's own `RpcServerState`: one struct, constructed once at
/// startup, wrapped in an `Arc` and cloned per request.
pub struct AppState {
    pub db: Arc<StateDb>,
    pub settlement: Arc<SettlementEngine>,
    pub availability: Arc<AvailabilityMonitor>,
    pub payments: Arc<PaymentBindingStore>,
    pub clock: EpochClock,
    /// Absent in dev mode: events and pins with `sats > 0` skip payment
    /// verification entirely when no backend is attached.
    pub lightning: Option<Arc<dyn LightningBackend>>,
    /// Signs the RECEIPT_SUBMIT log entries this crate appends. When absent,
    /// the append is skipped and a warning is logged, matching the
    /// settlement engine's own EPOCH_SUMMARY behavior.
    pub system_signer: Option<Arc<CoordinatorSigner>>,
    pub mint_pubkeys: Vec<PubKey>,
    pub require_pow: bool,
}

impl AppState {
    pub fn current_epoch(&self) -> coordinator_core::types::EpochId {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.clock.current_epoch(now_ms)
    }
}
