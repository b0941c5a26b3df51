use async_trait::async_trait;

use coordinator_core::error::CoordinatorError;
use coordinator_core::types::{PaymentHash, Sats};

/// A requested invoice, returned to the caller so it can be handed to a
/// client as the `payreq` response.
#[derive(Clone, Debug)]
pub struct Invoice {
    pub payment_hash: PaymentHash,
    pub bolt11: String,
    pub sats: Sats,
}

/// The settlement state of a previously issued invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Settled { settled_sats: Sats },
    Cancelled,
}

/// Everything the coordinator needs from a Lightning node: issue an invoice,
/// and poll whether it has settled. Kept deliberately narrow so a dev stub
/// and a real `lnd` REST client implement the same seam.
#[async_trait]
pub trait LightningBackend: Send + Sync {
    async fn create_invoice(&self, sats: Sats, memo: &str) -> Result<Invoice, LightningError>;
    async fn lookup_invoice(&self, payment_hash: PaymentHash) -> Result<InvoiceStatus, LightningError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LightningError {
    #[error("lightning backend unreachable: {0}")]
    Unreachable(String),

    #[error("lightning backend rejected the request: {0}")]
    Rejected(String),

    #[error("invoice not found")]
    NotFound,
}

impl From<LightningError> for CoordinatorError {
    fn from(e: LightningError) -> Self {
        CoordinatorError::LndUnavailable(e.to_string())
    }
}
