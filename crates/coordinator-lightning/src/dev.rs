use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::RngCore;

use coordinator_core::types::{PaymentHash, Sats};

use crate::backend::{Invoice, InvoiceStatus, LightningBackend, LightningError};

/// In-memory stand-in for a Lightning node, for local development and
/// integration tests. Invoices settle instantly on lookup rather than
/// requiring an actual payment, so the rest of the coordinator can be
/// exercised without a real `lnd` instance.
pub struct DevBackend {
    invoices: Mutex<HashMap<PaymentHash, Sats>>,
}

impl DevBackend {
    pub fn new() -> Self {
        Self {
            invoices: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DevBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LightningBackend for DevBackend {
    async fn create_invoice(&self, sats: Sats, memo: &str) -> Result<Invoice, LightningError> {
        let mut raw = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let payment_hash = PaymentHash::from_bytes(raw);
        self.invoices.lock().unwrap().insert(payment_hash, sats);
        let bolt11 = format!("lndev1{}{}sats{}", payment_hash.to_hex(), sats, memo);
        Ok(Invoice {
            payment_hash,
            bolt11,
            sats,
        })
    }

    async fn lookup_invoice(&self, payment_hash: PaymentHash) -> Result<InvoiceStatus, LightningError> {
        match self.invoices.lock().unwrap().get(&payment_hash) {
            Some(sats) => Ok(InvoiceStatus::Settled { settled_sats: *sats }),
            None => Err(LightningError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_invoice_settles_immediately() {
        let backend = DevBackend::new();
        let invoice = backend.create_invoice(1000, "test").await.unwrap();
        let status = backend.lookup_invoice(invoice.payment_hash).await.unwrap();
        assert_eq!(status, InvoiceStatus::Settled { settled_sats: 1000 });
    }

    #[tokio::test]
    async fn unknown_payment_hash_is_not_found() {
        let backend = DevBackend::new();
        let err = backend
            .lookup_invoice(PaymentHash::from_bytes([0xffu8; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, LightningError::NotFound));
    }
}
