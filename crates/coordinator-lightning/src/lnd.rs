use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use coordinator_core::types::{PaymentHash, Sats};

use crate::backend::{Invoice, InvoiceStatus, LightningBackend, LightningError};

/// Talks to `lnd`'s REST API (the `lnrpc.Lightning` service exposed over
/// HTTP, as documented at `<lnd-host>:8080/v1/...`). Authenticates with the
/// node's admin/invoice macaroon, hex-encoded in the `Grpc-Metadata-macaroon`
/// header, over a client that trusts the node's self-signed TLS cert.
pub struct LndRestBackend {
    http: reqwest::Client,
    base_url: String,
    macaroon_hex: String,
}

impl LndRestBackend {
    pub fn new(base_url: impl Into<String>, macaroon_hex: impl Into<String>, accept_invalid_certs: bool) -> Self {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .expect("reqwest client config is valid");
        Self {
            http,
            base_url: base_url.into(),
            macaroon_hex: macaroon_hex.into(),
        }
    }
}

#[derive(Deserialize)]
struct CreateInvoiceResponse {
    r_hash: String,
    payment_request: String,
}

#[derive(Deserialize)]
struct LookupInvoiceResponse {
    state: String,
    #[serde(default)]
    amt_paid_sat: String,
}

#[async_trait]
impl LightningBackend for LndRestBackend {
    async fn create_invoice(&self, sats: Sats, memo: &str) -> Result<Invoice, LightningError> {
        let url = format!("{}/v1/invoices", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .header("Grpc-Metadata-macaroon", &self.macaroon_hex)
            .json(&serde_json::json!({ "value": sats.to_string(), "memo": memo }))
            .send()
            .await
            .map_err(|e| LightningError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LightningError::Rejected(format!("status {}", resp.status())));
        }
        let body: CreateInvoiceResponse = resp
            .json()
            .await
            .map_err(|e| LightningError::Rejected(e.to_string()))?;

        let payment_hash = decode_r_hash(&body.r_hash)?;
        Ok(Invoice {
            payment_hash,
            bolt11: body.payment_request,
            sats,
        })
    }

    async fn lookup_invoice(&self, payment_hash: PaymentHash) -> Result<InvoiceStatus, LightningError> {
        let r_hash_str = hex::encode(payment_hash.as_bytes());
        let url = format!(
            "{}/v1/invoice/{}",
            self.base_url.trim_end_matches('/'),
            r_hash_str
        );
        let resp = self
            .http
            .get(&url)
            .header("Grpc-Metadata-macaroon", &self.macaroon_hex)
            .send()
            .await
            .map_err(|e| LightningError::Unreachable(e.to_string()))?;

        if resp.status().as_u16() == 404 {
            return Err(LightningError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(LightningError::Rejected(format!("status {}", resp.status())));
        }
        let body: LookupInvoiceResponse = resp
            .json()
            .await
            .map_err(|e| LightningError::Rejected(e.to_string()))?;

        match body.state.as_str() {
            "SETTLED" => {
                let settled_sats = body.amt_paid_sat.parse::<u64>().unwrap_or(0);
                Ok(InvoiceStatus::Settled { settled_sats })
            }
            "CANCELED" => Ok(InvoiceStatus::Cancelled),
            _ => Ok(InvoiceStatus::Pending),
        }
    }
}

fn decode_r_hash(r_hash_b64: &str) -> Result<PaymentHash, LightningError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(r_hash_b64)
        .map_err(|e| LightningError::Rejected(format!("malformed r_hash: {e}")))?;
    if bytes.len() != 32 {
        return Err(LightningError::Rejected("r_hash is not 32 bytes".into()));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(PaymentHash::from_bytes(arr))
}
