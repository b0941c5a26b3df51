use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use coordinator_core::constants::{EVENT_KIND_RECEIPT_SUBMIT, EVENT_VERSION, RECEIPT_MAX_EPOCH_LAG};
use coordinator_core::error::CoordinatorError;
use coordinator_core::event::{Event, EventBody};
use coordinator_core::receipt::Receipt;
use coordinator_core::types::RefHash;
use coordinator_crypto::{canonical_encode, event_id_from_body, sha256, verify_pow, verify_signature};

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{ReceiptRequest, ReceiptResponse};

const RECEIPT_POW_DOMAIN_TAG: &[u8] = b"RCPT1_POW";

/// By-reference subset of a [`Receipt`] signed over by both the mint (its
/// `receipt_token`) and the client (`client_sig`).
#[derive(Serialize)]
struct ReceiptPreimage<'a> {
    epoch: u64,
    host_pubkey: &'a coordinator_core::types::PubKey,
    block_cid: &'a RefHash,
    file_root: Option<&'a RefHash>,
    asset_root: Option<&'a RefHash>,
    client_pubkey: &'a coordinator_core::types::PubKey,
    payment_hash: &'a coordinator_core::types::PaymentHash,
    response_hash: &'a RefHash,
    price_sats: u64,
    nonce: u64,
}

impl Receipt {
    fn preimage(&self) -> ReceiptPreimage<'_> {
        ReceiptPreimage {
            epoch: self.epoch,
            host_pubkey: &self.host_pubkey,
            block_cid: &self.block_cid,
            file_root: self.file_root.as_ref(),
            asset_root: self.asset_root.as_ref(),
            client_pubkey: &self.client_pubkey,
            payment_hash: &self.payment_hash,
            response_hash: &self.response_hash,
            price_sats: self.price_sats,
            nonce: self.nonce,
        }
    }
}

fn receipt_pow_challenge(receipt: &Receipt) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(RECEIPT_POW_DOMAIN_TAG.len() + 32 + 32 + 8);
    preimage.extend_from_slice(RECEIPT_POW_DOMAIN_TAG);
    preimage.extend_from_slice(receipt.payment_hash.as_bytes());
    preimage.extend_from_slice(receipt.host_pubkey.as_bytes());
    preimage.extend_from_slice(receipt.block_cid.as_bytes());
    preimage.extend_from_slice(&receipt.price_sats.to_be_bytes());
    sha256(&preimage)
}

/// Verify the mint's stamp, the client's own signature, and the anti-spam
/// proof-of-work binding a receipt to its nonce. All three ride over the
/// same canonical preimage of the receipt's core fields.
fn validate_receipt(receipt: &Receipt, mint_pubkeys: &[coordinator_core::types::PubKey]) -> Result<(), CoordinatorError> {
    if mint_pubkeys.is_empty() {
        return Err(CoordinatorError::NoMintPubkeysConfigured);
    }
    let preimage_bytes =
        canonical_encode(&receipt.preimage()).map_err(|e| CoordinatorError::Serialization(e.to_string()))?;

    let mint_ok = mint_pubkeys
        .iter()
        .any(|pk| verify_signature(pk, &preimage_bytes, &receipt.receipt_token).is_ok());
    if !mint_ok {
        return Err(CoordinatorError::InvalidReceipt);
    }

    verify_signature(&receipt.client_pubkey, &preimage_bytes, &receipt.client_sig)
        .map_err(|_| CoordinatorError::InvalidReceipt)?;

    let challenge = receipt_pow_challenge(receipt);
    if !verify_pow(&challenge, receipt.nonce) {
        return Err(CoordinatorError::InvalidReceipt);
    }

    Ok(())
}

pub async fn post_receipt_submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReceiptRequest>,
) -> AppResult<Json<ReceiptResponse>> {
    let receipt = req.into_receipt()?;

    let current_epoch = state.current_epoch();
    if receipt.epoch > current_epoch || receipt.epoch + RECEIPT_MAX_EPOCH_LAG < current_epoch {
        return Err(CoordinatorError::EpochOutOfRange.into());
    }

    validate_receipt(&receipt, &state.mint_pubkeys)?;

    let epoch = receipt.epoch;
    let inserted = state.db.put_receipt(&receipt)?;
    if !inserted {
        return Ok(Json(ReceiptResponse {
            ok: true,
            duplicate: true,
            epoch,
        }));
    }

    append_receipt_submit_event(&state, &receipt);

    info!(
        host = %receipt.host_pubkey,
        cid = %receipt.cid(),
        epoch,
        price_sats = receipt.price_sats,
        "receipt accepted"
    );

    Ok(Json(ReceiptResponse {
        ok: true,
        duplicate: false,
        epoch,
    }))
}

fn append_receipt_submit_event(state: &AppState, receipt: &Receipt) {
    let Some(signer) = &state.system_signer else {
        warn!("no system signer configured; skipping RECEIPT_SUBMIT log append");
        return;
    };
    let body = match serde_json::to_vec(&receipt.preimage()) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to encode RECEIPT_SUBMIT body");
            return;
        }
    };
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let reference = receipt.cid();
    let preimage = EventBody {
        v: EVENT_VERSION,
        kind: EVENT_KIND_RECEIPT_SUBMIT,
        from: &signer.public_key,
        reference: &reference,
        body: &body,
        sats: 0,
        ts,
    };
    let preimage_bytes = match canonical_encode(&preimage) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to canonical-encode RECEIPT_SUBMIT preimage");
            return;
        }
    };
    let sig = signer.sign(&preimage_bytes);
    let event_id = match event_id_from_body(&preimage) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "failed to compute RECEIPT_SUBMIT event_id");
            return;
        }
    };
    let event = Event {
        v: EVENT_VERSION,
        kind: EVENT_KIND_RECEIPT_SUBMIT,
        from: signer.public_key,
        reference,
        body,
        sats: 0,
        ts,
        sig,
        pow_nonce: None,
    };
    if let Err(e) = state.db.append_event(event_id, &event) {
        warn!(error = %e, "failed to append RECEIPT_SUBMIT event");
    }
}
