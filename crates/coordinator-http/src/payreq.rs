use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use coordinator_core::error::CoordinatorError;
use coordinator_lightning::InvoiceStatus;

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{decode_event_id, decode_payment_hash, PayreqRequest, PayreqResponse, PayreqStatusResponse};

pub async fn post_payreq(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PayreqRequest>,
) -> AppResult<Json<PayreqResponse>> {
    let event_hash = decode_event_id(&req.event_hash)?;

    let Some(backend) = &state.lightning else {
        return Ok(Json(PayreqResponse::DevMode {
            dev_mode: true,
            event_hash: event_hash.to_hex(),
        }));
    };

    let invoice = backend
        .create_invoice(req.sats, &format!("coordinator event {}", event_hash.to_hex()))
        .await
        .map_err(CoordinatorError::from)?;

    let expires_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + coordinator_core::constants::PAYMENT_BINDING_TTL_SECS;

    state
        .payments
        .set(event_hash, invoice.payment_hash, invoice.bolt11.clone(), req.sats);

    Ok(Json(PayreqResponse::Invoice {
        invoice: invoice.bolt11,
        payment_hash: invoice.payment_hash.to_hex(),
        expires_at,
    }))
}

pub async fn get_payreq_status(
    State(state): State<Arc<AppState>>,
    Path(payment_hash_hex): Path<String>,
) -> AppResult<Json<PayreqStatusResponse>> {
    let payment_hash = decode_payment_hash(&payment_hash_hex)?;
    let binding = state
        .payments
        .get_by_payment_hash(payment_hash)
        .ok_or(CoordinatorError::PaymentRequired)?;

    let (settled, state_str) = match &state.lightning {
        Some(backend) => match backend
            .lookup_invoice(payment_hash)
            .await
            .map_err(CoordinatorError::from)?
        {
            InvoiceStatus::Settled { .. } => (true, "settled"),
            InvoiceStatus::Pending => (false, "pending"),
            InvoiceStatus::Cancelled => (false, "cancelled"),
        },
        None => (true, "dev_mode"),
    };

    Ok(Json(PayreqStatusResponse {
        settled,
        state: state_str.to_string(),
        event_hash: binding.event_hash.to_hex(),
        sats: binding.sats,
    }))
}
