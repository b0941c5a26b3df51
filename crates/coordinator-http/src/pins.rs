use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use coordinator_core::constants::{PIN_CANCEL_FEE_PCT, PIN_MAX_COPIES, PIN_MIN_BUDGET_SATS};
use coordinator_core::error::CoordinatorError;
use coordinator_core::pin::{PinContract, PinStatus};
use coordinator_core::types::{EventId, PubKey, RefHash};
use coordinator_crypto::{canonical_encode, sha256};

use crate::error::AppResult;
use crate::events::verify_payment;
use crate::state::AppState;
use crate::wire::{decode_pubkey, decode_ref, PinCancelResponse, PinDto, PinRequest};

/// Signed-over-nothing preimage identifying a pin funding request: the same
/// `(cid, funder, copies, duration, sats)` tuple always derives the same pin
/// id, making a repeated `POST /pin` idempotent the same way duplicate
/// event ingest is.
#[derive(Serialize)]
struct PinFundingPreimage {
    cid: RefHash,
    funder_pubkey: PubKey,
    min_copies: u32,
    duration_epochs: u64,
    sats: u64,
}

fn pin_request_id(req: &PinRequest, cid: RefHash, funder_pubkey: PubKey) -> Result<RefHash, CoordinatorError> {
    let preimage = PinFundingPreimage {
        cid,
        funder_pubkey,
        min_copies: req.min_copies,
        duration_epochs: req.duration_epochs,
        sats: req.sats,
    };
    let bytes = canonical_encode(&preimage).map_err(|e| CoordinatorError::Serialization(e.to_string()))?;
    Ok(RefHash::from_bytes(sha256(&bytes)))
}

pub async fn post_pin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PinRequest>,
) -> AppResult<Json<PinDto>> {
    let cid = decode_ref(&req.cid)?;
    let funder_pubkey = decode_pubkey(&req.funder_pubkey)?;

    if req.min_copies < 1 || req.min_copies > PIN_MAX_COPIES {
        return Err(CoordinatorError::PinCopiesOutOfRange { max: PIN_MAX_COPIES }.into());
    }
    if req.duration_epochs < 1 {
        return Err(CoordinatorError::PinDurationInvalid.into());
    }
    if req.sats < PIN_MIN_BUDGET_SATS {
        return Err(CoordinatorError::PinBudgetTooLow {
            min: PIN_MIN_BUDGET_SATS,
        }
        .into());
    }

    let pin_id = pin_request_id(&req, cid, funder_pubkey)?;

    if let Some(existing) = state.db.get_pin(pin_id)? {
        info!(pin_id = %pin_id, "duplicate pin funding request, idempotent");
        return Ok(Json(PinDto::from(&existing)));
    }

    if req.sats > 0 {
        if let Some(backend) = &state.lightning {
            let event_hash = EventId::from_bytes(*pin_id.as_bytes());
            verify_payment(&state, backend.as_ref(), event_hash, req.sats).await?;
        }
    }

    let current_epoch = state.current_epoch();
    let pin = PinContract::new(
        pin_id,
        cid,
        funder_pubkey,
        req.min_copies,
        req.duration_epochs,
        current_epoch,
        req.sats,
    );
    state.db.put_pin(&pin)?;

    info!(pin_id = %pin_id, cid = %cid, sats = req.sats, "pin contract funded");

    Ok(Json(PinDto::from(&pin)))
}

pub async fn get_pin(
    State(state): State<Arc<AppState>>,
    Path(id_hex): Path<String>,
) -> AppResult<Json<PinDto>> {
    let id = decode_ref(&id_hex)?;
    let pin = state
        .db
        .get_pin(id)?
        .ok_or_else(|| CoordinatorError::PinNotFound(id_hex.clone()))?;
    Ok(Json(PinDto::from(&pin)))
}

pub async fn post_pin_cancel(
    State(state): State<Arc<AppState>>,
    Path(id_hex): Path<String>,
) -> AppResult<Json<PinCancelResponse>> {
    let id = decode_ref(&id_hex)?;
    let mut pin = state
        .db
        .get_pin(id)?
        .ok_or_else(|| CoordinatorError::PinNotFound(id_hex.clone()))?;

    if pin.status != PinStatus::Active {
        return Err(CoordinatorError::PinNotActive.into());
    }

    let fee_sats = ((pin.remaining_budget as f64) * PIN_CANCEL_FEE_PCT).floor() as u64;
    let refund_sats = pin.remaining_budget - fee_sats;

    pin.remaining_budget = 0;
    pin.status = PinStatus::Cancelled;
    state.db.put_pin(&pin)?;

    info!(pin_id = %id, refund_sats, fee_sats, "pin contract cancelled");

    Ok(Json(PinCancelResponse {
        id: id.to_hex(),
        refund_sats,
        fee_sats,
        status: "cancelled",
    }))
}
