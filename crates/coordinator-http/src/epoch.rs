use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use coordinator_core::error::CoordinatorError;

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{EpochSettleRequest, EpochSummaryResponse, EpochSummaryRowDto, SettlementResultDto};

pub async fn post_epoch_settle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EpochSettleRequest>,
) -> AppResult<Json<SettlementResultDto>> {
    let current_epoch = state.current_epoch();
    if req.epoch >= current_epoch {
        return Err(CoordinatorError::EpochNotClosed(req.epoch).into());
    }

    let settlement = state.settlement.clone();
    let epoch = req.epoch;
    let result = tokio::task::spawn_blocking(move || settlement.settle_epoch(epoch))
        .await
        .map_err(|e| CoordinatorError::Other(e.to_string()))??;

    if !result.already_settled {
        info!(epoch, groups = result.rows.len(), "epoch settled via API request");
    }

    Ok(Json(SettlementResultDto::from(&result)))
}

pub async fn get_epoch_summary(
    State(state): State<Arc<AppState>>,
    Path(epoch): Path<u64>,
) -> AppResult<Json<EpochSummaryResponse>> {
    let settled = state.db.epoch_has_summary(epoch)?;
    let summaries = state
        .db
        .get_epoch_summaries(epoch)?
        .iter()
        .map(EpochSummaryRowDto::from)
        .collect();

    Ok(Json(EpochSummaryResponse {
        epoch,
        settled,
        summaries,
    }))
}
