use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use coordinator_core::constants::HOST_CHECK_HISTORY_LEN;
use coordinator_core::error::CoordinatorError;
use coordinator_core::host::HostStatus;

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{decode_pubkey, CheckResultDto, HostChecksResponse, HostDto};

pub async fn post_hosts_check(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<CheckResultDto>>> {
    let epoch = state.current_epoch();
    let results = state.availability.check_all(epoch).await?;
    Ok(Json(results.iter().map(CheckResultDto::from).collect()))
}

pub async fn get_host_checks(
    State(state): State<Arc<AppState>>,
    Path(pubkey_hex): Path<String>,
) -> AppResult<Json<HostChecksResponse>> {
    let pubkey = decode_pubkey(&pubkey_hex)?;
    let host = state
        .db
        .get_host(pubkey)?
        .ok_or_else(|| CoordinatorError::HostNotFound(pubkey_hex.clone()))?;
    let checks = state
        .db
        .get_check_results_for_host(pubkey, HOST_CHECK_HISTORY_LEN)?;

    Ok(Json(HostChecksResponse {
        pubkey: pubkey.to_hex(),
        availability_score: host.availability_score,
        status: match host.status {
            HostStatus::Pending => "pending",
            HostStatus::Trusted => "trusted",
            HostStatus::Degraded => "degraded",
            HostStatus::Inactive => "inactive",
            HostStatus::Unbonding => "unbonding",
            HostStatus::Slashed => "slashed",
        },
        checks: checks.iter().map(CheckResultDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    status: Option<String>,
}

pub async fn get_directory(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DirectoryQuery>,
) -> AppResult<Json<Vec<HostDto>>> {
    let status_filter = q.status.as_deref().map(|s| match s {
        "pending" => Ok(HostStatus::Pending),
        "trusted" => Ok(HostStatus::Trusted),
        "degraded" => Ok(HostStatus::Degraded),
        "inactive" => Ok(HostStatus::Inactive),
        "unbonding" => Ok(HostStatus::Unbonding),
        "slashed" => Ok(HostStatus::Slashed),
        other => Err(CoordinatorError::Other(format!("unknown host status filter: {other}"))),
    });
    let status_filter = status_filter.transpose()?;

    let mut hosts = state.db.iter_hosts()?;
    hosts.retain(|h| !h.status.is_terminal());
    if let Some(status) = status_filter {
        hosts.retain(|h| h.status == status);
    }

    Ok(Json(hosts.iter().map(HostDto::from).collect()))
}
