use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::state::AppState;
use crate::wire::HealthResponse;

pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    Json(HealthResponse {
        status: "ok",
        events: state.db.count_events(),
        timestamp,
    })
}
