use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use coordinator_core::constants::EVENT_KIND_ANNOUNCE;
use coordinator_core::error::CoordinatorError;

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{decode_ref, GraphEdgeDto, GraphResponse};

const PAGERANK_DAMPING: f64 = 0.85;

/// A neighborhood-local PageRank approximation: one damped step over the
/// node's direct incoming edges, weighting each contributor by its edge
/// sats and its own out-degree — not a full-graph eigenvector solve, since
/// this crate keeps no whole-graph edge index to iterate over.
fn local_pagerank(state: &AppState, reference: coordinator_core::types::RefHash) -> Result<f64, CoordinatorError> {
    let incoming = state.db.get_edges_to(reference)?;
    if incoming.is_empty() {
        return Ok(1.0 - PAGERANK_DAMPING);
    }

    let total_sats: u64 = incoming.iter().map(|e| e.edge_sats.max(1)).sum();
    let mut score = 1.0 - PAGERANK_DAMPING;
    for edge in &incoming {
        let out_degree = state.db.get_edges_from(edge.source_event_id)?.len().max(1) as f64;
        let weight = edge.edge_sats.max(1) as f64 / total_sats as f64;
        score += PAGERANK_DAMPING * weight / out_degree;
    }
    Ok(score)
}

pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Path(ref_hex): Path<String>,
) -> AppResult<Json<GraphResponse>> {
    let reference = decode_ref(&ref_hex)?;

    let incoming = state.db.get_edges_to(reference)?;

    let mut outgoing = Vec::new();
    for event in state
        .db
        .query_events(Some(reference), None, None, None, coordinator_core::constants::MAX_EVENTS_PER_QUERY, 0)?
    {
        if event.kind == EVENT_KIND_ANNOUNCE {
            continue;
        }
        let event_id = coordinator_eventlog::compute_event_id(&event)?;
        outgoing.extend(state.db.get_edges_from(event_id)?);
    }

    let pagerank = local_pagerank(&state, reference)?;

    Ok(Json(GraphResponse {
        reference: reference.to_hex(),
        pagerank,
        incoming: incoming.iter().map(GraphEdgeDto::from).collect(),
        outgoing: outgoing.iter().map(GraphEdgeDto::from).collect(),
    }))
}
