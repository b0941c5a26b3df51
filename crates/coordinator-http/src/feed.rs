use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use coordinator_core::constants::{
    EVENT_KIND_ANNOUNCE, EVENT_KIND_POST, MAX_EVENTS_PER_QUERY, THREAD_MAX_DEPTH, THREAD_MAX_REPLIES,
};
use coordinator_core::error::CoordinatorError;
use coordinator_core::event::AnnounceBody;
use coordinator_core::types::{EventId, RefHash};
use coordinator_eventlog::compute_event_id;

use crate::error::AppResult;
use crate::state::AppState;
use crate::wire::{decode_event_id, event_to_dto, AnnounceMeta, EventDto, FundedFeedEntry, ThreadNode};

#[derive(Debug, Deserialize)]
pub struct FundedQuery {
    min_balance: Option<u64>,
    limit: Option<usize>,
}

pub async fn get_feed_funded(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FundedQuery>,
) -> AppResult<Json<Vec<FundedFeedEntry>>> {
    let min_balance = q.min_balance.unwrap_or(0);
    let limit = q.limit.unwrap_or(50).min(MAX_EVENTS_PER_QUERY);

    let mut pools = state.db.iter_pools()?;
    pools.retain(|p| p.balance >= min_balance);
    pools.sort_unstable_by(|a, b| b.balance.cmp(&a.balance));
    pools.truncate(limit);

    let mut entries = Vec::with_capacity(pools.len());
    for pool in pools {
        let latest_announce = state
            .db
            .query_events(Some(pool.key), Some(EVENT_KIND_ANNOUNCE), None, None, 1, 0)?
            .into_iter()
            .next();
        let meta = latest_announce
            .and_then(|e| serde_json::from_slice::<AnnounceBody>(&e.body).ok())
            .map(AnnounceMeta::from)
            .unwrap_or_default();

        entries.push(FundedFeedEntry {
            reference: pool.key.to_hex(),
            balance: pool.balance,
            total_tipped: pool.total_tipped,
            meta,
        });
    }

    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    tag: Option<String>,
}

pub async fn get_feed_recent(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RecentQuery>,
) -> AppResult<Json<Vec<EventDto>>> {
    let limit = q.limit.unwrap_or(50).min(MAX_EVENTS_PER_QUERY);
    let offset = q.offset.unwrap_or(0);

    let events = state
        .db
        .query_events(None, Some(EVENT_KIND_ANNOUNCE), None, None, MAX_EVENTS_PER_QUERY, offset)?;

    let filtered: Vec<_> = match &q.tag {
        Some(tag) => events
            .into_iter()
            .filter(|e| {
                serde_json::from_slice::<AnnounceBody>(&e.body)
                    .map(|b| b.tags.iter().any(|t| t == tag))
                    .unwrap_or(false)
            })
            .collect(),
        None => events,
    };

    let dtos = filtered
        .into_iter()
        .take(limit)
        .map(|e| {
            let id = compute_event_id(&e).unwrap_or(EventId::ZERO);
            event_to_dto(id, &e)
        })
        .collect();

    Ok(Json(dtos))
}

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(event_id_hex): Path<String>,
) -> AppResult<Json<ThreadNode>> {
    let event_id = decode_event_id(&event_id_hex)?;
    let (_, root_event) = state
        .db
        .get_event_by_id(event_id)?
        .ok_or_else(|| CoordinatorError::EventNotFound(event_id_hex.clone()))?;

    let mut budget = THREAD_MAX_REPLIES;
    let root = build_thread_node(&state, event_id, &root_event, 0, &mut budget)?;
    Ok(Json(root))
}

fn build_thread_node(
    state: &AppState,
    event_id: EventId,
    event: &coordinator_core::event::Event,
    depth: usize,
    budget: &mut usize,
) -> Result<ThreadNode, CoordinatorError> {
    let event_dto = event_to_dto(event_id, event);

    if depth >= THREAD_MAX_DEPTH || *budget == 0 {
        return Ok(ThreadNode {
            event: event_dto,
            replies: Vec::new(),
        });
    }

    let target = RefHash::from_bytes(*event_id.as_bytes());
    let mut replies = Vec::new();
    for edge in state.db.get_edges_to(target)? {
        if edge.source_kind != EVENT_KIND_POST {
            continue;
        }
        if *budget == 0 {
            break;
        }
        let Some((_, reply_event)) = state.db.get_event_by_id(edge.source_event_id)? else {
            continue;
        };
        *budget -= 1;
        replies.push(build_thread_node(state, edge.source_event_id, &reply_event, depth + 1, budget)?);
    }

    Ok(ThreadNode {
        event: event_dto,
        replies,
    })
}
