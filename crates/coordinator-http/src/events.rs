use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use coordinator_core::constants::*;
use coordinator_core::error::CoordinatorError;
use coordinator_core::event::{HostBody, PinPolicyBody};
use coordinator_core::host::Host;
use coordinator_core::pin::PinContract;
use coordinator_eventlog::{compute_event_id, extract_edges, validate_pow, validate_shape, validate_signature};
use coordinator_lightning::InvoiceStatus;
use coordinator_settlement::split_with_royalty;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::wire::{decode_pubkey, decode_ref, event_to_dto, EventDto, EventRequest, IngestResponse};

pub async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EventRequest>,
) -> AppResult<Json<IngestResponse>> {
    let event = req.into_event()?;
    validate_shape(&event)?;

    let event_id = compute_event_id(&event)?;

    // Duplicate event-ids are idempotent no-ops: return the existing row
    // without re-running any side effect.
    if let Some((seq, _)) = state.db.get_event_by_id(event_id)? {
        info!(event_id = %event_id, seq, "duplicate event ingest, idempotent");
        return Ok(Json(IngestResponse {
            ok: true,
            event_id: event_id.to_hex(),
            pool_credit: None,
            protocol_fee: None,
            seq,
        }));
    }

    validate_signature(&event)?;

    if event.sats == 0 && state.require_pow {
        validate_pow(&event)?;
    }

    if event.sats > 0 {
        if let Some(backend) = &state.lightning {
            verify_payment(&state, backend.as_ref(), event_id, event.sats).await?;
        }
    }

    let current_epoch = state.current_epoch();
    let mut pool_credit = None;
    let mut protocol_fee = None;

    match event.kind {
        EVENT_KIND_PIN_POLICY => {
            if let Ok(policy) = serde_json::from_slice::<PinPolicyBody>(&event.body) {
                if policy.min_copies < 1 || policy.min_copies > PIN_MAX_COPIES {
                    return Err(CoordinatorError::PinCopiesOutOfRange { max: PIN_MAX_COPIES }.into());
                }
                if policy.duration_epochs < 1 {
                    return Err(CoordinatorError::PinDurationInvalid.into());
                }
                if event.sats < PIN_MIN_BUDGET_SATS {
                    return Err(CoordinatorError::PinBudgetTooLow { min: PIN_MIN_BUDGET_SATS }.into());
                }
                let pin = PinContract::new(
                    event_id,
                    event.reference,
                    event.from,
                    policy.min_copies,
                    policy.duration_epochs,
                    current_epoch,
                    event.sats,
                );
                state.db.put_pin(&pin)?;
            }
            // Funding a pin never credits the bounty pool: it opens a
            // separate earmarked budget instead (see DESIGN.md).
        }
        EVENT_KIND_HOST => {
            if event.sats > 0 {
                let volume_before = state.db.bump_protocol_volume(event.sats)?;
                let (fee, net) = split_with_royalty(event.sats, volume_before);
                state.db.credit_pool(event.reference, net, event.sats)?;
                pool_credit = Some(net);
                protocol_fee = Some(fee);
            }
            if let Ok(host_body) = serde_json::from_slice::<HostBody>(&event.body) {
                let mut host = state
                    .db
                    .get_host(event.from)?
                    .unwrap_or_else(|| Host::new(event.from, current_epoch));
                host.endpoint = Some(host_body.endpoint);
                if let Some(pricing) = host_body.pricing {
                    host.min_request_sats = pricing.min_request_sats;
                    host.sats_per_gb = pricing.sats_per_gb;
                }
                state.db.put_host(&host)?;
            }
        }
        _ => {
            if event.sats > 0 {
                let volume_before = state.db.bump_protocol_volume(event.sats)?;
                let (fee, net) = split_with_royalty(event.sats, volume_before);
                state.db.credit_pool(event.reference, net, event.sats)?;
                pool_credit = Some(net);
                protocol_fee = Some(fee);
            }
        }
    }

    let seq = state.db.append_event(event_id, &event)?;

    let edges = extract_edges(event_id, &event);
    for (idx, edge) in edges.iter().enumerate() {
        state.db.put_citation_edge(idx as u64, edge)?;
    }

    info!(event_id = %event_id, kind = event.kind, sats = event.sats, seq, "event ingested");

    Ok(Json(IngestResponse {
        ok: true,
        event_id: event_id.to_hex(),
        pool_credit,
        protocol_fee,
        seq,
    }))
}

pub(crate) async fn verify_payment(
    state: &AppState,
    backend: &dyn coordinator_lightning::LightningBackend,
    event_id: coordinator_core::types::EventId,
    sats: u64,
) -> Result<(), AppError> {
    let binding = state
        .payments
        .get_by_event_hash(event_id)
        .ok_or(CoordinatorError::PaymentRequired)?;

    if binding.sats != sats {
        return Err(CoordinatorError::SatsMismatch.into());
    }

    let status = backend
        .lookup_invoice(binding.payment_hash)
        .await
        .map_err(CoordinatorError::from)?;
    match status {
        InvoiceStatus::Settled { settled_sats } if settled_sats >= sats => {
            state.payments.delete(binding.payment_hash);
            Ok(())
        }
        InvoiceStatus::Settled { .. } => Err(CoordinatorError::PaymentInsufficient.into()),
        InvoiceStatus::Pending | InvoiceStatus::Cancelled => {
            Err(CoordinatorError::PaymentNotSettled.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub kind: Option<u8>,
    pub from: Option<String>,
    pub since: Option<u64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(serde::Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventDto>,
}

pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EventsQuery>,
) -> AppResult<Json<EventsResponse>> {
    let reference = q.reference.as_deref().map(decode_ref).transpose()?;
    let from = q.from.as_deref().map(decode_pubkey).transpose()?;
    let limit = q.limit.unwrap_or(MAX_EVENTS_PER_QUERY).min(MAX_EVENTS_PER_QUERY);

    let events = state
        .db
        .query_events(reference, q.kind, from, q.since, limit, q.offset.unwrap_or(0))?;

    let dtos = events
        .into_iter()
        .map(|e| {
            let id = compute_event_id(&e).unwrap_or_else(|err| {
                warn!(error = %err, "failed to recompute event_id for listing");
                coordinator_core::types::EventId::ZERO
            });
            event_to_dto(id, &e)
        })
        .collect();

    Ok(Json(EventsResponse { events: dtos }))
}
