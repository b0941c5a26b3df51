//! Hex-string wire DTOs for the HTTP boundary.
//!
//! Domain types (`EventId`, `PubKey`, `RefHash`, `PaymentHash`) serialize as
//! raw bytes for CBOR/bincode; every JSON-facing struct here carries the
//! same hashes as 64-character hex strings instead, with explicit
//! conversion functions at the edge — the same shape as this codebase's own
//! `Rpc*` DTOs.

use serde::{Deserialize, Serialize};

use coordinator_core::error::CoordinatorError;
use coordinator_core::event::{AnnounceBody, Event, IngestOutcome};
use coordinator_core::host::{CheckResult, Host, HostStatus};
use coordinator_core::pin::{PinContract, PinStatus};
use coordinator_core::receipt::{EpochSummaryRow, Receipt, SettlementResult};
use coordinator_core::types::{EventId, PaymentHash, PubKey, RefHash};
use coordinator_eventlog::CitationEdge;

pub fn decode_pubkey(s: &str) -> Result<PubKey, CoordinatorError> {
    PubKey::from_hex(s).map_err(|_| CoordinatorError::InvalidFrom)
}

pub fn decode_ref(s: &str) -> Result<RefHash, CoordinatorError> {
    RefHash::from_hex(s).map_err(|_| CoordinatorError::InvalidRef)
}

pub fn decode_event_id(s: &str) -> Result<EventId, CoordinatorError> {
    EventId::from_hex(s).map_err(|_| CoordinatorError::EventNotFound(s.to_string()))
}

pub fn decode_payment_hash(s: &str) -> Result<PaymentHash, CoordinatorError> {
    PaymentHash::from_hex(s).map_err(|_| CoordinatorError::Other("invalid payment_hash".into()))
}

pub fn decode_body(s: &str) -> Result<Vec<u8>, CoordinatorError> {
    hex::decode(s).map_err(|_| CoordinatorError::InvalidBody)
}

pub fn decode_sig(s: &str) -> Result<Vec<u8>, CoordinatorError> {
    hex::decode(s).map_err(|_| CoordinatorError::InvalidSignature)
}

// ── Event envelope ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct EventRequest {
    pub v: u8,
    pub kind: u8,
    pub from: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub body: String,
    pub sats: u64,
    pub ts: u64,
    pub sig: String,
    #[serde(default)]
    pub pow_nonce: Option<u64>,
}

impl EventRequest {
    pub fn into_event(self) -> Result<Event, CoordinatorError> {
        Ok(Event {
            v: self.v,
            kind: self.kind,
            from: decode_pubkey(&self.from)?,
            reference: decode_ref(&self.reference)?,
            body: decode_body(&self.body)?,
            sats: self.sats,
            ts: self.ts,
            sig: decode_sig(&self.sig)?,
            pow_nonce: self.pow_nonce,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EventDto {
    pub event_id: String,
    pub v: u8,
    pub kind: u8,
    pub from: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub body: String,
    pub sats: u64,
    pub ts: u64,
    pub sig: String,
}

pub fn event_to_dto(event_id: EventId, event: &Event) -> EventDto {
    EventDto {
        event_id: event_id.to_hex(),
        v: event.v,
        kind: event.kind,
        from: event.from.to_hex(),
        reference: event.reference.to_hex(),
        body: hex::encode(&event.body),
        sats: event.sats,
        ts: event.ts,
        sig: hex::encode(&event.sig),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_credit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_fee: Option<u64>,
    pub seq: u64,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(o: IngestOutcome) -> Self {
        Self {
            ok: o.ok,
            event_id: o.event_id.to_hex(),
            pool_credit: o.pool_credit,
            protocol_fee: o.protocol_fee,
            seq: o.seq,
        }
    }
}

// ── Payment binding ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct PayreqRequest {
    pub sats: u64,
    pub event_hash: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum PayreqResponse {
    Invoice {
        invoice: String,
        payment_hash: String,
        expires_at: u64,
    },
    DevMode {
        dev_mode: bool,
        event_hash: String,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct PayreqStatusResponse {
    pub settled: bool,
    pub state: String,
    pub event_hash: String,
    pub sats: u64,
}

// ── Receipts ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct ReceiptRequest {
    pub epoch: u64,
    pub host_pubkey: String,
    pub block_cid: String,
    #[serde(default)]
    pub file_root: Option<String>,
    #[serde(default)]
    pub asset_root: Option<String>,
    pub client_pubkey: String,
    pub payment_hash: String,
    pub response_hash: String,
    pub price_sats: u64,
    pub nonce: u64,
    pub pow_hash: String,
    pub receipt_token: String,
    pub client_sig: String,
}

impl ReceiptRequest {
    pub fn into_receipt(self) -> Result<Receipt, CoordinatorError> {
        let pow_hash_bytes = hex::decode(&self.pow_hash).map_err(|_| CoordinatorError::InvalidReceipt)?;
        let pow_hash: [u8; 32] = pow_hash_bytes
            .try_into()
            .map_err(|_| CoordinatorError::InvalidReceipt)?;
        Ok(Receipt {
            epoch: self.epoch,
            host_pubkey: decode_pubkey(&self.host_pubkey).map_err(|_| CoordinatorError::InvalidReceipt)?,
            block_cid: decode_ref(&self.block_cid).map_err(|_| CoordinatorError::InvalidReceipt)?,
            file_root: self
                .file_root
                .as_deref()
                .map(decode_ref)
                .transpose()
                .map_err(|_| CoordinatorError::InvalidReceipt)?,
            asset_root: self
                .asset_root
                .as_deref()
                .map(decode_ref)
                .transpose()
                .map_err(|_| CoordinatorError::InvalidReceipt)?,
            client_pubkey: decode_pubkey(&self.client_pubkey).map_err(|_| CoordinatorError::InvalidReceipt)?,
            payment_hash: decode_payment_hash(&self.payment_hash)
                .map_err(|_| CoordinatorError::InvalidReceipt)?,
            response_hash: decode_ref(&self.response_hash).map_err(|_| CoordinatorError::InvalidReceipt)?,
            price_sats: self.price_sats,
            nonce: self.nonce,
            pow_hash,
            receipt_token: hex::decode(&self.receipt_token).map_err(|_| CoordinatorError::InvalidReceipt)?,
            client_sig: hex::decode(&self.client_sig).map_err(|_| CoordinatorError::InvalidReceipt)?,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReceiptResponse {
    pub ok: bool,
    pub duplicate: bool,
    pub epoch: u64,
}

// ── Settlement / epoch ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct EpochSettleRequest {
    pub epoch: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct EpochSummaryRowDto {
    pub host_pubkey: String,
    pub cid: String,
    pub receipt_count: u64,
    pub unique_clients: u64,
    pub reward_sats: u64,
    pub auto_bid_sats: u64,
    pub egress_royalty_sats: u64,
}

impl From<&EpochSummaryRow> for EpochSummaryRowDto {
    fn from(r: &EpochSummaryRow) -> Self {
        Self {
            host_pubkey: r.host_pubkey.to_hex(),
            cid: r.cid.to_hex(),
            receipt_count: r.receipt_count,
            unique_clients: r.unique_clients,
            reward_sats: r.reward_sats,
            auto_bid_sats: r.auto_bid_sats,
            egress_royalty_sats: r.egress_royalty_sats,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SettlementResultDto {
    pub epoch: u64,
    pub already_settled: bool,
    pub rows: Vec<EpochSummaryRowDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event: Option<String>,
}

impl From<&SettlementResult> for SettlementResultDto {
    fn from(r: &SettlementResult) -> Self {
        Self {
            epoch: r.epoch,
            already_settled: r.already_settled,
            rows: r.rows.iter().map(EpochSummaryRowDto::from).collect(),
            source_event: r.source_event.map(|e| e.to_hex()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EpochSummaryResponse {
    pub epoch: u64,
    pub settled: bool,
    pub summaries: Vec<EpochSummaryRowDto>,
}

// ── Pin contracts ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct PinRequest {
    pub cid: String,
    pub funder_pubkey: String,
    pub min_copies: u32,
    pub duration_epochs: u64,
    pub sats: u64,
    #[serde(default)]
    pub payment_hash: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PinDto {
    pub id: String,
    pub cid: String,
    pub funder_pubkey: String,
    pub min_copies: u32,
    pub duration_epochs: u64,
    pub created_epoch: u64,
    pub remaining_budget: u64,
    pub drain_rate: u64,
    pub status: &'static str,
}

fn pin_status_str(s: PinStatus) -> &'static str {
    match s {
        PinStatus::Active => "active",
        PinStatus::Exhausted => "exhausted",
        PinStatus::Cancelled => "cancelled",
    }
}

impl From<&PinContract> for PinDto {
    fn from(p: &PinContract) -> Self {
        Self {
            id: p.id.to_hex(),
            cid: p.cid.to_hex(),
            funder_pubkey: p.funder_pubkey.to_hex(),
            min_copies: p.min_copies,
            duration_epochs: p.duration_epochs,
            created_epoch: p.created_epoch,
            remaining_budget: p.remaining_budget,
            drain_rate: p.drain_rate,
            status: pin_status_str(p.status),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PinCancelResponse {
    pub id: String,
    pub refund_sats: u64,
    pub fee_sats: u64,
    pub status: &'static str,
}

// ── Hosts / availability ─────────────────────────────────────────────────────

fn host_status_str(s: HostStatus) -> &'static str {
    match s {
        HostStatus::Pending => "pending",
        HostStatus::Trusted => "trusted",
        HostStatus::Degraded => "degraded",
        HostStatus::Inactive => "inactive",
        HostStatus::Unbonding => "unbonding",
        HostStatus::Slashed => "slashed",
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HostDto {
    pub pubkey: String,
    pub endpoint: Option<String>,
    pub stake: u64,
    pub status: &'static str,
    pub min_request_sats: u64,
    pub sats_per_gb: u64,
    pub availability_score: f64,
    pub registered_epoch: u64,
}

impl From<&Host> for HostDto {
    fn from(h: &Host) -> Self {
        Self {
            pubkey: h.pubkey.to_hex(),
            endpoint: h.endpoint.clone(),
            stake: h.stake,
            status: host_status_str(h.status),
            min_request_sats: h.min_request_sats,
            sats_per_gb: h.sats_per_gb,
            availability_score: h.availability_score,
            registered_epoch: h.registered_epoch,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckResultDto {
    pub host_pubkey: String,
    pub cid: String,
    pub epoch: u64,
    pub passed: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CheckResult> for CheckResultDto {
    fn from(c: &CheckResult) -> Self {
        Self {
            host_pubkey: c.host_pubkey.to_hex(),
            cid: c.cid.to_hex(),
            epoch: c.epoch,
            passed: c.passed,
            latency_ms: c.latency_ms,
            error: c.error.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HostChecksResponse {
    pub pubkey: String,
    pub availability_score: f64,
    pub status: &'static str,
    pub checks: Vec<CheckResultDto>,
}

// ── Feed / thread / graph ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Default)]
pub struct AnnounceMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

impl From<AnnounceBody> for AnnounceMeta {
    fn from(b: AnnounceBody) -> Self {
        Self {
            title: b.title,
            description: b.description,
            tags: b.tags,
            mime: b.mime,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FundedFeedEntry {
    #[serde(rename = "ref")]
    pub reference: String,
    pub balance: u64,
    pub total_tipped: u64,
    #[serde(flatten)]
    pub meta: AnnounceMeta,
}

#[derive(Clone, Debug, Serialize)]
pub struct ThreadNode {
    pub event: EventDto,
    pub replies: Vec<ThreadNode>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GraphEdgeDto {
    pub source_event_id: String,
    pub source_ref: String,
    pub target_ref: String,
    pub edge_sats: u64,
    pub source_kind: u8,
}

impl From<&CitationEdge> for GraphEdgeDto {
    fn from(e: &CitationEdge) -> Self {
        Self {
            source_event_id: e.source_event_id.to_hex(),
            source_ref: e.source_ref.to_hex(),
            target_ref: e.target_ref.to_hex(),
            edge_sats: e.edge_sats,
            source_kind: e.source_kind,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GraphResponse {
    #[serde(rename = "ref")]
    pub reference: String,
    pub pagerank: f64,
    pub incoming: Vec<GraphEdgeDto>,
    pub outgoing: Vec<GraphEdgeDto>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub events: u64,
    pub timestamp: u64,
}
