use std::path::Path;

use coordinator_core::error::CoordinatorError;
use coordinator_core::event::Event;
use coordinator_core::host::{CheckResult, Host, HostServe};
use coordinator_core::pin::PinContract;
use coordinator_core::pool::Pool;
use coordinator_core::receipt::{EpochSummaryRow, Receipt};
use coordinator_core::types::{EpochId, EventId, PaymentHash, PubKey, RefHash, Sats, Seq};
use coordinator_eventlog::CitationEdge;

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   events              — seq be bytes              → bincode(Event)
///   event_index         — event_id bytes             → seq be bytes
///   event_by_ref        — ref bytes + seq be          → ()
///   event_by_kind       — kind byte + seq be          → ()
///   pools               — ref bytes                  → bincode(Pool)
///   hosts               — pubkey bytes                → bincode(Host)
///   host_serves         — host bytes + cid bytes       → bincode(HostServe)
///   receipts            — payment_hash bytes           → bincode(Receipt)
///   receipts_by_epoch   — epoch be + payment_hash       → ()
///   epoch_summaries     — epoch be + host + cid         → bincode(EpochSummaryRow)
///   pin_contracts       — pin_id bytes                  → bincode(PinContract)
///   citation_edges      — source_event_id + idx be      → bincode(CitationEdge)
///   citation_by_target  — target_ref + source_event_id  → ()
///   check_results       — host bytes + epoch be + idx be → bincode(CheckResult)
///   meta                — utf8 key bytes                → raw bytes
pub struct StateDb {
    db: sled::Db,
    events: sled::Tree,
    event_index: sled::Tree,
    event_by_ref: sled::Tree,
    event_by_kind: sled::Tree,
    pools: sled::Tree,
    hosts: sled::Tree,
    host_serves: sled::Tree,
    receipts: sled::Tree,
    receipts_by_epoch: sled::Tree,
    epoch_summaries: sled::Tree,
    pin_contracts: sled::Tree,
    citation_edges: sled::Tree,
    citation_by_target: sled::Tree,
    check_results: sled::Tree,
    meta: sled::Tree,
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Serialization(e.to_string())
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoordinatorError> {
        let db = sled::open(path).map_err(storage_err)?;
        macro_rules! tree {
            ($name:expr) => {
                db.open_tree($name).map_err(storage_err)?
            };
        }
        Ok(Self {
            events: tree!("events"),
            event_index: tree!("event_index"),
            event_by_ref: tree!("event_by_ref"),
            event_by_kind: tree!("event_by_kind"),
            pools: tree!("pools"),
            hosts: tree!("hosts"),
            host_serves: tree!("host_serves"),
            receipts: tree!("receipts"),
            receipts_by_epoch: tree!("receipts_by_epoch"),
            epoch_summaries: tree!("epoch_summaries"),
            pin_contracts: tree!("pin_contracts"),
            citation_edges: tree!("citation_edges"),
            citation_by_target: tree!("citation_by_target"),
            check_results: tree!("check_results"),
            meta: tree!("meta"),
            db,
        })
    }

    pub fn flush(&self) -> Result<(), CoordinatorError> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }

    // ── Event log ────────────────────────────────────────────────────────────

    /// Append a new event and index it. If `event_id` already exists, this
    /// is a no-op and the existing `seq` is returned (idempotent ingest).
    pub fn append_event(&self, event_id: EventId, event: &Event) -> Result<Seq, CoordinatorError> {
        if let Some(existing) = self.get_seq_for_event(event_id)? {
            return Ok(existing);
        }
        let seq = self.next_seq()?;
        let bytes = bincode::serialize(event).map_err(ser_err)?;
        self.events
            .insert(seq.to_be_bytes(), bytes)
            .map_err(storage_err)?;
        self.event_index
            .insert(event_id.as_bytes(), &seq.to_be_bytes())
            .map_err(storage_err)?;

        let mut ref_key = event.reference.as_bytes().to_vec();
        ref_key.extend_from_slice(&seq.to_be_bytes());
        self.event_by_ref.insert(ref_key, &[]).map_err(storage_err)?;

        let mut kind_key = vec![event.kind];
        kind_key.extend_from_slice(&seq.to_be_bytes());
        self.event_by_kind.insert(kind_key, &[]).map_err(storage_err)?;

        Ok(seq)
    }

    pub fn get_seq_for_event(&self, event_id: EventId) -> Result<Option<Seq>, CoordinatorError> {
        match self
            .event_index
            .get(event_id.as_bytes())
            .map_err(storage_err)?
        {
            Some(bytes) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub fn get_event_by_id(&self, event_id: EventId) -> Result<Option<(Seq, Event)>, CoordinatorError> {
        match self.get_seq_for_event(event_id)? {
            Some(seq) => Ok(self.get_event_by_seq(seq)?.map(|e| (seq, e))),
            None => Ok(None),
        }
    }

    pub fn get_event_by_seq(&self, seq: Seq) -> Result<Option<Event>, CoordinatorError> {
        match self.events.get(seq.to_be_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    /// Query the event log newest-first, optionally filtered by `ref_filter`
    /// and/or `kind_filter`, honoring `since` (ms), `limit` and `offset`.
    pub fn query_events(
        &self,
        ref_filter: Option<RefHash>,
        kind_filter: Option<u8>,
        from_filter: Option<PubKey>,
        since: Option<u64>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Event>, CoordinatorError> {
        let mut matched = Vec::new();
        for item in self.events.iter().rev() {
            let (_, bytes) = item.map_err(storage_err)?;
            let event: Event = bincode::deserialize(&bytes).map_err(ser_err)?;
            if let Some(r) = ref_filter {
                if event.reference != r {
                    continue;
                }
            }
            if let Some(k) = kind_filter {
                if event.kind != k {
                    continue;
                }
            }
            if let Some(f) = from_filter {
                if event.from != f {
                    continue;
                }
            }
            if let Some(s) = since {
                if event.ts < s {
                    continue;
                }
            }
            matched.push(event);
        }
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    pub fn count_events(&self) -> u64 {
        self.events.len() as u64
    }

    fn next_seq(&self) -> Result<Seq, CoordinatorError> {
        let key = "next_seq";
        let current = self.get_meta_u64(key)?.unwrap_or(0);
        self.put_meta_u64(key, current + 1)?;
        Ok(current)
    }

    // ── Bounty pools ─────────────────────────────────────────────────────────

    pub fn get_pool(&self, key: RefHash) -> Result<Option<Pool>, CoordinatorError> {
        match self.pools.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    /// Atomically credit `amount` (already net of the protocol fee) and
    /// `gross` (the pre-fee amount, folded into `total_tipped`) into the
    /// pool keyed by `key`, creating it if absent.
    pub fn credit_pool(&self, key: RefHash, amount: Sats, gross: Sats) -> Result<Pool, CoordinatorError> {
        let updated = self
            .pools
            .update_and_fetch(key.as_bytes(), |old| {
                let mut pool: Pool = match old {
                    Some(bytes) => bincode::deserialize(bytes).unwrap_or_else(|_| Pool::new(key)),
                    None => Pool::new(key),
                };
                pool.balance = pool.balance.saturating_add(amount);
                pool.total_tipped = pool.total_tipped.saturating_add(gross);
                Some(bincode::serialize(&pool).expect("pool serialization is infallible"))
            })
            .map_err(storage_err)?
            .ok_or_else(|| CoordinatorError::Other("pool update produced no value".into()))?;
        bincode::deserialize(&updated).map_err(ser_err)
    }

    /// Atomically debit up to `amount` (never below zero); returns the pool
    /// after the debit and the amount actually drained.
    pub fn debit_pool(&self, key: RefHash, amount: Sats) -> Result<(Pool, Sats), CoordinatorError> {
        let mut drained = 0u64;
        let updated = self
            .pools
            .update_and_fetch(key.as_bytes(), |old| {
                let mut pool: Pool = match old {
                    Some(bytes) => bincode::deserialize(bytes).unwrap_or_else(|_| Pool::new(key)),
                    None => Pool::new(key),
                };
                drained = amount.min(pool.balance);
                pool.balance -= drained;
                Some(bincode::serialize(&pool).expect("pool serialization is infallible"))
            })
            .map_err(storage_err)?
            .ok_or_else(|| CoordinatorError::Other("pool update produced no value".into()))?;
        let pool = bincode::deserialize(&updated).map_err(ser_err)?;
        Ok((pool, drained))
    }

    pub fn mark_pool_payout_epoch(&self, key: RefHash, epoch: EpochId) -> Result<(), CoordinatorError> {
        self.pools
            .update_and_fetch(key.as_bytes(), move |old| {
                let mut pool: Pool = match old {
                    Some(bytes) => bincode::deserialize(bytes).unwrap_or_else(|_| Pool::new(key)),
                    None => Pool::new(key),
                };
                pool.last_payout_epoch = Some(epoch);
                Some(bincode::serialize(&pool).expect("pool serialization is infallible"))
            })
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_pools(&self) -> Result<Vec<Pool>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.pools.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    /// Cumulative sats ever credited across all pools, the protocol-wide
    /// volume the founder royalty curve is evaluated against. Returns the
    /// value *before* this credit and advances the counter atomically.
    pub fn bump_protocol_volume(&self, sats: Sats) -> Result<Sats, CoordinatorError> {
        let mut before = 0u64;
        self.meta
            .update_and_fetch("protocol_volume", |old| {
                before = old
                    .map(|b| {
                        let mut arr = [0u8; 8];
                        arr.copy_from_slice(b);
                        u64::from_be_bytes(arr)
                    })
                    .unwrap_or(0);
                Some((before + sats).to_be_bytes().to_vec())
            })
            .map_err(storage_err)?;
        Ok(before)
    }

    pub fn protocol_volume(&self) -> Result<Sats, CoordinatorError> {
        Ok(self.get_meta_u64("protocol_volume")?.unwrap_or(0))
    }

    // ── Hosts ────────────────────────────────────────────────────────────────

    pub fn get_host(&self, pubkey: PubKey) -> Result<Option<Host>, CoordinatorError> {
        match self.hosts.get(pubkey.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_host(&self, host: &Host) -> Result<(), CoordinatorError> {
        let bytes = bincode::serialize(host).map_err(ser_err)?;
        self.hosts
            .insert(host.pubkey.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_hosts(&self) -> Result<Vec<Host>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.hosts.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    pub fn put_host_serve(&self, serve: &HostServe) -> Result<(), CoordinatorError> {
        let mut key = serve.host_pubkey.as_bytes().to_vec();
        key.extend_from_slice(serve.cid.as_bytes());
        let bytes = bincode::serialize(serve).map_err(ser_err)?;
        self.host_serves.insert(key, bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_host_serves_for_host(&self, pubkey: PubKey) -> Result<Vec<HostServe>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.host_serves.scan_prefix(pubkey.as_bytes()) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    pub fn put_check_result(&self, idx: u64, result: &CheckResult) -> Result<(), CoordinatorError> {
        let mut key = result.host_pubkey.as_bytes().to_vec();
        key.extend_from_slice(&result.epoch.to_be_bytes());
        key.extend_from_slice(&idx.to_be_bytes());
        let bytes = bincode::serialize(result).map_err(ser_err)?;
        self.check_results.insert(key, bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_check_results_for_host(
        &self,
        pubkey: PubKey,
        limit: usize,
    ) -> Result<Vec<CheckResult>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.check_results.scan_prefix(pubkey.as_bytes()).rev() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    // ── Receipts ─────────────────────────────────────────────────────────────

    /// Insert a receipt. Returns `false` without mutation if `payment_hash`
    /// already exists (replay protection).
    pub fn put_receipt(&self, receipt: &Receipt) -> Result<bool, CoordinatorError> {
        if self
            .receipts
            .contains_key(receipt.payment_hash.as_bytes())
            .map_err(storage_err)?
        {
            return Ok(false);
        }
        let bytes = bincode::serialize(receipt).map_err(ser_err)?;
        self.receipts
            .insert(receipt.payment_hash.as_bytes(), bytes)
            .map_err(storage_err)?;
        let mut epoch_key = receipt.epoch.to_be_bytes().to_vec();
        epoch_key.extend_from_slice(receipt.payment_hash.as_bytes());
        self.receipts_by_epoch
            .insert(epoch_key, &[])
            .map_err(storage_err)?;
        Ok(true)
    }

    pub fn get_receipt(&self, payment_hash: PaymentHash) -> Result<Option<Receipt>, CoordinatorError> {
        match self
            .receipts
            .get(payment_hash.as_bytes())
            .map_err(storage_err)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn iter_receipts_for_epoch(&self, epoch: EpochId) -> Result<Vec<Receipt>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.receipts_by_epoch.scan_prefix(epoch.to_be_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let payment_hash_bytes = &key[8..];
            if let Some(bytes) = self.receipts.get(payment_hash_bytes).map_err(storage_err)? {
                out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
            }
        }
        Ok(out)
    }

    // ── Epoch summaries ──────────────────────────────────────────────────────

    pub fn epoch_has_summary(&self, epoch: EpochId) -> Result<bool, CoordinatorError> {
        Ok(self
            .epoch_summaries
            .scan_prefix(epoch.to_be_bytes())
            .next()
            .is_some())
    }

    pub fn put_epoch_summary_row(&self, row: &EpochSummaryRow) -> Result<(), CoordinatorError> {
        let mut key = row.epoch.to_be_bytes().to_vec();
        key.extend_from_slice(row.host_pubkey.as_bytes());
        key.extend_from_slice(row.cid.as_bytes());
        let bytes = bincode::serialize(row).map_err(ser_err)?;
        self.epoch_summaries.insert(key, bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_epoch_summaries(&self, epoch: EpochId) -> Result<Vec<EpochSummaryRow>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.epoch_summaries.scan_prefix(epoch.to_be_bytes()) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    // ── Pin contracts ────────────────────────────────────────────────────────

    pub fn get_pin(&self, id: RefHash) -> Result<Option<PinContract>, CoordinatorError> {
        match self.pin_contracts.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_pin(&self, pin: &PinContract) -> Result<(), CoordinatorError> {
        let bytes = bincode::serialize(pin).map_err(ser_err)?;
        self.pin_contracts
            .insert(pin.id.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_pins_for_cid(&self, cid: RefHash) -> Result<Vec<PinContract>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.pin_contracts.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let pin: PinContract = bincode::deserialize(&bytes).map_err(ser_err)?;
            if pin.cid == cid {
                out.push(pin);
            }
        }
        Ok(out)
    }

    // ── Citation graph ───────────────────────────────────────────────────────

    pub fn put_citation_edge(&self, idx: u64, edge: &CitationEdge) -> Result<(), CoordinatorError> {
        let mut key = edge.source_event_id.as_bytes().to_vec();
        key.extend_from_slice(&idx.to_be_bytes());
        let bytes = bincode::serialize(edge).map_err(ser_err)?;
        self.citation_edges.insert(key, bytes).map_err(storage_err)?;

        let mut target_key = edge.target_ref.as_bytes().to_vec();
        target_key.extend_from_slice(edge.source_event_id.as_bytes());
        self.citation_by_target
            .insert(target_key, &[])
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_edges_from(&self, event_id: EventId) -> Result<Vec<CitationEdge>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.citation_edges.scan_prefix(event_id.as_bytes()) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    pub fn get_edges_to(&self, target_ref: RefHash) -> Result<Vec<CitationEdge>, CoordinatorError> {
        let mut out = Vec::new();
        for item in self.citation_by_target.scan_prefix(target_ref.as_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let source_event_bytes = &key[32..];
            let mut arr = [0u8; 32];
            arr.copy_from_slice(source_event_bytes);
            for edge_item in self.citation_edges.scan_prefix(&arr) {
                let (_, bytes) = edge_item.map_err(storage_err)?;
                let edge: CitationEdge = bincode::deserialize(&bytes).map_err(ser_err)?;
                if edge.target_ref == target_ref {
                    out.push(edge);
                }
            }
        }
        Ok(out)
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), CoordinatorError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, CoordinatorError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage_err)
    }

    pub fn put_meta_u64(&self, key: &str, value: u64) -> Result<(), CoordinatorError> {
        self.put_meta(key, &value.to_be_bytes())
    }

    pub fn get_meta_u64(&self, key: &str) -> Result<Option<u64>, CoordinatorError> {
        Ok(self.get_meta(key)?.map(|b| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&b);
            u64::from_be_bytes(arr)
        }))
    }

    pub fn genesis_ts_ms(&self) -> Result<Option<u64>, CoordinatorError> {
        self.get_meta_u64("genesis_ts_ms")
    }

    pub fn set_genesis_ts_ms(&self, ts: u64) -> Result<(), CoordinatorError> {
        self.put_meta_u64("genesis_ts_ms", ts)
    }

    pub fn last_settled_epoch(&self) -> Result<Option<EpochId>, CoordinatorError> {
        self.get_meta_u64("last_settled_epoch")
    }

    pub fn set_last_settled_epoch(&self, epoch: EpochId) -> Result<(), CoordinatorError> {
        self.put_meta_u64("last_settled_epoch", epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::constants::EVENT_VERSION;

    fn temp_db() -> StateDb {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!("coordinator-state-test-{}-{}", std::process::id(), n));
        StateDb::open(dir).unwrap()
    }

    fn sample_event() -> Event {
        Event {
            v: EVENT_VERSION,
            kind: 1,
            from: PubKey::from_bytes([1u8; 32]),
            reference: RefHash::from_bytes([2u8; 32]),
            body: vec![],
            sats: 0,
            ts: 0,
            sig: vec![],
            pow_nonce: None,
        }
    }

    #[test]
    fn append_event_is_idempotent() {
        let db = temp_db();
        let event = sample_event();
        let id = EventId::from_bytes([9u8; 32]);
        let seq1 = db.append_event(id, &event).unwrap();
        let seq2 = db.append_event(id, &event).unwrap();
        assert_eq!(seq1, seq2);
        assert_eq!(db.count_events(), 1);
    }

    #[test]
    fn credit_and_debit_pool() {
        let db = temp_db();
        let key = RefHash::from_bytes([3u8; 32]);
        let pool = db.credit_pool(key, 850, 1000).unwrap();
        assert_eq!(pool.balance, 850);
        assert_eq!(pool.total_tipped, 1000);
        let (pool, drained) = db.debit_pool(key, 2000).unwrap();
        assert_eq!(drained, 850);
        assert_eq!(pool.balance, 0);
    }

    #[test]
    fn receipt_replay_protection() {
        let db = temp_db();
        let receipt = Receipt {
            epoch: 1,
            host_pubkey: PubKey::from_bytes([1u8; 32]),
            block_cid: RefHash::from_bytes([2u8; 32]),
            file_root: None,
            asset_root: None,
            client_pubkey: PubKey::from_bytes([3u8; 32]),
            payment_hash: PaymentHash::from_bytes([4u8; 32]),
            response_hash: RefHash::from_bytes([5u8; 32]),
            price_sats: 10,
            nonce: 0,
            pow_hash: [0u8; 32],
            receipt_token: vec![],
            client_sig: vec![],
        };
        assert!(db.put_receipt(&receipt).unwrap());
        assert!(!db.put_receipt(&receipt).unwrap());
    }
}
