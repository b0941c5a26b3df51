use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use coordinator_core::constants::*;
use coordinator_core::error::CoordinatorError;
use coordinator_core::event::{Event, EventBody};
use coordinator_core::receipt::{EpochSummaryRow, EpochSummaryTotals, SettlementResult};
use coordinator_core::types::{EpochId, EventId, PubKey, RefHash, Sats};
use coordinator_crypto::{canonical_encode, event_id_from_body, CoordinatorSigner};
use coordinator_state::StateDb;

use crate::royalty::split_with_royalty;

#[derive(Clone, Debug, Default)]
struct Group {
    host_pubkey: PubKey,
    cid: RefHash,
    receipt_count: u64,
    unique_clients: HashSet<PubKey>,
    total_proven_sats: Sats,
}

/// Computes per-`(host, cid)` settlement rewards for a closed epoch,
/// draining bounty pools, crediting the auto-bid flywheel back into them,
/// and persisting one summary row per group. Idempotent: settling the same
/// epoch twice is a no-op the second time.
pub struct SettlementEngine {
    db: Arc<StateDb>,
    /// Signs the EPOCH_SUMMARY event appended to the log on success. When
    /// absent (e.g. a read replica), the log append is skipped and only a
    /// warning is logged.
    system_signer: Option<Arc<CoordinatorSigner>>,
}

impl SettlementEngine {
    pub fn new(db: Arc<StateDb>, system_signer: Option<Arc<CoordinatorSigner>>) -> Self {
        Self { db, system_signer }
    }

    pub fn settle_epoch(&self, epoch: EpochId) -> Result<SettlementResult, CoordinatorError> {
        if self.db.epoch_has_summary(epoch)? {
            return Ok(SettlementResult {
                epoch,
                already_settled: true,
                rows: Vec::new(),
                source_event: None,
            });
        }

        let receipts = self.db.iter_receipts_for_epoch(epoch)?;

        // ── Step 2: group ─────────────────────────────────────────────────────
        let mut groups: HashMap<(PubKey, RefHash), Group> = HashMap::new();
        for receipt in &receipts {
            let cid = receipt.cid();
            let key = (receipt.host_pubkey, cid);
            let group = groups.entry(key).or_insert_with(|| Group {
                host_pubkey: receipt.host_pubkey,
                cid,
                ..Default::default()
            });
            group.receipt_count += 1;
            group.unique_clients.insert(receipt.client_pubkey);
            group.total_proven_sats = group.total_proven_sats.saturating_add(receipt.price_sats);
        }

        // ── Step 3/4: eligibility + payout weight ────────────────────────────
        let mut weighted: HashMap<(PubKey, RefHash), f64> = HashMap::new();
        for (key, group) in &groups {
            if group.receipt_count >= 1 && group.total_proven_sats > 0 {
                let unique = group.unique_clients.len().max(1) as f64;
                let weight = (group.total_proven_sats as f64) * (1.0 + unique.log2());
                weighted.insert(*key, weight);
            }
        }

        // Group eligible keys by cid.
        let mut by_cid: HashMap<RefHash, Vec<(PubKey, RefHash)>> = HashMap::new();
        for key in weighted.keys() {
            by_cid.entry(key.1).or_default().push(*key);
        }

        let mut rows = Vec::new();
        let mut total_reward = 0u64;
        let mut total_egress_royalty = 0u64;
        let mut total_auto_bid = 0u64;

        // ── Steps 5–8: per-cid cap, split, royalty, drain ────────────────────
        for (cid, keys) in &by_cid {
            let pool = self.db.get_pool(*cid)?;
            let balance = pool.map(|p| p.balance).unwrap_or(0);

            let mut rewards: HashMap<(PubKey, RefHash), Sats> = HashMap::new();
            let mut egress_royalty = 0u64;

            if balance > 0 {
                let cid_cap = ((balance as f64) * CID_EPOCH_CAP_PCT).floor() as Sats;
                let agg_fee = ((cid_cap as f64) * AGGREGATOR_FEE_PCT).floor() as Sats;
                let distributable = cid_cap.saturating_sub(agg_fee);

                let scores: HashMap<(PubKey, RefHash), f64> = keys
                    .iter()
                    .map(|key| {
                        let host = self.db.get_host(key.0).ok().flatten();
                        let uptime = host.map(|h| h.availability_score).unwrap_or(DEFAULT_UPTIME_RATIO);
                        (*key, weighted[key] * uptime)
                    })
                    .collect();
                let total_score: f64 = scores.values().sum();

                if total_score > 0.0 {
                    for key in keys {
                        let reward = ((distributable as f64) * scores[key] / total_score).floor() as Sats;
                        rewards.insert(*key, reward);
                    }
                }

                let total_proven: u64 = keys.iter().map(|k| groups[k].total_proven_sats).sum();
                egress_royalty = ((total_proven as f64) * EGRESS_ROYALTY_PCT).floor() as Sats;

                let drain_requested = rewards.values().sum::<u64>() + agg_fee + egress_royalty;
                let (_, actual_drain) = self.db.debit_pool(*cid, drain_requested)?;
                self.db.mark_pool_payout_epoch(*cid, epoch)?;
                drain_pins(&self.db, *cid, actual_drain)?;

                total_egress_royalty += egress_royalty;
            }

            for key in keys {
                let group = &groups[key];
                let reward = rewards.get(key).copied().unwrap_or(0);
                total_reward += reward;
                let row = EpochSummaryRow {
                    epoch,
                    host_pubkey: key.0,
                    cid: key.1,
                    receipt_count: group.receipt_count,
                    unique_clients: group.unique_clients.len() as u64,
                    reward_sats: reward,
                    auto_bid_sats: 0,
                    egress_royalty_sats: if rewards.is_empty() { 0 } else { egress_royalty / keys.len().max(1) as u64 },
                };
                rows.push(row);
            }
        }

        // Ineligible groups (receipt_count == 0 is impossible by construction,
        // but total_proven_sats == 0 groups still get a zero-valued row).
        for (key, group) in &groups {
            if !weighted.contains_key(key) {
                rows.push(EpochSummaryRow {
                    epoch,
                    host_pubkey: key.0,
                    cid: key.1,
                    receipt_count: group.receipt_count,
                    unique_clients: group.unique_clients.len() as u64,
                    reward_sats: 0,
                    auto_bid_sats: 0,
                    egress_royalty_sats: 0,
                });
            }
        }

        // ── Step 9: auto-bid reinvestment, independent of eligibility ────────
        let mut by_cid_all: HashMap<RefHash, Sats> = HashMap::new();
        for group in groups.values() {
            *by_cid_all.entry(group.cid).or_insert(0) += group.total_proven_sats;
        }
        for (cid, total_proven) in by_cid_all {
            let auto_bid = ((total_proven as f64) * AUTO_BID_PCT).floor() as Sats;
            if auto_bid == 0 {
                continue;
            }
            let volume_before = self.db.bump_protocol_volume(auto_bid)?;
            let (fee, net) = split_with_royalty(auto_bid, volume_before);
            self.db.credit_pool(cid, net, auto_bid)?;
            total_auto_bid += auto_bid;
            for row in rows.iter_mut() {
                if row.cid == cid {
                    row.auto_bid_sats += auto_bid / by_cid.get(&cid).map(|v| v.len() as u64).unwrap_or(1).max(1);
                }
            }
            let _ = fee; // protocol fee accrues implicitly to the pool's complement
        }

        for row in &rows {
            self.db.put_epoch_summary_row(row)?;
        }
        self.db.set_last_settled_epoch(epoch)?;

        let totals = EpochSummaryTotals {
            epoch,
            groups_settled: rows.len() as u64,
            total_reward_sats: total_reward,
            total_auto_bid_sats: total_auto_bid,
            total_egress_royalty_sats: total_egress_royalty,
        };
        let source_event = self.append_summary_event(&totals)?;

        info!(epoch, groups = rows.len(), total_reward, "epoch settled");

        Ok(SettlementResult {
            epoch,
            already_settled: false,
            rows,
            source_event,
        })
    }

    fn append_summary_event(
        &self,
        totals: &EpochSummaryTotals,
    ) -> Result<Option<EventId>, CoordinatorError> {
        let Some(signer) = &self.system_signer else {
            warn!("no system signer configured; skipping EPOCH_SUMMARY log append");
            return Ok(None);
        };
        let body = serde_json::to_vec(totals).map_err(|e| CoordinatorError::Serialization(e.to_string()))?;
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let reference = RefHash::ZERO;
        let preimage = EventBody {
            v: EVENT_VERSION,
            kind: EVENT_KIND_EPOCH_SUMMARY,
            from: &signer.public_key,
            reference: &reference,
            body: &body,
            sats: 0,
            ts,
        };
        let preimage_bytes = canonical_encode(&preimage).map_err(|e| CoordinatorError::Serialization(e.to_string()))?;
        let sig = signer.sign(&preimage_bytes);
        let event_id = event_id_from_body(&preimage).map_err(|e| CoordinatorError::Serialization(e.to_string()))?;
        let event = Event {
            v: EVENT_VERSION,
            kind: EVENT_KIND_EPOCH_SUMMARY,
            from: signer.public_key,
            reference,
            body,
            sats: 0,
            ts,
            sig,
            pow_nonce: None,
        };
        self.db.append_event(event_id, &event)?;
        Ok(Some(event_id))
    }
}

fn drain_pins(db: &StateDb, cid: RefHash, actual_drain: Sats) -> Result<(), CoordinatorError> {
    if actual_drain == 0 {
        return Ok(());
    }
    for mut pin in db.iter_pins_for_cid(cid)? {
        if !matches!(pin.status, coordinator_core::pin::PinStatus::Active) {
            continue;
        }
        let take = actual_drain.min(pin.drain_rate).min(pin.remaining_budget);
        pin.remaining_budget -= take;
        if pin.remaining_budget == 0 {
            pin.status = coordinator_core::pin::PinStatus::Exhausted;
        }
        db.put_pin(&pin)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::host::{Host, HostStatus};
    use coordinator_core::receipt::Receipt;
    use coordinator_core::types::PaymentHash;

    fn temp_db() -> Arc<StateDb> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!("coordinator-settlement-test-{}-{}", std::process::id(), n));
        Arc::new(StateDb::open(dir).unwrap())
    }

    fn receipt(host: PubKey, client: PubKey, cid: RefHash, epoch: EpochId, payment_seed: u8, price: u64) -> Receipt {
        Receipt {
            epoch,
            host_pubkey: host,
            block_cid: cid,
            file_root: None,
            asset_root: None,
            client_pubkey: client,
            payment_hash: PaymentHash::from_bytes([payment_seed; 32]),
            response_hash: RefHash::from_bytes([0u8; 32]),
            price_sats: price,
            nonce: 0,
            pow_hash: [0u8; 32],
            receipt_token: vec![],
            client_sig: vec![],
        }
    }

    #[test]
    fn settling_twice_is_idempotent() {
        let db = temp_db();
        let engine = SettlementEngine::new(db.clone(), None);
        let first = engine.settle_epoch(0).unwrap();
        assert!(!first.already_settled);
        let second = engine.settle_epoch(0).unwrap();
        assert!(second.already_settled);
        assert!(second.rows.is_empty());
    }

    #[test]
    fn settlement_arithmetic_matches_example() {
        let db = temp_db();
        let cid = RefHash::from_bytes([0xaa; 32]);
        db.credit_pool(cid, 2500, 2500).unwrap();
        let host = PubKey::from_bytes([0xA; 32]);
        db.put_host(&Host {
            pubkey: host,
            endpoint: None,
            stake: 0,
            status: HostStatus::Trusted,
            min_request_sats: 0,
            sats_per_gb: 0,
            availability_score: 1.0,
            registered_epoch: 0,
            unbond_epoch: None,
        })
        .unwrap();

        for (i, client_seed) in [1u8, 2, 3, 4].iter().enumerate() {
            let client = PubKey::from_bytes([*client_seed; 32]);
            db.put_receipt(&receipt(host, client, cid, 0, (10 + i) as u8, 3))
                .unwrap();
        }
        // 6 receipts total from 4 distinct clients: duplicate two clients.
        db.put_receipt(&receipt(host, PubKey::from_bytes([1u8; 32]), cid, 0, 20, 3))
            .unwrap();
        db.put_receipt(&receipt(host, PubKey::from_bytes([2u8; 32]), cid, 0, 21, 3))
            .unwrap();

        let engine = SettlementEngine::new(db.clone(), None);
        let result = engine.settle_epoch(0).unwrap();
        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.receipt_count, 6);
        assert_eq!(row.unique_clients, 4);

        let cid_cap = (2500.0 * CID_EPOCH_CAP_PCT).floor() as u64;
        let agg_fee = ((cid_cap as f64) * AGGREGATOR_FEE_PCT).floor() as u64;
        assert_eq!(row.reward_sats, cid_cap - agg_fee);

        let second = engine.settle_epoch(0).unwrap();
        assert!(second.already_settled);
    }

    #[test]
    fn zero_score_host_earns_no_reward_share() {
        let db = temp_db();
        let cid = RefHash::from_bytes([0xbb; 32]);
        db.credit_pool(cid, 5000, 5000).unwrap();

        let good_host = PubKey::from_bytes([0x11; 32]);
        let dead_host = PubKey::from_bytes([0x22; 32]);
        db.put_host(&Host {
            pubkey: good_host,
            endpoint: None,
            stake: 0,
            status: HostStatus::Trusted,
            min_request_sats: 0,
            sats_per_gb: 0,
            availability_score: 1.0,
            registered_epoch: 0,
            unbond_epoch: None,
        })
        .unwrap();
        db.put_host(&Host {
            pubkey: dead_host,
            endpoint: None,
            stake: 0,
            status: HostStatus::Inactive,
            min_request_sats: 0,
            sats_per_gb: 0,
            availability_score: 0.0,
            registered_epoch: 0,
            unbond_epoch: None,
        })
        .unwrap();

        for seed in [1u8, 2, 3] {
            let client = PubKey::from_bytes([seed; 32]);
            db.put_receipt(&receipt(good_host, client, cid, 0, seed, 10))
                .unwrap();
            db.put_receipt(&receipt(dead_host, client, cid, 0, seed + 100, 10))
                .unwrap();
        }

        let engine = SettlementEngine::new(db.clone(), None);
        let result = engine.settle_epoch(0).unwrap();
        assert_eq!(result.rows.len(), 2);

        let dead_row = result
            .rows
            .iter()
            .find(|r| r.host_pubkey == dead_host)
            .unwrap();
        let good_row = result
            .rows
            .iter()
            .find(|r| r.host_pubkey == good_host)
            .unwrap();
        assert_eq!(dead_row.reward_sats, 0);
        assert!(good_row.reward_sats > 0);
    }
}
