use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, warn};

use coordinator_core::constants::{
    AVAILABILITY_TRUSTED_THRESHOLD, AVAILABILITY_WINDOW_EPOCHS, HOST_CHECK_HISTORY_LEN,
    SPOT_CHECK_TIMEOUT_SECS,
};
use coordinator_core::error::CoordinatorError;
use coordinator_core::host::{CheckResult, Host, HostStatus};
use coordinator_core::types::{EpochId, PubKey, RefHash};
use coordinator_state::StateDb;

/// Body of a spot-check response. A pass requires both an HTTP-OK status
/// and `verified == true` in the decoded body; a host that merely answers
/// with 200 on every path does not pass.
#[derive(Deserialize)]
struct SpotCheckBody {
    verified: bool,
    #[serde(default)]
    #[allow(dead_code)]
    size: Option<u64>,
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<u64>,
}

/// Probes a host's advertised endpoint for a CID and scores its recent
/// track record. Spot checks never affect settlement directly; they only
/// move a host's `availability_score` and `status`, which the settlement
/// engine reads when weighting rewards.
pub struct AvailabilityMonitor {
    db: Arc<StateDb>,
    http: reqwest::Client,
}

impl AvailabilityMonitor {
    pub fn new(db: Arc<StateDb>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SPOT_CHECK_TIMEOUT_SECS))
            .build()
            .expect("reqwest client config is valid");
        Self { db, http }
    }

    /// Issue a GET request for `cid` against `host`'s endpoint, persist the
    /// result, and recompute the host's rolling score and status. A pass
    /// requires both an HTTP-OK status and a decoded body with
    /// `verified == true` — a host cannot pass by answering 200 on every
    /// route without actually holding the content.
    pub async fn spot_check(
        &self,
        host: &Host,
        cid: RefHash,
        epoch: EpochId,
    ) -> Result<CheckResult, CoordinatorError> {
        let Some(endpoint) = &host.endpoint else {
            let result = CheckResult {
                host_pubkey: host.pubkey,
                cid,
                epoch,
                passed: false,
                latency_ms: 0,
                error: Some("host has no registered endpoint".into()),
            };
            self.record(result.clone())?;
            return Ok(result);
        };

        let url = format!(
            "{}/spot-check/{}",
            endpoint.trim_end_matches('/'),
            cid.to_hex()
        );
        let start = Instant::now();
        let result = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<SpotCheckBody>().await {
                Ok(body) if body.verified => CheckResult {
                    host_pubkey: host.pubkey,
                    cid,
                    epoch,
                    passed: true,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: None,
                },
                Ok(_) => CheckResult {
                    host_pubkey: host.pubkey,
                    cid,
                    epoch,
                    passed: false,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: Some("verified=false".into()),
                },
                Err(e) => CheckResult {
                    host_pubkey: host.pubkey,
                    cid,
                    epoch,
                    passed: false,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: Some(format!("malformed spot-check body: {e}")),
                },
            },
            Ok(resp) => CheckResult {
                host_pubkey: host.pubkey,
                cid,
                epoch,
                passed: false,
                latency_ms: start.elapsed().as_millis() as u64,
                error: Some(format!("unexpected status {}", resp.status())),
            },
            Err(e) => {
                warn!(host = %host.pubkey, error = %e, "spot check request failed");
                CheckResult {
                    host_pubkey: host.pubkey,
                    cid,
                    epoch,
                    passed: false,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                }
            }
        };

        self.record(result.clone())?;
        Ok(result)
    }

    /// Probes every non-terminal host once, each against one random CID
    /// drawn from its own advertised serve set. Hosts with no serve claims
    /// on record are skipped rather than failed — there is nothing to check
    /// yet. Backs `POST /hosts/check`.
    pub async fn check_all(&self, epoch: EpochId) -> Result<Vec<CheckResult>, CoordinatorError> {
        let hosts = self.db.iter_hosts()?;
        let mut results = Vec::new();
        let mut rng = rand::thread_rng();
        for host in hosts {
            if host.status.is_terminal() {
                continue;
            }
            let serves = self.db.get_host_serves_for_host(host.pubkey)?;
            let Some(serve) = serves.choose(&mut rng) else {
                continue;
            };
            results.push(self.spot_check(&host, serve.cid, epoch).await?);
        }
        Ok(results)
    }

    fn record(&self, result: CheckResult) -> Result<(), CoordinatorError> {
        let meta_key = format!("check_idx:{}:{}", result.host_pubkey, result.epoch);
        let idx = self.db.get_meta_u64(&meta_key)?.unwrap_or(0);
        self.db.put_meta_u64(&meta_key, idx + 1)?;
        self.db.put_check_result(idx, &result)?;
        let score = self.rolling_score(result.host_pubkey)?;
        self.apply_score(result.host_pubkey, score)?;
        Ok(())
    }

    /// Average pass ratio over the most recent `AVAILABILITY_WINDOW_EPOCHS`
    /// distinct epochs that have any recorded checks. Epochs with no checks
    /// are skipped rather than counted as failures, so a host's score does
    /// not decay purely from being unchecked.
    fn rolling_score(&self, host_pubkey: PubKey) -> Result<f64, CoordinatorError> {
        let history = self
            .db
            .get_check_results_for_host(host_pubkey, HOST_CHECK_HISTORY_LEN)?;

        let mut by_epoch: HashMap<EpochId, (u64, u64)> = HashMap::new();
        for check in &history {
            let entry = by_epoch.entry(check.epoch).or_insert((0, 0));
            entry.1 += 1;
            if check.passed {
                entry.0 += 1;
            }
        }

        let mut epochs: Vec<EpochId> = by_epoch.keys().copied().collect();
        epochs.sort_unstable_by(|a, b| b.cmp(a));
        epochs.truncate(AVAILABILITY_WINDOW_EPOCHS);

        if epochs.is_empty() {
            return Ok(0.0);
        }
        let ratios: Vec<f64> = epochs
            .iter()
            .map(|e| {
                let (passed, total) = by_epoch[e];
                passed as f64 / total as f64
            })
            .collect();
        Ok(ratios.iter().sum::<f64>() / ratios.len() as f64)
    }

    fn apply_score(&self, host_pubkey: PubKey, score: f64) -> Result<(), CoordinatorError> {
        let Some(mut host) = self.db.get_host(host_pubkey)? else {
            return Ok(());
        };
        if host.status.is_terminal() {
            return Ok(());
        }

        host.availability_score = score;
        host.status = next_status(host.status, score);
        debug!(host = %host_pubkey, score, status = ?host.status, "availability score updated");
        self.db.put_host(&host)
    }
}

/// Status transition rule for a non-terminal host given its freshly
/// recomputed rolling score. Unbonding and Slashed are reached only through
/// explicit host-initiated or operator action, never from a spot check.
fn next_status(current: HostStatus, score: f64) -> HostStatus {
    if current.is_terminal() {
        return current;
    }
    if score == 0.0 {
        return HostStatus::Inactive;
    }
    if score >= AVAILABILITY_TRUSTED_THRESHOLD {
        return HostStatus::Trusted;
    }
    match current {
        HostStatus::Trusted => HostStatus::Degraded,
        HostStatus::Degraded => HostStatus::Degraded,
        HostStatus::Inactive => HostStatus::Inactive,
        HostStatus::Pending => HostStatus::Pending,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_host_stays_pending_below_threshold() {
        assert_eq!(next_status(HostStatus::Pending, 0.3), HostStatus::Pending);
    }

    #[test]
    fn pending_host_promotes_to_trusted() {
        assert_eq!(next_status(HostStatus::Pending, 0.9), HostStatus::Trusted);
    }

    #[test]
    fn trusted_host_degrades_below_threshold() {
        assert_eq!(next_status(HostStatus::Trusted, 0.5), HostStatus::Degraded);
    }

    #[test]
    fn degraded_host_goes_inactive_at_zero() {
        assert_eq!(next_status(HostStatus::Degraded, 0.0), HostStatus::Inactive);
    }

    #[test]
    fn degraded_host_recovers_to_trusted() {
        assert_eq!(next_status(HostStatus::Degraded, 0.8), HostStatus::Trusted);
    }

    #[test]
    fn terminal_statuses_are_left_to_apply_score_guard() {
        assert!(HostStatus::Unbonding.is_terminal());
        assert!(HostStatus::Slashed.is_terminal());
    }

    #[test]
    fn pending_host_goes_inactive_at_zero() {
        assert_eq!(next_status(HostStatus::Pending, 0.0), HostStatus::Inactive);
    }

    #[test]
    fn trusted_host_goes_inactive_at_zero() {
        assert_eq!(next_status(HostStatus::Trusted, 0.0), HostStatus::Inactive);
    }
}
