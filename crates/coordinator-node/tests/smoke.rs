//! End-to-end smoke test for coordinator-node.
//!
//! Starts a real node process against a scratch sled database, posts a
//! signed FUND event over the REST API, and asserts the bounty pool and
//! event log reflect it.
//!
//! Run with:
//!   cargo test -p coordinator-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use coordinator_core::types::EventId;
use coordinator_crypto::{canonical_encode, event_id_from_body, CoordinatorSigner};

// ── Node lifecycle ────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Poll `/health` until the server responds or the timeout elapses.
async fn wait_for_ready(client: &reqwest::Client, base_url: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    false
}

// ── Event builder ─────────────────────────────────────────────────────────

/// Signing-body shape mirrored from `coordinator_core::event::EventBody`,
/// owned rather than by-reference so the test doesn't need a live `Event`
/// to hash and sign.
#[derive(serde::Serialize)]
struct SigningBody<'a> {
    v: u8,
    kind: u8,
    from: &'a coordinator_core::types::PubKey,
    #[serde(rename = "ref")]
    reference: &'a coordinator_core::types::RefHash,
    body: &'a [u8],
    sats: u64,
    ts: u64,
}

fn build_fund_event(
    signer: &CoordinatorSigner,
    cid: coordinator_core::types::RefHash,
    sats: u64,
) -> (serde_json::Value, EventId) {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    let body: &[u8] = b"";
    let signing = SigningBody {
        v: 1,
        kind: 0x01, // EVENT_KIND_FUND
        from: &signer.public_key,
        reference: &cid,
        body,
        sats,
        ts,
    };
    let preimage = canonical_encode(&signing).expect("canonical encode");
    let sig = signer.sign(&preimage);
    let event_id = event_id_from_body(&signing).expect("event id");

    let json = serde_json::json!({
        "v": 1,
        "kind": 0x01,
        "from": signer.public_key.to_hex(),
        "ref": cid.to_hex(),
        "body": hex::encode(body),
        "sats": sats,
        "ts": ts,
        "sig": hex::encode(sig),
        "pow_nonce": null,
    });
    (json, event_id)
}

// ── Smoke test ────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_fund_event_credits_pool() {
    let data_dir = std::env::temp_dir().join(format!("coordinator_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let port = free_port();
    let base_url = format!("http://127.0.0.1:{port}");

    let node_bin = env!("CARGO_BIN_EXE_coordinator-node");
    let child = Command::new(node_bin)
        .args([
            "--database-url",
            data_dir.join("state").to_str().unwrap(),
            "--coordinator-host",
            "127.0.0.1",
            "--coordinator-port",
            &port.to_string(),
            "--scheduler-interval-secs",
            "0",
            "--require-pow",
            "false",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn coordinator-node");

    let _guard = NodeGuard { child, data_dir };

    let http = reqwest::Client::new();
    assert!(
        wait_for_ready(&http, &base_url, Duration::from_secs(20)).await,
        "coordinator-node did not become ready within 20 seconds"
    );

    let funder = CoordinatorSigner::generate();
    let cid = coordinator_core::types::RefHash::from_bytes([0x42; 32]);
    let sats = 5_000u64;
    let (event, event_id) = build_fund_event(&funder, cid, sats);

    // A real Lightning-gated write needs an invoice bound to the event's
    // hash before the event itself is accepted.
    let payreq_resp = http
        .post(format!("{base_url}/payreq"))
        .json(&serde_json::json!({ "sats": sats, "event_hash": event_id.to_hex() }))
        .send()
        .await
        .expect("POST /payreq failed");
    assert!(payreq_resp.status().is_success());

    let resp = http
        .post(format!("{base_url}/event"))
        .json(&event)
        .send()
        .await
        .expect("POST /event failed");
    assert!(resp.status().is_success(), "unexpected status: {}", resp.status());
    let ingest: serde_json::Value = resp.json().await.expect("parse ingest response");
    assert!(ingest["ok"].as_bool().unwrap_or(false));

    // First-ever credit happens at zero cumulative protocol volume, so the
    // founder royalty rate is exactly R0 = 15%.
    let expected_fee = ((sats as f64) * 0.15).floor() as u64;
    let expected_net = sats - expected_fee;
    assert_eq!(ingest["pool_credit"].as_u64(), Some(expected_net));
    assert_eq!(ingest["protocol_fee"].as_u64(), Some(expected_fee));

    // Re-posting the identical event is idempotent: same seq, no double credit.
    let resp2 = http
        .post(format!("{base_url}/event"))
        .json(&event)
        .send()
        .await
        .expect("POST /event (retry) failed");
    assert!(resp2.status().is_success());
    let ingest2: serde_json::Value = resp2.json().await.expect("parse retry response");
    assert_eq!(ingest2["seq"], ingest["seq"], "duplicate ingest should return the original seq");

    let feed = http
        .get(format!("{base_url}/feed/funded?min_balance=1"))
        .send()
        .await
        .expect("GET /feed/funded failed");
    assert!(feed.status().is_success());
    let entries: serde_json::Value = feed.json().await.expect("parse feed");
    let entry = entries
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["reference"] == cid.to_hex())
        .expect("funded cid should appear in the feed");
    assert_eq!(entry["balance"].as_u64(), Some(expected_net));
}
