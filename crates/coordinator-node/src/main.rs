//! coordinator-node — the content-availability coordinator's node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Stamp a genesis epoch timestamp if the DB is fresh
//!   3. Build the signer, settlement engine, availability monitor and
//!      (optional) Lightning backend
//!   4. Spawn the epoch scheduler, if enabled
//!   5. Serve the REST API

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use coordinator_availability::AvailabilityMonitor;
use coordinator_core::types::PubKey;
use coordinator_crypto::CoordinatorSigner;
use coordinator_http::AppState;
use coordinator_lightning::{DevBackend, LightningBackend, LndRestBackend};
use coordinator_scheduler::EpochScheduler;
use coordinator_settlement::{EpochClock, SettlementEngine};
use coordinator_state::{PaymentBindingStore, StateDb};

#[derive(Parser, Debug)]
#[command(
    name = "coordinator-node",
    version,
    about = "Content-availability coordinator — bounty ledger, settlement and pin contracts"
)]
struct Args {
    /// Directory for the persistent state database (sled).
    #[arg(long, env = "DATABASE_URL", default_value = "~/.coordinator/data")]
    database_url: PathBuf,

    /// HTTP bind host.
    #[arg(long, env = "COORDINATOR_HOST", default_value = "127.0.0.1")]
    coordinator_host: String,

    /// HTTP bind port.
    #[arg(long, env = "COORDINATOR_PORT", default_value_t = 8080)]
    coordinator_port: u16,

    /// Hex-encoded Ed25519 public keys authorized to sign RECEIPT_SUBMIT
    /// mint tokens (comma-separated). At least one is required to accept
    /// receipts; settlement itself does not depend on this list.
    #[arg(long, env = "MINT_PUBKEYS", value_delimiter = ',')]
    mint_pubkeys: Vec<String>,

    /// Base URL of an `lnd` REST endpoint, e.g. `https://127.0.0.1:8080`. If
    /// unset, the node runs in dev mode: a [`DevBackend`] that settles every
    /// invoice instantly, and events/pins with `sats > 0` skip payment
    /// verification when no backend is attached at all.
    #[arg(long, env = "LND_HOST")]
    lnd_host: Option<String>,

    /// Hex-encoded admin/invoice macaroon for the `lnd` REST endpoint.
    #[arg(long, env = "LND_MACAROON")]
    lnd_macaroon: Option<String>,

    /// Accept the `lnd` node's self-signed TLS certificate.
    #[arg(long, env = "LND_INSECURE_TLS", default_value_t = false)]
    lnd_insecure_tls: bool,

    /// Epoch settlement scheduler poll interval, in seconds. `0` disables
    /// the scheduler; settlement can still be driven via `POST
    /// /epoch/settle`.
    #[arg(long, env = "SCHEDULER_INTERVAL_SECS", default_value_t = 60)]
    scheduler_interval_secs: u64,

    /// Genesis timestamp in unix milliseconds, fixing epoch 0's start. `0`
    /// means "use the current time on first run" — only meaningful for a
    /// fresh database; an existing database keeps its stored value.
    #[arg(long, env = "GENESIS_TS_MS", default_value_t = 0)]
    genesis_ts_ms: u64,

    /// Require proof-of-work on zero-sats events (free writes). Disable
    /// only for local development.
    #[arg(long, env = "REQUIRE_POW", default_value_t = true)]
    require_pow: bool,

    /// Hex-encoded Ed25519 secret key this node signs RECEIPT_SUBMIT and
    /// EPOCH_SUMMARY log entries with. Generated ephemerally if unset — see
    /// the warning in [`load_or_generate_signer`].
    #[arg(long, env = "NODE_SECRET_KEY")]
    node_secret_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coordinator=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("coordinator node starting");

    // ── State database ────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.database_url);
    if let Some(parent) = data_dir.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir {}", parent.display()))?;
    }
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    // ── Genesis epoch anchor ─────────────────────────────────────────────
    let genesis_ts_ms = match db.genesis_ts_ms().context("reading genesis timestamp")? {
        Some(ts) => {
            info!(genesis_ts_ms = ts, "existing database found");
            ts
        }
        None => {
            let ts = if args.genesis_ts_ms > 0 {
                args.genesis_ts_ms
            } else {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64
            };
            info!(genesis_ts_ms = ts, "fresh database — stamping genesis epoch anchor");
            db.set_genesis_ts_ms(ts).context("stamping genesis timestamp")?;
            ts
        }
    };
    let clock = EpochClock::new(genesis_ts_ms);

    // ── Signer ────────────────────────────────────────────────────────────
    let signer = Arc::new(load_or_generate_signer(args.node_secret_key.as_deref())?);
    info!(pubkey = %signer.public_key, "node signing identity");

    // ── Mint pubkeys ──────────────────────────────────────────────────────
    let mint_pubkeys: Vec<PubKey> = args
        .mint_pubkeys
        .iter()
        .map(|s| PubKey::from_hex(s).with_context(|| format!("parsing mint pubkey {s}")))
        .collect::<anyhow::Result<_>>()?;
    if mint_pubkeys.is_empty() {
        warn!("no MINT_PUBKEYS configured — receipt submission will be rejected until set");
    }

    // ── Settlement, availability, payments ────────────────────────────────
    let settlement = Arc::new(SettlementEngine::new(Arc::clone(&db), Some(Arc::clone(&signer))));
    let availability = Arc::new(AvailabilityMonitor::new(Arc::clone(&db)));
    let payments = Arc::new(PaymentBindingStore::new());

    // ── Lightning backend ─────────────────────────────────────────────────
    let lightning: Option<Arc<dyn LightningBackend>> = match &args.lnd_host {
        Some(host) => {
            let macaroon = args
                .lnd_macaroon
                .clone()
                .context("LND_MACAROON is required when LND_HOST is set")?;
            info!(host, "using lnd REST backend");
            Some(Arc::new(LndRestBackend::new(host.clone(), macaroon, args.lnd_insecure_tls)))
        }
        None => {
            warn!("no LND_HOST configured — running with the in-memory dev Lightning backend");
            Some(Arc::new(DevBackend::new()))
        }
    };

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        settlement: Arc::clone(&settlement),
        availability,
        payments,
        clock: clock.clone(),
        lightning,
        system_signer: Some(signer),
        mint_pubkeys,
        require_pow: args.require_pow,
    });

    // ── Epoch scheduler ────────────────────────────────────────────────────
    if args.scheduler_interval_secs > 0 {
        let last_settled = db.last_settled_epoch().context("reading last settled epoch")?;
        let (scheduler, mut handle) = EpochScheduler::new(
            Arc::clone(&settlement),
            clock,
            std::time::Duration::from_secs(args.scheduler_interval_secs),
            last_settled,
        );
        tokio::spawn(scheduler.run());
        tokio::spawn(async move {
            while let Some(result) = handle.results_rx.recv().await {
                match result {
                    Ok(r) if !r.already_settled => {
                        info!(epoch = r.epoch, groups = r.rows.len(), "epoch settled")
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "epoch settlement failed"),
                }
            }
        });
    } else {
        info!("epoch scheduler disabled — drive settlement via POST /epoch/settle");
    }

    // ── HTTP server ────────────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", args.coordinator_host, args.coordinator_port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "node ready");

    axum::serve(listener, coordinator_http::router(state))
        .await
        .context("serving HTTP")?;

    Ok(())
}

/// Load a signing key from `--node-secret-key`, or generate an ephemeral one.
///
/// # Warning
/// Ephemeral keys are **not reproducible** across restarts. A node started
/// without `NODE_SECRET_KEY` will sign RECEIPT_SUBMIT/EPOCH_SUMMARY entries
/// under a key no other node or client can recognize across runs. Only use
/// this for local development and testing.
fn load_or_generate_signer(hex_secret: Option<&str>) -> anyhow::Result<CoordinatorSigner> {
    if let Some(s) = hex_secret {
        let bytes = hex::decode(s).context("decoding NODE_SECRET_KEY as hex")?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("NODE_SECRET_KEY must be 32 bytes"))?;
        return Ok(CoordinatorSigner::from_secret_key(key));
    }
    warn!("no NODE_SECRET_KEY provided. Generating an ephemeral signer — DO NOT USE IN PRODUCTION.");
    Ok(CoordinatorSigner::generate())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
