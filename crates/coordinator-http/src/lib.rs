//! coordinator-http
//!
//! REST surface for the content-availability coordinator, served over
//! `axum`. The public surface is REST-with-status-codes rather than
//! JSON-RPC: every endpoint below maps one HTTP route to one handler, and
//! every non-2xx response carries a machine-readable `{error, detail}` body
//! (see `error::AppError`).

pub mod epoch;
pub mod error;
pub mod events;
pub mod feed;
pub mod graph;
pub mod health;
pub mod hosts;
pub mod payreq;
pub mod pins;
pub mod receipts;
pub mod state;
pub mod wire;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the full router, wired to a shared [`AppState`]. Permissive CORS
/// mirrors this codebase's own RPC server: this is a public coordinator
/// endpoint, not an admin surface.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/event", post(events::post_event))
        .route("/events", get(events::get_events))
        .route("/payreq", post(payreq::post_payreq))
        .route("/payreq/:payment_hash", get(payreq::get_payreq_status))
        .route("/receipt/submit", post(receipts::post_receipt_submit))
        .route("/epoch/settle", post(epoch::post_epoch_settle))
        .route("/epoch/summary/:epoch", get(epoch::get_epoch_summary))
        .route("/pin", post(pins::post_pin))
        .route("/pin/:id", get(pins::get_pin))
        .route("/pin/:id/cancel", post(pins::post_pin_cancel))
        .route("/hosts/check", post(hosts::post_hosts_check))
        .route("/hosts/:pubkey/checks", get(hosts::get_host_checks))
        .route("/directory", get(hosts::get_directory))
        .route("/feed/funded", get(feed::get_feed_funded))
        .route("/feed/recent", get(feed::get_feed_recent))
        .route("/thread/:event_id", get(feed::get_thread))
        .route("/graph/:ref", get(graph::get_graph))
        .route("/health", get(health::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
