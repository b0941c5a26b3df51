use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use coordinator_core::error::CoordinatorError;

/// Machine-readable `{error, detail}` body for every non-2xx response. This
/// is the only place a `CoordinatorError` variant is translated to a status
/// code — every lower crate just returns the error, never a status.
pub struct AppError(pub CoordinatorError);

impl From<CoordinatorError> for AppError {
    fn from(e: CoordinatorError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

fn status_and_tag(e: &CoordinatorError) -> (StatusCode, &'static str) {
    use CoordinatorError::*;
    match e {
        UnsupportedVersion(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_version"),
        InvalidKind => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_kind"),
        InvalidFrom => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_from"),
        InvalidRef => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_ref"),
        BodyTooLarge { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "body_too_large"),
        InvalidBody => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_body"),
        InvalidSats => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_sats"),
        InvalidTs => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_ts"),
        PowRequired => (StatusCode::UNPROCESSABLE_ENTITY, "pow_required"),
        InvalidPow => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_pow"),
        SatsMismatch => (StatusCode::UNPROCESSABLE_ENTITY, "sats_mismatch"),

        InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),

        PaymentRequired => (StatusCode::PAYMENT_REQUIRED, "payment_required"),
        PaymentNotSettled => (StatusCode::PAYMENT_REQUIRED, "payment_not_settled"),
        PaymentInsufficient => (StatusCode::PAYMENT_REQUIRED, "payment_insufficient"),

        LndUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "lnd_unavailable"),
        NoMintPubkeysConfigured => (StatusCode::SERVICE_UNAVAILABLE, "no_mint_pubkeys_configured"),

        InvalidReceipt => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_receipt"),
        EpochOutOfRange => (StatusCode::UNPROCESSABLE_ENTITY, "epoch_out_of_range"),
        DuplicateReceipt => (StatusCode::OK, "duplicate_receipt"),

        EpochNotClosed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "epoch_not_closed"),

        PinBudgetTooLow { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "pin_budget_too_low"),
        PinCopiesOutOfRange { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "pin_copies_out_of_range"),
        PinDurationInvalid => (StatusCode::UNPROCESSABLE_ENTITY, "pin_duration_invalid"),
        PinNotFound(_) => (StatusCode::NOT_FOUND, "pin_not_found"),
        PinNotActive => (StatusCode::UNPROCESSABLE_ENTITY, "pin_not_active"),

        PoolNotFound(_) => (StatusCode::NOT_FOUND, "pool_not_found"),
        HostNotFound(_) => (StatusCode::NOT_FOUND, "host_not_found"),
        EventNotFound(_) => (StatusCode::NOT_FOUND, "event_not_found"),

        Serialization(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
        Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, tag) = status_and_tag(&self.0);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: tag,
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
