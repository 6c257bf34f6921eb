pub mod admin;
pub mod client;
pub mod health;

use axum::{http::StatusCode, Json};
use booking_core::{AvailabilityError, BookingRejection, ShopConfig, StoreError};

use crate::{models::ApiResponse, AppState};

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub(crate) fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(msg)))
}

/// Store failures keep their detail in the log; the client gets a generic message.
pub(crate) fn store_error(op: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(what) => api_error(StatusCode::NOT_FOUND, format!("Not found: {what}")),
        StoreError::SlotTaken(slot) => api_error(
            StatusCode::CONFLICT,
            format!("The {slot} slot is no longer available"),
        ),
        StoreError::Unexpected(detail) => {
            tracing::error!("{}: {}", op, detail);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

pub(crate) fn rejection(e: BookingRejection) -> ApiError {
    let status = match e {
        BookingRejection::InvalidPhone | BookingRejection::InvalidName => StatusCode::BAD_REQUEST,
        BookingRejection::QuotaExceeded { .. } | BookingRejection::SlotNoLongerAvailable { .. } => {
            StatusCode::CONFLICT
        }
    };
    api_error(status, e.to_string())
}

pub(crate) fn availability_error(e: AvailabilityError) -> ApiError {
    tracing::warn!("shop configuration rejected: {}", e);
    api_error(StatusCode::BAD_REQUEST, e.to_string())
}

/// The stored configuration, or the defaults when none was saved yet.
pub(crate) async fn load_config(state: &AppState) -> Result<ShopConfig, ApiError> {
    let config = state
        .store
        .fetch_config()
        .await
        .map_err(|e| store_error("fetch_config", e))?;
    Ok(config.unwrap_or_default())
}
