use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use booking_core::{agenda, Appointment, Service, ShopConfig};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{api_error, availability_error, store_error, ApiError};
use crate::{auth, models::*, AppState};

/// Helper: reject the request unless it carries a valid staff session token.
fn extract_staff(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

    let valid = auth::staff_from_header(
        header,
        &state.settings.admin_password,
        state.settings.staff_session,
        Utc::now(),
    );
    if !valid {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid staff session"));
    }
    Ok(())
}

/// POST /api/admin/login: exchange the shared password for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if !auth::password_matches(&body.password, &state.settings.admin_password) {
        tracing::warn!("Rejected staff login");
        return Err(api_error(StatusCode::UNAUTHORIZED, "Wrong password"));
    }

    let now = Utc::now();
    let token = auth::issue_token(&state.settings.admin_password, now)
        .ok_or_else(|| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))?;

    tracing::info!("Staff session opened");
    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_at: now + state.settings.staff_session,
    })))
}

/// GET /api/admin/appointments: every appointment, newest first.
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    extract_staff(&headers, &state)?;

    let all = state
        .store
        .fetch_appointments()
        .await
        .map_err(|e| store_error("list_appointments", e))?;

    Ok(Json(ApiResponse::success(agenda::newest_first(all))))
}

/// GET /api/admin/appointments/today: the dashboard list for the shop's today, by time.
pub async fn today_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    extract_staff(&headers, &state)?;

    let all = state
        .store
        .fetch_appointments()
        .await
        .map_err(|e| store_error("today_appointments", e))?;
    let today = state.shop_now().date();

    Ok(Json(ApiResponse::success(agenda::appointments_on(&all, today))))
}

/// DELETE /api/admin/appointments/{id}
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    extract_staff(&headers, &state)?;

    state
        .store
        .delete_appointment(id)
        .await
        .map_err(|e| store_error("delete_appointment", e))?;

    tracing::info!("Appointment {} deleted by staff", id);
    Ok(Json(ApiResponse::success(())))
}

/// PUT /api/admin/config: replace the shop configuration.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(config): Json<ShopConfig>,
) -> Result<Json<ApiResponse<ShopConfig>>, ApiError> {
    extract_staff(&headers, &state)?;
    config.validate().map_err(availability_error)?;

    state
        .store
        .update_config(&config)
        .await
        .map_err(|e| store_error("update_config", e))?;

    tracing::info!("Shop configuration updated");
    Ok(Json(ApiResponse::success(config)))
}

/// POST /api/admin/services: add a service to the catalog.
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    extract_staff(&headers, &state)?;

    let service = body.into_service(Uuid::new_v4());
    save_service(&state, service).await
}

/// PUT /api/admin/services/{id}
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    extract_staff(&headers, &state)?;

    let exists = state
        .store
        .fetch_services()
        .await
        .map_err(|e| store_error("update_service", e))?
        .iter()
        .any(|s| s.id == id);
    if !exists {
        return Err(api_error(StatusCode::NOT_FOUND, "Service not found"));
    }

    save_service(&state, body.into_service(id)).await
}

async fn save_service(
    state: &AppState,
    service: Service,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    service
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .store
        .upsert_service(&service)
        .await
        .map_err(|e| store_error("save_service", e))?;

    tracing::info!("Service {} saved ({})", service.id, service.name);
    Ok(Json(ApiResponse::success(service)))
}

/// DELETE /api/admin/services/{id}: existing appointments keep their service name copy.
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    extract_staff(&headers, &state)?;

    state
        .store
        .delete_service(id)
        .await
        .map_err(|e| store_error("delete_service", e))?;

    tracing::info!("Service {} deleted", id);
    Ok(Json(ApiResponse::success(())))
}
