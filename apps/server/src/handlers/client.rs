use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use booking_core::{
    agenda, booking, clock, validate_and_build_appointment, Appointment, BookingRejection,
    Service, ShopConfig,
};
use chrono::Utc;
use std::sync::Arc;

use super::{api_error, availability_error, load_config, rejection, store_error, ApiError};
use crate::{models::*, AppState};

// ── Endpoints ──

/// GET /api/config: shop name, hours, working days and theme.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ShopConfig>>, ApiError> {
    let config = load_config(&state).await?;
    Ok(Json(ApiResponse::success(config)))
}

/// GET /api/services: the service catalog in display order.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Service>>>, ApiError> {
    let services = state
        .store
        .fetch_services()
        .await
        .map_err(|e| store_error("list_services", e))?;
    Ok(Json(ApiResponse::success(services)))
}

/// GET /api/available-dates: the next working dates, starting with the shop's today.
pub async fn available_dates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let config = load_config(&state).await?;
    let today = state.shop_now().date();

    let dates = state
        .settings
        .policy
        .available_dates(&config.working_days, today)
        .map_err(availability_error)?;

    Ok(Json(ApiResponse::success(
        dates.into_iter().map(clock::format_date).collect(),
    )))
}

/// GET /api/available-times?date=YYYY-MM-DD: open `HH:MM` slots on that date.
pub async fn available_times(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let date = clock::parse_date(query.date.trim())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let config = load_config(&state).await?;
    let existing = state
        .store
        .fetch_appointments()
        .await
        .map_err(|e| store_error("available_times", e))?;

    let times = state
        .settings
        .policy
        .available_times(
            date,
            config.opening_time,
            config.closing_time,
            &existing,
            state.shop_now(),
        )
        .map_err(availability_error)?;

    Ok(Json(ApiResponse::success(
        times.into_iter().map(clock::format_time).collect(),
    )))
}

/// POST /api/appointments: book an offered slot.
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let services = state
        .store
        .fetch_services()
        .await
        .map_err(|e| store_error("create_appointment", e))?;
    let service = services
        .into_iter()
        .find(|s| s.id == body.service_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Service not found"))?;

    let config = load_config(&state).await?;
    let existing = state
        .store
        .fetch_appointments()
        .await
        .map_err(|e| store_error("create_appointment", e))?;

    let appointment = validate_and_build_appointment(&service, &body.booking, &existing, Utc::now())
        .map_err(|e| {
            tracing::info!("booking rejected: {}", e);
            rejection(e)
        })?;

    // An admitted request still has to name a slot the availability screens offer right now.
    let now = state.shop_now();
    let policy = &state.settings.policy;
    let offered_dates = policy
        .available_dates(&config.working_days, now.date())
        .map_err(availability_error)?;
    let offered_times = policy
        .available_times(
            appointment.date,
            config.opening_time,
            config.closing_time,
            &existing,
            now,
        )
        .map_err(availability_error)?;
    if !offered_dates.contains(&appointment.date) || !offered_times.contains(&appointment.time) {
        return Err(rejection(BookingRejection::slot_taken(
            appointment.date,
            appointment.time,
        )));
    }

    state
        .store
        .append_appointment(&appointment)
        .await
        .map_err(|e| match e {
            booking_core::StoreError::SlotTaken(_) => {
                rejection(BookingRejection::slot_taken(appointment.date, appointment.time))
            }
            other => store_error("create_appointment", other),
        })?;

    tracing::info!(
        "Appointment {} booked: {} {} ({})",
        appointment.id,
        clock::format_date(appointment.date),
        clock::format_time(appointment.time),
        appointment.service_name
    );

    Ok(Json(ApiResponse::success(appointment)))
}

/// GET /api/appointments/by-phone?phone=NNNNNNNNNN: the customer's appointments, newest first.
pub async fn appointments_by_phone(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<ApiResponse<Vec<AppointmentView>>>, ApiError> {
    let phone = query.phone.trim();
    if !booking::is_valid_phone(phone) {
        return Err(rejection(BookingRejection::InvalidPhone));
    }

    let found = state
        .store
        .fetch_appointments_by_phone(phone)
        .await
        .map_err(|e| store_error("appointments_by_phone", e))?;

    let views = agenda::upcoming_flags(agenda::newest_first(found), state.shop_now())
        .into_iter()
        .map(|(appointment, upcoming)| AppointmentView {
            appointment,
            upcoming,
        })
        .collect();

    Ok(Json(ApiResponse::success(views)))
}
