use booking_core::{Appointment, BookingRequest, Service};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── API request/response types ──

#[derive(Debug, Deserialize)]
pub struct AvailableTimesQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub service_id: Uuid,
    #[serde(flatten)]
    pub booking: BookingRequest,
}

/// An appointment as shown in the customer's "my appointments" list.
#[derive(Debug, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub upcoming: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub category: String,
}

impl ServiceRequest {
    pub fn into_service(self, id: Uuid) -> Service {
        Service {
            id,
            name: self.name.trim().to_string(),
            description: self.description.unwrap_or_default(),
            price: self.price,
            duration_minutes: self.duration_minutes,
            category: self.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
