//! Booking validator: admits or rejects a submitted booking request.
//!
//! Rules run in a fixed order and the first failure wins:
//! daily quota per phone, phone format, name format, then slot occupancy.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::clock::{self, hhmm};
use crate::domain::{Appointment, Service};

/// Appointments one phone number may hold on a single date.
pub const MAX_APPOINTMENTS_PER_DAY: usize = 2;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9 ]+$").expect("valid name regex"));

/// What the customer submitted from the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub customer_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingRejection {
    #[error("at most {max} appointments per day are allowed for this phone number")]
    QuotaExceeded { max: usize },
    #[error("the phone number must be exactly 10 digits")]
    InvalidPhone,
    #[error("the name may only contain letters, digits and spaces")]
    InvalidName,
    #[error("the {date} {time} slot is no longer available")]
    SlotNoLongerAvailable { date: NaiveDate, time: String },
}

impl BookingRejection {
    pub fn slot_taken(date: NaiveDate, time: NaiveTime) -> Self {
        Self::SlotNoLongerAvailable {
            date,
            time: clock::format_time(time),
        }
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Validate `request` against the `existing` snapshot and build the appointment.
///
/// The result is not persisted; the caller appends it to the store and
/// refreshes its snapshot before computing availability again.
pub fn validate_and_build_appointment(
    service: &Service,
    request: &BookingRequest,
    existing: &[Appointment],
    now: DateTime<Utc>,
) -> Result<Appointment, BookingRejection> {
    let name = request.customer_name.trim();
    let phone = request.phone.trim();

    let held_that_day = existing
        .iter()
        .filter(|a| a.phone_number == phone && a.date == request.date)
        .count();
    if held_that_day >= MAX_APPOINTMENTS_PER_DAY {
        return Err(BookingRejection::QuotaExceeded {
            max: MAX_APPOINTMENTS_PER_DAY,
        });
    }

    if !is_valid_phone(phone) {
        return Err(BookingRejection::InvalidPhone);
    }

    if !is_valid_name(name) {
        return Err(BookingRejection::InvalidName);
    }

    if existing.iter().any(|a| a.occupies(request.date, request.time)) {
        return Err(BookingRejection::slot_taken(request.date, request.time));
    }

    Ok(Appointment {
        id: Uuid::new_v4(),
        service_id: service.id,
        service_name: service.name.clone(),
        date: request.date,
        time: request.time,
        customer_name: name.to_string(),
        phone_number: phone.to_string(),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn service() -> Service {
        Service {
            id: Uuid::new_v4(),
            name: "Corte y Barba".into(),
            description: String::new(),
            price: Decimal::new(2500, 2),
            duration_minutes: 45,
            category: "Combo".into(),
        }
    }

    fn request(d: NaiveDate, time: NaiveTime, name: &str, phone: &str) -> BookingRequest {
        BookingRequest {
            date: d,
            time,
            customer_name: name.into(),
            phone: phone.into(),
        }
    }

    fn booked(d: NaiveDate, time: NaiveTime, phone: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "Corte".into(),
            date: d,
            time,
            customer_name: "Juan".into(),
            phone_number: phone.into(),
            created_at: Utc::now(),
        }
    }

    // ── quota ──

    #[test]
    fn test_quota_third_booking_same_day_rejected() {
        let day = date(2024, 6, 10);
        let existing = vec![
            booked(day, hm(10, 0), "0987654321"),
            booked(day, hm(14, 0), "0987654321"),
        ];
        let result = validate_and_build_appointment(
            &service(),
            &request(day, hm(16, 0), "Juan", "0987654321"),
            &existing,
            Utc::now(),
        );
        assert_eq!(result, Err(BookingRejection::QuotaExceeded { max: 2 }));
    }

    #[test]
    fn test_quota_next_day_allowed() {
        let day = date(2024, 6, 10);
        let existing = vec![
            booked(day, hm(10, 0), "0987654321"),
            booked(day, hm(14, 0), "0987654321"),
        ];
        let appt = validate_and_build_appointment(
            &service(),
            &request(date(2024, 6, 11), hm(16, 0), "Juan", "0987654321"),
            &existing,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(appt.date, date(2024, 6, 11));
    }

    #[test]
    fn test_quota_wins_over_format_errors() {
        let day = date(2024, 6, 10);
        let existing = vec![booked(day, hm(10, 0), "12345"), booked(day, hm(11, 0), "12345")];
        let result = validate_and_build_appointment(
            &service(),
            &request(day, hm(12, 0), "John O'Brien", "12345"),
            &existing,
            Utc::now(),
        );
        assert!(matches!(result, Err(BookingRejection::QuotaExceeded { .. })));
    }

    #[test]
    fn test_quota_counts_only_same_phone() {
        let day = date(2024, 6, 10);
        let existing = vec![
            booked(day, hm(10, 0), "1111111111"),
            booked(day, hm(11, 0), "1111111111"),
            booked(day, hm(12, 0), "0987654321"),
        ];
        let result = validate_and_build_appointment(
            &service(),
            &request(day, hm(13, 0), "Juan", "0987654321"),
            &existing,
            Utc::now(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_quota_any_time_or_service() {
        let day = date(2024, 6, 10);
        let existing = vec![
            booked(day, hm(8, 0), "0987654321"),
            booked(day, hm(9, 0), "0987654321"),
        ];
        for hour in 10..20 {
            let result = validate_and_build_appointment(
                &service(),
                &request(day, hm(hour, 0), "Juan", "0987654321"),
                &existing,
                Utc::now(),
            );
            assert_eq!(result, Err(BookingRejection::QuotaExceeded { max: 2 }));
        }
    }

    // ── phone ──

    #[test]
    fn test_phone_too_short() {
        let result = validate_and_build_appointment(
            &service(),
            &request(date(2024, 6, 10), hm(12, 0), "Juan", "12345"),
            &[],
            Utc::now(),
        );
        assert_eq!(result, Err(BookingRejection::InvalidPhone));
    }

    #[test]
    fn test_phone_formats() {
        assert!(is_valid_phone("1234567890"));
        assert!(!is_valid_phone("123456789"));
        assert!(!is_valid_phone("12345678901"));
        assert!(!is_valid_phone("123-456-7890"));
        assert!(!is_valid_phone("+593987654321"));
        assert!(!is_valid_phone("098765432a"));
        assert!(!is_valid_phone("١٢٣٤٥٦٧٨٩٠"));
    }

    // ── name ──

    #[test]
    fn test_name_with_apostrophe() {
        let result = validate_and_build_appointment(
            &service(),
            &request(date(2024, 6, 10), hm(12, 0), "John O'Brien", "1234567890"),
            &[],
            Utc::now(),
        );
        assert_eq!(result, Err(BookingRejection::InvalidName));
    }

    #[test]
    fn test_name_formats() {
        assert!(is_valid_name("Juan 2"));
        assert!(is_valid_name("maria JOSE"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("José"));
        assert!(!is_valid_name("Ana-Maria"));
    }

    #[test]
    fn test_blank_name_rejected_after_trim() {
        let result = validate_and_build_appointment(
            &service(),
            &request(date(2024, 6, 10), hm(12, 0), "   ", "1234567890"),
            &[],
            Utc::now(),
        );
        assert_eq!(result, Err(BookingRejection::InvalidName));
    }

    // ── slot ──

    #[test]
    fn test_occupied_slot_rejected() {
        let day = date(2024, 6, 10);
        let existing = vec![booked(day, hm(15, 0), "1111111111")];
        let result = validate_and_build_appointment(
            &service(),
            &request(day, hm(15, 0), "Juan", "0987654321"),
            &existing,
            Utc::now(),
        );
        assert_eq!(
            result,
            Err(BookingRejection::SlotNoLongerAvailable {
                date: day,
                time: "15:00".into()
            })
        );
    }

    // ── construction ──

    #[test]
    fn test_builds_trimmed_snapshot() {
        let svc = service();
        let now = Utc::now();
        let appt = validate_and_build_appointment(
            &svc,
            &request(date(2024, 6, 10), hm(12, 0), "  Juan 2 ", " 1234567890 "),
            &[],
            now,
        )
        .unwrap();
        assert_eq!(appt.customer_name, "Juan 2");
        assert_eq!(appt.phone_number, "1234567890");
        assert_eq!(appt.service_id, svc.id);
        assert_eq!(appt.service_name, "Corte y Barba");
        assert_eq!(appt.time, hm(12, 0));
        assert_eq!(appt.created_at, now);
    }

    #[test]
    fn test_fresh_ids() {
        let svc = service();
        let req = request(date(2024, 6, 10), hm(12, 0), "Juan", "1234567890");
        let a = validate_and_build_appointment(&svc, &req, &[], Utc::now()).unwrap();
        let b = validate_and_build_appointment(&svc, &req, &[], Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_request_json() {
        let req: BookingRequest = serde_json::from_str(
            r#"{"date":"2024-06-10","time":"16:00","customer_name":"Juan","phone":"0987654321"}"#,
        )
        .unwrap();
        assert_eq!(req.time, hm(16, 0));
        assert!(serde_json::from_str::<BookingRequest>(
            r#"{"date":"2024-06-10","time":"4pm","customer_name":"Juan","phone":"0987654321"}"#
        )
        .is_err());
    }
}
