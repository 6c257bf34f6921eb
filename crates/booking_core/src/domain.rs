//! crates/booking_core/src/domain.rs
//!
//! Shop configuration, services and appointments. These are the snapshots the
//! store hands to the core; none of them know how they are persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::AvailabilityError;
use crate::clock::{self, hhmm};

// ── Working days ──

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeekdayError {
    #[error("weekday ordinal {0} is out of range 0..=6")]
    OutOfRange(u8),
}

/// Set of weekday ordinals (0 = Sunday .. 6 = Saturday) the shop takes bookings on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WorkingDays(BTreeSet<u8>);

impl WorkingDays {
    pub fn new(days: impl IntoIterator<Item = u8>) -> Result<Self, WeekdayError> {
        let mut set = BTreeSet::new();
        for day in days {
            if day > 6 {
                return Err(WeekdayError::OutOfRange(day));
            }
            set.insert(day);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&clock::weekday_ordinal(date))
    }

    pub fn contains_ordinal(&self, ordinal: u8) -> bool {
        self.0.contains(&ordinal)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// Flip one weekday on or off. Returns whether the day is now a working day.
    pub fn toggle(&mut self, ordinal: u8) -> Result<bool, WeekdayError> {
        if ordinal > 6 {
            return Err(WeekdayError::OutOfRange(ordinal));
        }
        if self.0.remove(&ordinal) {
            Ok(false)
        } else {
            self.0.insert(ordinal);
            Ok(true)
        }
    }
}

impl TryFrom<Vec<u8>> for WorkingDays {
    type Error = WeekdayError;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<WorkingDays> for Vec<u8> {
    fn from(days: WorkingDays) -> Self {
        days.0.into_iter().collect()
    }
}

// ── Shop configuration ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: "#000000".into(),
            secondary: "#18181B".into(),
            accent: "#E2E8F0".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    pub name: String,
    /// Data URL or link to the shop logo.
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(with = "hhmm")]
    pub opening_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub closing_time: NaiveTime,
    pub working_days: WorkingDays,
    #[serde(default)]
    pub theme_colors: ThemeColors,
}

impl ShopConfig {
    /// Checks the invariants the availability generator relies on.
    pub fn validate(&self) -> Result<(), AvailabilityError> {
        if self.working_days.is_empty() {
            return Err(AvailabilityError::NoWorkingDays);
        }
        if self.opening_time >= self.closing_time {
            return Err(AvailabilityError::invalid_hours(
                self.opening_time,
                self.closing_time,
            ));
        }
        Ok(())
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: "NEILS BARBER".into(),
            logo: None,
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            closing_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
            working_days: WorkingDays((1..=6).collect()),
            theme_colors: ThemeColors::default(),
        }
    }
}

// ── Services ──

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("service name cannot be empty")]
    EmptyName,
    #[error("service price cannot be negative ({0})")]
    NegativePrice(Decimal),
    #[error("service duration must be at least one minute")]
    ZeroDuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Informational only; slots do not stretch with it.
    pub duration_minutes: u32,
    pub category: String,
}

impl Service {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::EmptyName);
        }
        if self.price < Decimal::ZERO {
            return Err(ServiceError::NegativePrice(self.price));
        }
        if self.duration_minutes == 0 {
            return Err(ServiceError::ZeroDuration);
        }
        Ok(())
    }
}

// ── Appointments ──

/// A confirmed booking. `service_name` is a copy taken at booking time and is
/// never refreshed from the service catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub customer_name: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn occupies(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.date == date && self.time == time
    }

    /// Whether the appointment is still ahead of `now` (shop-local time).
    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.starts_at() > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_working_days_dedup_and_order() {
        let days = WorkingDays::new([5, 1, 1, 3]).unwrap();
        assert_eq!(Vec::<u8>::from(days), vec![1, 3, 5]);
    }

    #[test]
    fn test_working_days_rejects_seven() {
        assert_eq!(WorkingDays::new([1, 7]), Err(WeekdayError::OutOfRange(7)));
    }

    #[test]
    fn test_working_days_contains_date() {
        let days = WorkingDays::new([1]).unwrap();
        assert!(days.contains(date(2024, 6, 10))); // Monday
        assert!(!days.contains(date(2024, 6, 9))); // Sunday
    }

    #[test]
    fn test_working_days_toggle() {
        let mut days = WorkingDays::new([1, 2]).unwrap();
        assert_eq!(days.toggle(2), Ok(false));
        assert_eq!(days.toggle(0), Ok(true));
        assert_eq!(Vec::<u8>::from(days.clone()), vec![0, 1]);
        assert!(days.toggle(9).is_err());
    }

    #[test]
    fn test_working_days_json() {
        let days: WorkingDays = serde_json::from_str("[6,1,2]").unwrap();
        assert_eq!(serde_json::to_string(&days).unwrap(), "[1,2,6]");
        assert!(serde_json::from_str::<WorkingDays>("[8]").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ShopConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.working_days.len(), 6);
        assert!(!config.working_days.contains_ordinal(0));
    }

    #[test]
    fn test_config_rejects_inverted_hours() {
        let config = ShopConfig {
            opening_time: hm(20, 0),
            closing_time: hm(8, 0),
            ..ShopConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AvailabilityError::InvalidHours { .. })
        ));
    }

    #[test]
    fn test_config_rejects_equal_hours() {
        let config = ShopConfig {
            opening_time: hm(9, 0),
            closing_time: hm(9, 0),
            ..ShopConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_no_working_days() {
        let config = ShopConfig {
            working_days: WorkingDays::default(),
            ..ShopConfig::default()
        };
        assert_eq!(config.validate(), Err(AvailabilityError::NoWorkingDays));
    }

    #[test]
    fn test_config_json_shape() {
        let json = serde_json::to_value(ShopConfig::default()).unwrap();
        assert_eq!(json["opening_time"], "08:00");
        assert_eq!(json["closing_time"], "20:00");
        assert_eq!(json["working_days"], serde_json::json!([1, 2, 3, 4, 5, 6]));
    }

    fn service() -> Service {
        Service {
            id: Uuid::new_v4(),
            name: "Corte Clásico".into(),
            description: String::new(),
            price: Decimal::new(1500, 2),
            duration_minutes: 30,
            category: "Corte".into(),
        }
    }

    #[test]
    fn test_service_valid() {
        assert!(service().validate().is_ok());
    }

    #[test]
    fn test_service_free_is_allowed() {
        let s = Service {
            price: Decimal::ZERO,
            ..service()
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_service_negative_price() {
        let s = Service {
            price: Decimal::new(-100, 2),
            ..service()
        };
        assert!(matches!(s.validate(), Err(ServiceError::NegativePrice(_))));
    }

    #[test]
    fn test_service_blank_name() {
        let s = Service {
            name: "   ".into(),
            ..service()
        };
        assert_eq!(s.validate(), Err(ServiceError::EmptyName));
    }

    #[test]
    fn test_service_zero_duration() {
        let s = Service {
            duration_minutes: 0,
            ..service()
        };
        assert_eq!(s.validate(), Err(ServiceError::ZeroDuration));
    }

    fn appointment() -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "Corte".into(),
            date: date(2024, 6, 10),
            time: hm(15, 0),
            customer_name: "Juan".into(),
            phone_number: "0987654321".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_appointment_occupies() {
        let a = appointment();
        assert!(a.occupies(date(2024, 6, 10), hm(15, 0)));
        assert!(!a.occupies(date(2024, 6, 10), hm(16, 0)));
        assert!(!a.occupies(date(2024, 6, 11), hm(15, 0)));
    }

    #[test]
    fn test_appointment_is_upcoming() {
        let a = appointment();
        assert!(a.is_upcoming(date(2024, 6, 10).and_time(hm(14, 59))));
        assert!(!a.is_upcoming(date(2024, 6, 10).and_time(hm(15, 0))));
    }

    #[test]
    fn test_appointment_json_uses_hhmm() {
        let json = serde_json::to_value(appointment()).unwrap();
        assert_eq!(json["time"], "15:00");
        assert_eq!(json["date"], "2024-06-10");
    }
}
