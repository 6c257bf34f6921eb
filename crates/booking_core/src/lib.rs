//! crates/booking_core/src/lib.rs
//!
//! Scheduling core of the barbershop booking service: the domain model, slot
//! availability, booking admission and the persistence port. Nothing in here
//! performs I/O; callers hand in snapshots and get plain values back.

pub mod agenda;
pub mod availability;
pub mod booking;
pub mod clock;
pub mod domain;
pub mod ports;

pub use availability::{
    list_available_dates, list_available_times, AvailabilityError, SchedulingPolicy,
};
pub use booking::{validate_and_build_appointment, BookingRejection, BookingRequest};
pub use clock::TimeParseError;
pub use domain::{Appointment, Service, ServiceError, ShopConfig, ThemeColors, WeekdayError, WorkingDays};
pub use ports::{Store, StoreError, StoreResult};
