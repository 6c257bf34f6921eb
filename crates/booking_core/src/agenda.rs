//! Views over an appointment list used by the staff dashboard and the
//! customer lookup.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::Appointment;

/// Appointments on `date`, earliest first.
pub fn appointments_on(appointments: &[Appointment], date: NaiveDate) -> Vec<Appointment> {
    let mut day: Vec<Appointment> = appointments
        .iter()
        .filter(|a| a.date == date)
        .cloned()
        .collect();
    day.sort_by_key(|a| a.time);
    day
}

/// Latest date first, and latest time first within a date.
pub fn newest_first(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| b.starts_at().cmp(&a.starts_at()));
    appointments
}

pub fn upcoming_flags(appointments: Vec<Appointment>, now: NaiveDateTime) -> Vec<(Appointment, bool)> {
    appointments
        .into_iter()
        .map(|a| {
            let upcoming = a.is_upcoming(now);
            (a, upcoming)
        })
        .collect()
}
