//! Availability generator: which dates and times a customer may pick.
//!
//! Slots sit on a fixed grid anchored at the opening time (hourly by default)
//! and never stretch with the service duration. A slot is offered when it is
//! at least the lead time ahead of `now` and no appointment holds the same
//! date and time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::clock;
use crate::domain::{Appointment, WorkingDays};

/// Number of offered dates.
pub const DEFAULT_HORIZON_DAYS: usize = 14;
/// Minimum distance between now and the earliest bookable slot.
pub const DEFAULT_LEAD_TIME_HOURS: i64 = 3;
/// Slot grid step.
pub const DEFAULT_SLOT_STEP_MINUTES: i64 = 60;
/// Calendar days scanned per requested date before giving up.
const SCAN_DAYS_PER_DATE: usize = 7;
/// Longest booking horizon a policy accepts.
pub const MAX_HORIZON_DAYS: usize = 366;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("no working days configured")]
    NoWorkingDays,
    #[error("opening time {opening} must be before closing time {closing}")]
    InvalidHours { opening: String, closing: String },
    #[error("invalid scheduling policy: {0}")]
    InvalidPolicy(&'static str),
}

impl AvailabilityError {
    pub fn invalid_hours(opening: NaiveTime, closing: NaiveTime) -> Self {
        Self::InvalidHours {
            opening: clock::format_time(opening),
            closing: clock::format_time(closing),
        }
    }
}

/// Booking horizon, lead time and slot step used by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    horizon_days: usize,
    lead_time: TimeDelta,
    slot_step: TimeDelta,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            lead_time: TimeDelta::hours(DEFAULT_LEAD_TIME_HOURS),
            slot_step: TimeDelta::minutes(DEFAULT_SLOT_STEP_MINUTES),
        }
    }
}

impl SchedulingPolicy {
    pub fn new(
        horizon_days: usize,
        lead_time: TimeDelta,
        slot_step: TimeDelta,
    ) -> Result<Self, AvailabilityError> {
        if horizon_days == 0 {
            return Err(AvailabilityError::InvalidPolicy("horizon must be at least one day"));
        }
        if horizon_days > MAX_HORIZON_DAYS {
            return Err(AvailabilityError::InvalidPolicy("horizon cannot exceed a year"));
        }
        if lead_time < TimeDelta::zero() {
            return Err(AvailabilityError::InvalidPolicy("lead time cannot be negative"));
        }
        if slot_step <= TimeDelta::zero() {
            return Err(AvailabilityError::InvalidPolicy("slot step must be positive"));
        }
        Ok(Self {
            horizon_days,
            lead_time,
            slot_step,
        })
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    pub fn lead_time(&self) -> TimeDelta {
        self.lead_time
    }

    pub fn slot_step(&self) -> TimeDelta {
        self.slot_step
    }

    /// Working dates from `today` onward, ascending, at most `horizon_days` of them.
    ///
    /// The walk is capped at seven calendar days per requested date, which a
    /// non-empty weekday set always satisfies.
    pub fn available_dates(
        &self,
        working_days: &WorkingDays,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        if working_days.is_empty() {
            return Err(AvailabilityError::NoWorkingDays);
        }

        let scan_limit = self.horizon_days.saturating_mul(SCAN_DAYS_PER_DATE);
        let dates: Vec<NaiveDate> = today
            .iter_days()
            .take(scan_limit)
            .filter(|day| working_days.contains(*day))
            .take(self.horizon_days)
            .collect();

        if dates.len() < self.horizon_days {
            tracing::debug!(
                found = dates.len(),
                wanted = self.horizon_days,
                "calendar ran out before the booking horizon was filled"
            );
        }
        Ok(dates)
    }

    /// Open slots on `date` between opening (inclusive) and closing (exclusive).
    pub fn available_times(
        &self,
        date: NaiveDate,
        opening: NaiveTime,
        closing: NaiveTime,
        existing: &[Appointment],
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveTime>, AvailabilityError> {
        if opening >= closing {
            return Err(AvailabilityError::invalid_hours(opening, closing));
        }

        let earliest = now
            .checked_add_signed(self.lead_time)
            .unwrap_or(NaiveDateTime::MAX);
        let end = date.and_time(closing);
        let mut cursor = date.and_time(opening);
        let mut slots = Vec::new();

        while cursor < end {
            let time = cursor.time();
            let too_early = cursor < earliest;
            let taken = existing.iter().any(|a| a.occupies(date, time));
            if !too_early && !taken {
                slots.push(time);
            }
            cursor = match cursor.checked_add_signed(self.slot_step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(slots)
    }
}

/// Offered dates under the default policy.
pub fn list_available_dates(
    working_days: &WorkingDays,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, AvailabilityError> {
    SchedulingPolicy::default().available_dates(working_days, today)
}

/// Offered times on `date` under the default policy.
pub fn list_available_times(
    date: NaiveDate,
    opening: NaiveTime,
    closing: NaiveTime,
    existing: &[Appointment],
    now: NaiveDateTime,
) -> Result<Vec<NaiveTime>, AvailabilityError> {
    SchedulingPolicy::default().available_times(date, opening, closing, existing, now)
}
