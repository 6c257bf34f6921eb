//! Server configuration, read once from the environment at startup.
//!
//! `.env` is honoured for local development but skipped under `cfg(test)`.

use booking_core::SchedulingPolicy;
use chrono::{FixedOffset, TimeDelta};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared staff secret. Only a UI gate.
    pub admin_password: String,
    /// Offset of the shop's local calendar from UTC.
    pub shop_offset: FixedOffset,
    pub webapp_url: Option<String>,
    pub policy: SchedulingPolicy,
    pub staff_session: TimeDelta,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or("PORT", lookup("PORT"), 3000u16)?;
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:barber.db?mode=rwc".into());

        let admin_password = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("ADMIN_PASSWORD".into()))?;

        let offset_hours = parse_or("SHOP_UTC_OFFSET_HOURS", lookup("SHOP_UTC_OFFSET_HOURS"), 0i32)?;
        let shop_offset = if (-12..=14).contains(&offset_hours) {
            FixedOffset::east_opt(offset_hours * 3600)
        } else {
            None
        }
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                "SHOP_UTC_OFFSET_HOURS".into(),
                format!("{offset_hours} is outside -12..=14"),
            )
        })?;

        let webapp_url = lookup("WEBAPP_URL").filter(|u| !u.is_empty());

        let lead_hours = parse_or("BOOKING_LEAD_HOURS", lookup("BOOKING_LEAD_HOURS"), 3i64)?;
        let step_minutes = parse_or("SLOT_STEP_MINUTES", lookup("SLOT_STEP_MINUTES"), 60i64)?;
        let horizon_days = parse_or("BOOKING_HORIZON_DAYS", lookup("BOOKING_HORIZON_DAYS"), 14usize)?;
        let policy = SchedulingPolicy::new(
            horizon_days,
            TimeDelta::try_hours(lead_hours).unwrap_or(TimeDelta::MAX),
            TimeDelta::try_minutes(step_minutes).unwrap_or(TimeDelta::MAX),
        )
        .map_err(|e| ConfigError::InvalidValue("scheduling policy".into(), e.to_string()))?;

        let session_hours = parse_or("STAFF_SESSION_HOURS", lookup("STAFF_SESSION_HOURS"), 12i64)?;
        let staff_session = TimeDelta::try_hours(session_hours)
            .filter(|d| *d > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidValue("STAFF_SESSION_HOURS".into(), session_hours.to_string())
            })?;

        Ok(Self {
            host,
            port,
            database_url,
            admin_password,
            shop_offset,
            webapp_url,
            policy,
            staff_session,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.into(), e.to_string())),
        None => Ok(default),
    }
}
