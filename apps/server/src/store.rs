//! SQLite adapter for the core `Store` port.
//!
//! Columns are snake_case; dates and times are kept as `YYYY-MM-DD` / `HH:MM`
//! text so the unique (date, time) index compares exactly what the core compares.

use async_trait::async_trait;
use booking_core::clock;
use booking_core::{Appointment, Service, ShopConfig, Store, StoreError, StoreResult, ThemeColors};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ── Records ──

#[derive(FromRow)]
struct ConfigRecord {
    name: String,
    logo: Option<String>,
    opening_time: String,
    closing_time: String,
    working_days: String,
    theme_primary: String,
    theme_secondary: String,
    theme_accent: String,
}

impl ConfigRecord {
    fn into_domain(self) -> StoreResult<ShopConfig> {
        Ok(ShopConfig {
            name: self.name,
            logo: self.logo,
            opening_time: clock::parse_time(&self.opening_time).map_err(corrupt)?,
            closing_time: clock::parse_time(&self.closing_time).map_err(corrupt)?,
            working_days: serde_json::from_str(&self.working_days).map_err(corrupt)?,
            theme_colors: ThemeColors {
                primary: self.theme_primary,
                secondary: self.theme_secondary,
                accent: self.theme_accent,
            },
        })
    }
}

#[derive(FromRow)]
struct ServiceRecord {
    id: String,
    name: String,
    description: String,
    price: String,
    duration_minutes: i64,
    category: String,
}

impl ServiceRecord {
    fn into_domain(self) -> StoreResult<Service> {
        Ok(Service {
            id: Uuid::parse_str(&self.id).map_err(corrupt)?,
            name: self.name,
            description: self.description,
            price: self.price.parse::<Decimal>().map_err(corrupt)?,
            duration_minutes: u32::try_from(self.duration_minutes).map_err(corrupt)?,
            category: self.category,
        })
    }
}

#[derive(FromRow)]
struct AppointmentRecord {
    id: String,
    service_id: String,
    service_name: String,
    date: String,
    time: String,
    customer_name: String,
    phone_number: String,
    created_at: DateTime<Utc>,
}

impl AppointmentRecord {
    fn into_domain(self) -> StoreResult<Appointment> {
        Ok(Appointment {
            id: Uuid::parse_str(&self.id).map_err(corrupt)?,
            service_id: Uuid::parse_str(&self.service_id).map_err(corrupt)?,
            service_name: self.service_name,
            date: clock::parse_date(&self.date).map_err(corrupt)?,
            time: clock::parse_time(&self.time).map_err(corrupt)?,
            customer_name: self.customer_name,
            phone_number: self.phone_number,
            created_at: self.created_at,
        })
    }
}

const APPOINTMENT_COLUMNS: &str =
    "id, service_id, service_name, date, time, customer_name, phone_number, created_at";

fn corrupt(e: impl std::fmt::Display) -> StoreError {
    tracing::error!("corrupt row: {}", e);
    StoreError::Unexpected(format!("corrupt row: {e}"))
}

fn db_error(op: &str, e: sqlx::Error) -> StoreError {
    tracing::error!("{}: {}", op, e);
    StoreError::Unexpected(e.to_string())
}

// ── Writes shared with the seed migration ──

pub(crate) async fn write_config<'e>(
    executor: impl SqliteExecutor<'e>,
    config: &ShopConfig,
) -> StoreResult<()> {
    let working_days = serde_json::to_string(&config.working_days).map_err(corrupt)?;
    sqlx::query(
        "INSERT INTO shop_config (id, name, logo, opening_time, closing_time, working_days,
                                  theme_primary, theme_secondary, theme_accent)
         VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            logo = excluded.logo,
            opening_time = excluded.opening_time,
            closing_time = excluded.closing_time,
            working_days = excluded.working_days,
            theme_primary = excluded.theme_primary,
            theme_secondary = excluded.theme_secondary,
            theme_accent = excluded.theme_accent",
    )
    .bind(&config.name)
    .bind(&config.logo)
    .bind(clock::format_time(config.opening_time))
    .bind(clock::format_time(config.closing_time))
    .bind(working_days)
    .bind(&config.theme_colors.primary)
    .bind(&config.theme_colors.secondary)
    .bind(&config.theme_colors.accent)
    .execute(executor)
    .await
    .map_err(|e| db_error("write_config", e))?;
    Ok(())
}

pub(crate) async fn write_service<'e>(
    executor: impl SqliteExecutor<'e>,
    service: &Service,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO services (id, name, description, price, duration_minutes, category)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            price = excluded.price,
            duration_minutes = excluded.duration_minutes,
            category = excluded.category",
    )
    .bind(service.id.to_string())
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.price.to_string())
    .bind(i64::from(service.duration_minutes))
    .bind(&service.category)
    .execute(executor)
    .await
    .map_err(|e| db_error("write_service", e))?;
    Ok(())
}

// ── Port implementation ──

#[async_trait]
impl Store for SqliteStore {
    async fn fetch_config(&self) -> StoreResult<Option<ShopConfig>> {
        let record = sqlx::query_as::<_, ConfigRecord>(
            "SELECT name, logo, opening_time, closing_time, working_days,
                    theme_primary, theme_secondary, theme_accent
             FROM shop_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch_config", e))?;

        record.map(ConfigRecord::into_domain).transpose()
    }

    async fn update_config(&self, config: &ShopConfig) -> StoreResult<()> {
        write_config(&self.pool, config).await
    }

    async fn fetch_services(&self) -> StoreResult<Vec<Service>> {
        sqlx::query_as::<_, ServiceRecord>(
            "SELECT id, name, description, price, duration_minutes, category
             FROM services ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch_services", e))?
        .into_iter()
        .map(ServiceRecord::into_domain)
        .collect()
    }

    async fn upsert_service(&self, service: &Service) -> StoreResult<()> {
        write_service(&self.pool, service).await
    }

    async fn delete_service(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_service", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("service {id}")));
        }
        Ok(())
    }

    async fn fetch_appointments(&self) -> StoreResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY date DESC, time DESC"
        );
        sqlx::query_as::<_, AppointmentRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("fetch_appointments", e))?
            .into_iter()
            .map(AppointmentRecord::into_domain)
            .collect()
    }

    async fn fetch_appointments_by_phone(&self, phone: &str) -> StoreResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE phone_number = ? ORDER BY date DESC, time DESC"
        );
        sqlx::query_as::<_, AppointmentRecord>(&query)
            .bind(phone)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("fetch_appointments_by_phone", e))?
            .into_iter()
            .map(AppointmentRecord::into_domain)
            .collect()
    }

    async fn append_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let date = clock::format_date(appointment.date);
        let time = clock::format_time(appointment.time);
        let result = sqlx::query(
            "INSERT INTO appointments (id, service_id, service_name, date, time,
                                       customer_name, phone_number, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(appointment.id.to_string())
        .bind(appointment.service_id.to_string())
        .bind(&appointment.service_name)
        .bind(&date)
        .bind(&time)
        .bind(&appointment.customer_name)
        .bind(&appointment.phone_number)
        .bind(appointment.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::warn!("slot {} {} already taken", date, time);
                Err(StoreError::SlotTaken(format!("{date} {time}")))
            }
            Err(e) => Err(db_error("append_appointment", e)),
        }
    }

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_appointment", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("appointment {id}")));
        }
        Ok(())
    }
}
