//! crates/booking_core/src/ports.rs
//!
//! The persistence contract. The core only ever sees snapshots returned from
//! these calls; how they are stored (and field naming on the wire) is the
//! adapter's business.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Appointment, Service, ShopConfig};

/// Error returned by every store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The store already holds an appointment at this date and time.
    #[error("Slot already taken: {0}")]
    SlotTaken(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // --- Shop configuration ---
    async fn fetch_config(&self) -> StoreResult<Option<ShopConfig>>;

    async fn update_config(&self, config: &ShopConfig) -> StoreResult<()>;

    // --- Services ---
    async fn fetch_services(&self) -> StoreResult<Vec<Service>>;

    /// Inserts the service or replaces the one with the same id.
    async fn upsert_service(&self, service: &Service) -> StoreResult<()>;

    async fn delete_service(&self, id: Uuid) -> StoreResult<()>;

    // --- Appointments ---
    async fn fetch_appointments(&self) -> StoreResult<Vec<Appointment>>;

    async fn fetch_appointments_by_phone(&self, phone: &str) -> StoreResult<Vec<Appointment>>;

    async fn append_appointment(&self, appointment: &Appointment) -> StoreResult<()>;

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()>;
}
