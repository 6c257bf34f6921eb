use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub db_ok: bool,
    /// False until the seed migration has stored the shop configuration.
    pub config_present: bool,
    pub services: usize,
}

/// GET /api/health: "ok" only when the database answers and the shop can take bookings.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let config_present = matches!(state.store.fetch_config().await, Ok(Some(_)));
    let services = state
        .store
        .fetch_services()
        .await
        .map(|s| s.len())
        .unwrap_or(0);

    let bookable = db_ok && config_present && services > 0;
    if !bookable {
        tracing::warn!(
            db_ok,
            config_present,
            services,
            "health check degraded"
        );
    }

    Json(HealthResponse {
        status: if bookable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        db_ok,
        config_present,
        services,
    })
}
