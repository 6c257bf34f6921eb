mod auth;
mod config;
mod db;
mod handlers;
mod models;
mod rate_limit;
mod store;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use booking_core::Store;
use chrono::{NaiveDateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use config::Settings;
use rate_limit::{
    rate_limit_admin, rate_limit_booking, rate_limit_login, rate_limit_public, RateLimiter,
};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Kept for the health probe; everything else goes through `store`.
    pub db: sqlx::SqlitePool,
    pub settings: Settings,
    pub started_at: Instant,
}

impl AppState {
    /// Wall-clock time on the shop's calendar.
    pub fn shop_now(&self) -> NaiveDateTime {
        Utc::now()
            .with_timezone(&self.settings.shop_offset)
            .naive_local()
    }
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;
const DB_MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    // ── Tracing: console, RUST_LOG overrides the default level ──
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if settings.webapp_url.is_none() {
        tracing::warn!("WEBAPP_URL not set, allowing any CORS origin");
    }

    // ── Database ──
    let pool = db::connect(&settings.database_url, DB_MAX_CONNECTIONS).await?;
    db::run_migrations(&pool).await?;

    let addr = settings.bind_address();
    let state = Arc::new(AppState {
        store: Arc::new(store::SqliteStore::new(pool.clone())),
        db: pool,
        settings,
        started_at: Instant::now(),
    });

    // ── Rate limiter ──
    let rate_limiter = RateLimiter::with_default_tiers();

    // ── Background task: cleanup stale rate limit entries ──
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    let app = build_router(state, rate_limiter)?;

    tracing::info!("Barber booking server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// CORS: whitelist WEBAPP_URL when configured, otherwise allow any origin.
fn build_cors(settings: &Settings) -> anyhow::Result<CorsLayer> {
    let cors = match &settings.webapp_url {
        Some(url) => {
            let origins: Vec<axum::http::HeaderValue> = vec![
                url.parse()?,
                axum::http::HeaderValue::from_static("http://localhost:5173"), // Vite dev server
            ];
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };
    Ok(cors)
}

fn build_router(state: Arc<AppState>, rate_limiter: RateLimiter) -> anyhow::Result<Router> {
    let cors = build_cors(&state.settings)?;

    // 1. No limit: health checks
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    // 2. Public: read-only customer endpoints
    let public_routes = Router::new()
        .route("/api/config", get(handlers::client::get_config))
        .route("/api/services", get(handlers::client::list_services))
        .route("/api/available-dates", get(handlers::client::available_dates))
        .route("/api/available-times", get(handlers::client::available_times))
        .route(
            "/api/appointments/by-phone",
            get(handlers::client::appointments_by_phone),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_public));

    // 3. Booking creation: strictest limit
    let booking_routes = Router::new()
        .route("/api/appointments", post(handlers::client::create_appointment))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_booking));

    // 4. Staff login
    let login_routes = Router::new()
        .route("/api/admin/login", post(handlers::admin::login))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_login));

    // 5. Staff endpoints
    let admin_routes = Router::new()
        .route(
            "/api/admin/appointments",
            get(handlers::admin::list_appointments),
        )
        .route(
            "/api/admin/appointments/today",
            get(handlers::admin::today_appointments),
        )
        .route(
            "/api/admin/appointments/{id}",
            delete(handlers::admin::delete_appointment),
        )
        .route("/api/admin/config", put(handlers::admin::update_config))
        .route(
            "/api/admin/services",
            post(handlers::admin::create_service),
        )
        .route(
            "/api/admin/services/{id}",
            put(handlers::admin::update_service).delete(handlers::admin::delete_service),
        )
        .layer(from_fn_with_state(rate_limiter, rate_limit_admin));

    Ok(Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(booking_routes)
        .merge(login_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
