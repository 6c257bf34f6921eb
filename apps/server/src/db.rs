use booking_core::{Service, ShopConfig};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Ordered migrations. Each entry runs once and is recorded in `_migrations`.
const MIGRATIONS: &[(&str, &[&str])] = &[
    (
        "001_init",
        &[
            "CREATE TABLE IF NOT EXISTS shop_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                name TEXT NOT NULL,
                logo TEXT,
                opening_time TEXT NOT NULL,
                closing_time TEXT NOT NULL,
                working_days TEXT NOT NULL,
                theme_primary TEXT NOT NULL,
                theme_secondary TEXT NOT NULL,
                theme_accent TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                category TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                service_id TEXT NOT NULL,
                service_name TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        ],
    ),
    (
        "002_indexes",
        &[
            "CREATE INDEX IF NOT EXISTS idx_appointments_phone ON appointments(phone_number)",
            "CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(date)",
        ],
    ),
    // One appointment per slot; a concurrent second insert fails instead of double-booking.
    (
        "003_unique_slot",
        &["CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot ON appointments(date, time)"],
    ),
];

/// Starter catalog: (name, description, price in cents, minutes, category).
const STARTER_SERVICES: &[(&str, &str, i64, u32, &str)] = &[
    ("Corte Clásico", "Corte tradicional con tijera o máquina.", 1500, 30, "Corte"),
    ("Corte y Barba", "Servicio completo de corte y perfilado de barba.", 2500, 45, "Combo"),
    ("Perfilado de Barba", "Mantenimiento y alineación de barba.", 1000, 20, "Barba"),
    ("Tratamiento Capilar", "Hidratación y limpieza profunda.", 2000, 30, "Tratamiento"),
    ("Corte Neils Special", "Corte premium con masaje capilar y vapor.", 3500, 60, "Corte"),
];

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    // Enable WAL mode for better concurrent access
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    for (name, statements) in MIGRATIONS {
        if is_applied(pool, name).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in *statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!("Applied migration: {}", name);
    }

    if !is_applied(pool, "004_seed_defaults").await? {
        seed_defaults(pool).await?;
        tracing::info!("Applied migration: 004_seed_defaults");
    }

    tracing::info!("Database migrations up to date");
    Ok(())
}

async fn is_applied(pool: &SqlitePool, name: &str) -> anyhow::Result<bool> {
    let applied: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(applied)
}

/// Default shop configuration plus the starter service catalog, recorded in
/// the ledger in the same transaction.
async fn seed_defaults(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    crate::store::write_config(&mut *tx, &ShopConfig::default()).await?;

    for (name, description, cents, minutes, category) in STARTER_SERVICES {
        let service = Service {
            id: Uuid::new_v4(),
            name: (*name).into(),
            description: (*description).into(),
            price: Decimal::new(*cents, 2),
            duration_minutes: *minutes,
            category: (*category).into(),
        };
        crate::store::write_service(&mut *tx, &service).await?;
    }

    sqlx::query("INSERT INTO _migrations (name) VALUES ('004_seed_defaults')")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = connect("sqlite::memory:", 1).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
