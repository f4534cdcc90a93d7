//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;
use tracing::info;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        info!("applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: readings and medications
///
/// `IF NOT EXISTS` keeps databases written by the older import script usable.
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- BLOOD PRESSURE READINGS
        -- One row per timestamp ("YYYY-MM-DD HH:MM")
        -- ============================================
        CREATE TABLE IF NOT EXISTS blood_pressure_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            datetime TEXT NOT NULL,
            systolic_bp INTEGER,
            diastolic_bp INTEGER,
            heart_rate INTEGER,
            UNIQUE(datetime)
        );

        -- ============================================
        -- MEDICATIONS
        -- Dose events, several may share a timestamp
        -- ============================================
        CREATE TABLE IF NOT EXISTS medications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            datetime TEXT NOT NULL,
            medication_name TEXT NOT NULL,
            dosage REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_medications_datetime ON medications(datetime);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
