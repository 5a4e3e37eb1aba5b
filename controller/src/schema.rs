//! Database schema and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    let version = schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    } else if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Brings a database written by an older release up to [`SCHEMA_VERSION`].
fn migrate(conn: &Connection, from: i32) -> Result<()> {
    info!("migrating database schema from version {from} to {SCHEMA_VERSION}");
    // Every table v1 defines is created with IF NOT EXISTS.
    create_schema_v1(conn)?;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Set-points keyed by the time slot they apply to
        CREATE TABLE IF NOT EXISTS thermostat (
            temperature REAL NOT NULL,
            time_start TEXT NOT NULL,
            time_end TEXT NOT NULL,
            PRIMARY KEY (time_start, time_end)
        );

        CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sensor TEXT NOT NULL,
            recorded_at INTEGER NOT NULL,
            dwell_seconds INTEGER NOT NULL,
            temperature REAL NOT NULL,
            unit TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_samples_sensor_time
            ON samples(sensor, recorded_at);
        "#,
    )?;
    Ok(())
}
