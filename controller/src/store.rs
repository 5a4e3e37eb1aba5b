use std::{
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use boiler_common::{
    types::{ALWAYS_ON_END, ALWAYS_ON_START},
    HistoryPoint, HistoryRange, Sample, TemperatureUnit,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    schema,
};

pub trait Persistence: Send + Sync {
    /// The always-on set-point. A default row is created when none exists.
    fn set_point(&self) -> Result<f64>;

    fn set_set_point(&self, temperature: f64, time_start: &str, time_end: &str) -> Result<()>;

    fn save_sample(&self, sensor: &str, sample: &Sample) -> Result<()>;

    /// Samples inside `range` (both ends inclusive), oldest first.
    fn history(&self, sensor: &str, range: &HistoryRange) -> Result<Vec<HistoryPoint>>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
    default_set_point: f64,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P, default_set_point: f64) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
            }
        }

        info!("opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        schema::initialize(&conn)?;

        Ok(Self::with_connection(conn, default_set_point))
    }

    #[cfg(test)]
    pub fn open_in_memory(default_set_point: f64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self::with_connection(conn, default_set_point))
    }

    fn with_connection(conn: Connection, default_set_point: f64) -> Self {
        Self {
            conn: Mutex::new(conn),
            default_set_point,
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Persistence for SqliteStore {
    fn set_point(&self) -> Result<f64> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT temperature FROM thermostat WHERE time_start = ?1 AND time_end = ?2",
                params![ALWAYS_ON_START, ALWAYS_ON_END],
                |row| row.get::<_, f64>(0),
            )
            .optional()?;

        match existing {
            Some(temperature) => Ok(temperature),
            None => {
                conn.execute(
                    "INSERT INTO thermostat (temperature, time_start, time_end) VALUES (?1, ?2, ?3)",
                    params![self.default_set_point, ALWAYS_ON_START, ALWAYS_ON_END],
                )?;
                info!("created default set-point {}", self.default_set_point);
                Ok(self.default_set_point)
            }
        }
    }

    fn set_set_point(&self, temperature: f64, time_start: &str, time_end: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO thermostat (temperature, time_start, time_end) VALUES (?1, ?2, ?3)
             ON CONFLICT(time_start, time_end) DO UPDATE SET temperature = excluded.temperature",
            params![temperature, time_start, time_end],
        )?;
        debug!("set-point for {time_start}-{time_end} is now {temperature}");
        Ok(())
    }

    fn save_sample(&self, sensor: &str, sample: &Sample) -> Result<()> {
        let dwell_seconds = i64::try_from(sample.dwell_seconds).unwrap_or(i64::MAX);
        self.conn().execute(
            "INSERT INTO samples (sensor, recorded_at, dwell_seconds, temperature, unit)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sensor,
                sample.recorded_at.timestamp(),
                dwell_seconds,
                sample.temperature,
                sample.unit.as_str()
            ],
        )?;
        Ok(())
    }

    fn history(&self, sensor: &str, range: &HistoryRange) -> Result<Vec<HistoryPoint>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT recorded_at, temperature, unit FROM samples
             WHERE sensor = ?1 AND recorded_at >= ?2 AND recorded_at <= ?3
             ORDER BY recorded_at ASC, id ASC",
        )?;

        let points = stmt
            .query_map(
                params![sensor, range.start.timestamp(), range.end.timestamp()],
                |row| {
                    Ok(HistoryPoint {
                        datetime: row.get(0)?,
                        temperature: row.get(1)?,
                        unit: TemperatureUnit::from_setting(&row.get::<_, String>(2)?),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(points)
    }
}
