//! Blood pressure reading model
//!
//! One row of `blood_pressure_readings`: a timestamped systolic/diastolic/heart
//! rate observation. Any of the three values may be missing, but never all.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Wire form used by the data API: `[datetime, systolic, diastolic, heart_rate]`
pub type ReadingRow = (String, Option<i32>, Option<i32>, Option<i32>);

/// A blood pressure reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressureReading {
    pub datetime: String,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
}

impl BloodPressureReading {
    pub fn new(
        datetime: impl Into<String>,
        systolic: Option<i32>,
        diastolic: Option<i32>,
        heart_rate: Option<i32>,
    ) -> Self {
        Self {
            datetime: datetime.into(),
            systolic,
            diastolic,
            heart_rate,
        }
    }

    /// True when none of the three measurements is present
    pub fn is_blank(&self) -> bool {
        self.systolic.is_none() && self.diastolic.is_none() && self.heart_rate.is_none()
    }

    /// Calendar-date part of the timestamp
    pub fn date(&self) -> &str {
        self.datetime.split_whitespace().next().unwrap_or(&self.datetime)
    }

    pub fn into_row(self) -> ReadingRow {
        (self.datetime, self.systolic, self.diastolic, self.heart_rate)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            datetime: row.get("datetime")?,
            systolic: row.get("systolic_bp")?,
            diastolic: row.get("diastolic_bp")?,
            heart_rate: row.get("heart_rate")?,
        })
    }

    /// Insert unless a reading already occupies this timestamp
    ///
    /// Returns whether a row was written; an existing reading is never replaced.
    pub fn insert_if_absent(&self, conn: &Connection) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO blood_pressure_readings
                (datetime, systolic_bp, diastolic_bp, heart_rate)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![self.datetime, self.systolic, self.diastolic, self.heart_rate],
        )?;
        Ok(rows > 0)
    }

    /// All readings, oldest first
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, systolic_bp, diastolic_bp, heart_rate
             FROM blood_pressure_readings ORDER BY datetime",
        )?;
        let readings = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Readings on one calendar date (`YYYY-MM-DD`), oldest first
    pub fn list_for_date(conn: &Connection, date: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, systolic_bp, diastolic_bp, heart_rate
             FROM blood_pressure_readings
             WHERE date(datetime) = ?1
             ORDER BY datetime",
        )?;
        let readings = stmt
            .query_map([date], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Delete every reading on one calendar date
    pub fn delete_for_date(conn: &Connection, date: &str) -> DbResult<usize> {
        let rows = conn.execute(
            "DELETE FROM blood_pressure_readings WHERE date(datetime) = ?1",
            [date],
        )?;
        Ok(rows)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let n = conn.query_row("SELECT COUNT(*) FROM blood_pressure_readings", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    /// First `limit` rows in insertion order
    pub fn sample(conn: &Connection, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, systolic_bp, diastolic_bp, heart_rate
             FROM blood_pressure_readings ORDER BY id LIMIT ?1",
        )?;
        let readings = stmt
            .query_map([limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Format the reading for display, e.g. `118/76 mmHg, 62 bpm`
    pub fn format_value(&self) -> String {
        let fmt = |v: Option<i32>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        format!(
            "{}/{} mmHg, {} bpm",
            fmt(self.systolic),
            fmt(self.diastolic),
            fmt(self.heart_rate)
        )
    }
}
