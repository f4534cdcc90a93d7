//! Day records service
//!
//! Reads all records of one calendar date and replaces them wholesale.
//! Replacing is the only edit path: the editor resubmits the whole day.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{Database, DbError, DbResult};
use crate::models::{BloodPressureReading, DoseRow, MedicationDose, ReadingRow};
use crate::services::reports::stats::parse_timestamp;

/// Day service error types
#[derive(Debug, Error)]
pub enum DayError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("record at {datetime} is not on {date}")]
    OutsideDay { datetime: String, date: NaiveDate },

    #[error("unrecognized timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Everything stored for a date (or for all dates)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayRecords {
    pub readings: Vec<BloodPressureReading>,
    pub doses: Vec<MedicationDose>,
}

/// Wire shape of [`DayRecords`]: rows as positional arrays
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayRecordsResponse {
    pub bp_readings: Vec<ReadingRow>,
    pub medications: Vec<DoseRow>,
}

impl From<DayRecords> for DayRecordsResponse {
    fn from(records: DayRecords) -> Self {
        Self {
            bp_readings: records.readings.into_iter().map(BloodPressureReading::into_row).collect(),
            medications: records.doses.into_iter().map(MedicationDose::into_row).collect(),
        }
    }
}

/// A submitted reading; zero counts as blank, like an empty editor field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingInput {
    pub datetime: String,
    #[serde(default)]
    pub systolic: Option<i32>,
    #[serde(default)]
    pub diastolic: Option<i32>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
}

/// A submitted dose; a zero or missing dosage means "not taken"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseInput {
    pub datetime: String,
    pub medication: String,
    #[serde(default)]
    pub dosage: Option<f64>,
}

fn non_zero(v: Option<i32>) -> Option<i32> {
    v.filter(|n| *n != 0)
}

impl ReadingInput {
    /// The reading to store, or `None` when every value is blank
    pub fn to_reading(&self) -> Option<BloodPressureReading> {
        let reading = BloodPressureReading::new(
            self.datetime.trim(),
            non_zero(self.systolic),
            non_zero(self.diastolic),
            non_zero(self.heart_rate),
        );
        (!reading.is_blank()).then_some(reading)
    }
}

impl DoseInput {
    /// The dose to store, or `None` when no dosage was given
    pub fn to_dose(&self) -> Option<MedicationDose> {
        self.dosage
            .filter(|d| *d != 0.0 && d.is_finite())
            .map(|d| MedicationDose::new(self.datetime.trim(), self.medication.trim(), d))
    }
}

/// Counts from a day replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub readings_deleted: usize,
    pub doses_deleted: usize,
    pub readings_inserted: usize,
    pub doses_inserted: usize,
}

/// Every reading and dose, oldest first
pub fn fetch_all(db: &Database) -> DbResult<DayRecords> {
    db.with_conn(|conn| {
        Ok(DayRecords {
            readings: BloodPressureReading::list_all(conn)?,
            doses: MedicationDose::list_all(conn)?,
        })
    })
}

/// Records on `date`, oldest first; a date with no records is an empty result
pub fn fetch_day(db: &Database, date: NaiveDate) -> DbResult<DayRecords> {
    let key = date.format("%Y-%m-%d").to_string();
    let records = db.with_conn(|conn| {
        Ok(DayRecords {
            readings: BloodPressureReading::list_for_date(conn, &key)?,
            doses: MedicationDose::list_for_date(conn, &key)?,
        })
    })?;

    debug!(date = %key, readings = records.readings.len(), doses = records.doses.len(), "fetched day");
    Ok(records)
}

/// Stored form of a timestamp: minutes, plus seconds only when non-zero
fn canonical_timestamp(at: NaiveDateTime) -> String {
    if at.second() == 0 {
        at.format("%Y-%m-%d %H:%M").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parse a submitted timestamp and require it to fall on `date`
fn timestamp_on(datetime: &str, date: NaiveDate) -> Result<String, DayError> {
    let at = parse_timestamp(datetime).ok_or_else(|| DayError::InvalidTimestamp(datetime.to_string()))?;
    if at.date() != date {
        return Err(DayError::OutsideDay {
            datetime: datetime.to_string(),
            date,
        });
    }
    Ok(canonical_timestamp(at))
}

/// Delete everything on `date` and insert the submitted records, atomically
///
/// Blank readings and doses without a dosage are dropped. Every submitted
/// timestamp must parse and fall on `date`, checked before anything is
/// deleted; records are stored with the timestamp in canonical form.
pub fn replace_day(
    db: &Database,
    date: NaiveDate,
    readings: &[ReadingInput],
    doses: &[DoseInput],
) -> Result<ReplaceSummary, DayError> {
    let key = date.format("%Y-%m-%d").to_string();

    let mut new_readings = Vec::with_capacity(readings.len());
    for input in readings {
        let datetime = timestamp_on(&input.datetime, date)?;
        if let Some(mut reading) = input.to_reading() {
            reading.datetime = datetime;
            new_readings.push(reading);
        }
    }

    let mut new_doses = Vec::with_capacity(doses.len());
    for input in doses {
        let datetime = timestamp_on(&input.datetime, date)?;
        if let Some(mut dose) = input.to_dose() {
            dose.datetime = datetime;
            new_doses.push(dose);
        }
    }

    let summary = db.with_transaction(|tx| {
        let mut summary = ReplaceSummary {
            readings_deleted: BloodPressureReading::delete_for_date(tx, &key)?,
            doses_deleted: MedicationDose::delete_for_date(tx, &key)?,
            ..Default::default()
        };

        for reading in &new_readings {
            if reading.insert_if_absent(tx)? {
                summary.readings_inserted += 1;
            }
        }

        for dose in &new_doses {
            dose.insert(tx)?;
            summary.doses_inserted += 1;
        }

        Ok::<_, DayError>(summary)
    })?;

    info!(
        date = %key,
        readings = summary.readings_inserted,
        doses = summary.doses_inserted,
        "replaced day"
    );

    Ok(summary)
}
