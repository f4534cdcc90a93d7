//! Import batch writer
//!
//! Readings go in with insert-if-absent on their timestamp, doses are plain
//! appends. The writer keeps the tallies an operator needs to check that an
//! import was complete.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use tracing::warn;

use super::normalize::NormalizedSlot;
use super::ImportError;
use crate::db::DbResult;

/// A slot that was not imported, with the reason
#[derive(Debug, Clone, Serialize)]
pub struct RejectedSlot {
    pub timestamp: String,
    pub reason: String,
}

/// Outcome of one import batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub blocks: usize,
    pub rows_scanned: usize,
    pub rows_skipped: usize,
    pub readings_inserted: usize,
    /// Readings dropped because their timestamp was already taken
    pub readings_ignored: usize,
    pub doses_inserted: usize,
    pub doses_by_medication: BTreeMap<String, usize>,
    pub rejected: Vec<RejectedSlot>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Writes normalized slots on one connection (normally inside a transaction)
pub struct ImportWriter<'c> {
    conn: &'c Connection,
    summary: ImportSummary,
}

impl<'c> ImportWriter<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            summary: ImportSummary::default(),
        }
    }

    pub fn write(&mut self, slot: &NormalizedSlot) -> DbResult<()> {
        if let Some(reading) = &slot.reading {
            if reading.insert_if_absent(self.conn)? {
                self.summary.readings_inserted += 1;
            } else {
                self.summary.readings_ignored += 1;
            }
        }

        for dose in &slot.doses {
            dose.insert(self.conn)?;
            self.summary.doses_inserted += 1;
            *self
                .summary
                .doses_by_medication
                .entry(dose.medication.clone())
                .or_default() += 1;
        }

        Ok(())
    }

    /// Record a slot that failed normalization
    pub fn reject(&mut self, timestamp: &str, error: &ImportError) {
        warn!(timestamp, %error, "skipping slot");
        self.summary.rejected.push(RejectedSlot {
            timestamp: timestamp.to_string(),
            reason: error.to_string(),
        });
    }

    pub fn summary_mut(&mut self) -> &mut ImportSummary {
        &mut self.summary
    }

    pub fn finish(self) -> ImportSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{BloodPressureReading, Medication, MedicationDose};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn sample_slot() -> NormalizedSlot {
        NormalizedSlot {
            reading: Some(BloodPressureReading::new("2024-01-01 08:00", Some(118), Some(76), Some(62))),
            doses: vec![
                MedicationDose::new("2024-01-01 08:00", Medication::Candesartan.label(), 8.0),
                MedicationDose::new("2024-01-01 08:00", Medication::Metoprolol.label(), 23.75),
            ],
        }
    }

    #[test]
    fn test_counts_and_breakdown() {
        let conn = setup();
        let mut writer = ImportWriter::new(&conn);
        writer.write(&sample_slot()).unwrap();
        let summary = writer.finish();

        assert_eq!(summary.readings_inserted, 1);
        assert_eq!(summary.doses_inserted, 2);
        assert_eq!(summary.doses_by_medication.get(Medication::Candesartan.label()), Some(&1));
        assert_eq!(summary.doses_by_medication.get(Medication::Metoprolol.label()), Some(&1));
        assert!(summary.is_clean());
    }

    #[test]
    fn test_second_write_ignores_reading_but_appends_doses() {
        let conn = setup();
        let mut writer = ImportWriter::new(&conn);
        writer.write(&sample_slot()).unwrap();
        writer.write(&sample_slot()).unwrap();
        let summary = writer.finish();

        assert_eq!(summary.readings_inserted, 1);
        assert_eq!(summary.readings_ignored, 1);
        assert_eq!(summary.doses_inserted, 4);
        assert_eq!(BloodPressureReading::count(&conn).unwrap(), 1);
        assert_eq!(MedicationDose::count(&conn).unwrap(), 4);
    }
}
