//! Medication dose model
//!
//! One row of `medications`: a timestamped administration of a named medication.
//! Doses are never deduplicated, several may share a timestamp.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Wire form used by the data API: `[datetime, medication_name, dosage]`
pub type DoseRow = (String, String, f64);

/// The medications tracked in the source spreadsheet, in block column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medication {
    Candesartan,
    Lercanidipine,
    Metoprolol,
}

impl Medication {
    pub const ALL: [Medication; 3] = [
        Medication::Candesartan,
        Medication::Lercanidipine,
        Medication::Metoprolol,
    ];

    /// Name stored in the `medications` table
    pub fn label(&self) -> &'static str {
        match self {
            Medication::Candesartan => "坎地沙坦 (Candesartan)",
            Medication::Lercanidipine => "乐卡地平 (Lercanidipine)",
            Medication::Metoprolol => "美托洛尔 (Metoprolol)",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Medication::Candesartan => "Candesartan",
            Medication::Lercanidipine => "Lercanidipine",
            Medication::Metoprolol => "Metoprolol",
        }
    }

    /// Chart color
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Medication::Candesartan => (155, 89, 182),
            Medication::Lercanidipine => (230, 126, 34),
            Medication::Metoprolol => (26, 188, 156),
        }
    }

    /// Recognize a stored label or a plain English name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|m| {
            m.label() == name || m.display_name().eq_ignore_ascii_case(name)
        })
    }
}

/// A medication dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationDose {
    pub datetime: String,
    pub medication: String,
    pub dosage: f64,
}

impl MedicationDose {
    pub fn new(datetime: impl Into<String>, medication: impl Into<String>, dosage: f64) -> Self {
        Self {
            datetime: datetime.into(),
            medication: medication.into(),
            dosage,
        }
    }

    /// Known medication this dose refers to, if any
    pub fn known_medication(&self) -> Option<Medication> {
        Medication::from_name(&self.medication)
    }

    /// Display name: the English name for known medications, the stored name otherwise
    pub fn display_name(&self) -> &str {
        match self.known_medication() {
            Some(m) => m.display_name(),
            None => &self.medication,
        }
    }

    pub fn into_row(self) -> DoseRow {
        (self.datetime, self.medication, self.dosage)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            datetime: row.get("datetime")?,
            medication: row.get("medication_name")?,
            dosage: row.get("dosage")?,
        })
    }

    /// Append a dose (no duplicate check)
    pub fn insert(&self, conn: &Connection) -> DbResult<()> {
        conn.execute(
            "INSERT INTO medications (datetime, medication_name, dosage) VALUES (?1, ?2, ?3)",
            params![self.datetime, self.medication, self.dosage],
        )?;
        Ok(())
    }

    /// All doses, oldest first
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, medication_name, dosage FROM medications ORDER BY datetime, id",
        )?;
        let doses = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(doses)
    }

    /// Doses on one calendar date (`YYYY-MM-DD`), oldest first
    pub fn list_for_date(conn: &Connection, date: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, medication_name, dosage FROM medications
             WHERE date(datetime) = ?1
             ORDER BY datetime, id",
        )?;
        let doses = stmt
            .query_map([date], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(doses)
    }

    /// Delete every dose on one calendar date
    pub fn delete_for_date(conn: &Connection, date: &str) -> DbResult<usize> {
        let rows = conn.execute("DELETE FROM medications WHERE date(datetime) = ?1", [date])?;
        Ok(rows)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let n = conn.query_row("SELECT COUNT(*) FROM medications", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Dose count per stored medication name
    pub fn count_by_medication(conn: &Connection) -> DbResult<BTreeMap<String, i64>> {
        let mut stmt = conn.prepare(
            "SELECT medication_name, COUNT(*) FROM medications GROUP BY medication_name",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(counts)
    }

    /// First `limit` rows in insertion order
    pub fn sample(conn: &Connection, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT datetime, medication_name, dosage FROM medications ORDER BY id LIMIT ?1",
        )?;
        let doses = stmt
            .query_map([limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(doses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Medication::from_name("坎地沙坦 (Candesartan)"), Some(Medication::Candesartan));
        assert_eq!(Medication::from_name("metoprolol"), Some(Medication::Metoprolol));
        assert_eq!(Medication::from_name(" Lercanidipine "), Some(Medication::Lercanidipine));
        assert_eq!(Medication::from_name("Aspirin"), None);
    }

    #[test]
    fn test_display_name_passes_unknown_through() {
        let known = MedicationDose::new("2024-01-01 08:00", Medication::Metoprolol.label(), 25.0);
        let unknown = MedicationDose::new("2024-01-01 08:00", "Aspirin", 100.0);
        assert_eq!(known.display_name(), "Metoprolol");
        assert_eq!(unknown.display_name(), "Aspirin");
    }

    #[test]
    fn test_identical_doses_are_both_kept() {
        let conn = setup();
        let dose = MedicationDose::new("2024-01-01 08:00", Medication::Candesartan.label(), 8.0);
        dose.insert(&conn).unwrap();
        dose.insert(&conn).unwrap();

        assert_eq!(MedicationDose::count(&conn).unwrap(), 2);
        let counts = MedicationDose::count_by_medication(&conn).unwrap();
        assert_eq!(counts.get(Medication::Candesartan.label()), Some(&2));
    }

    #[test]
    fn test_list_and_delete_for_date() {
        let conn = setup();
        MedicationDose::new("2024-01-01 22:00", "A", 1.0).insert(&conn).unwrap();
        MedicationDose::new("2024-01-01 08:00", "B", 2.0).insert(&conn).unwrap();
        MedicationDose::new("2024-01-03 08:00", "C", 3.0).insert(&conn).unwrap();

        let day = MedicationDose::list_for_date(&conn, "2024-01-01").unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].medication, "B");

        assert_eq!(MedicationDose::delete_for_date(&conn, "2024-01-01").unwrap(), 2);
        assert_eq!(MedicationDose::list_all(&conn).unwrap().len(), 1);
    }
}
