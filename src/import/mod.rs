//! Spreadsheet import
//!
//! One-shot batch that reshapes the wide, one-block-per-date sheet into the
//! `blood_pressure_readings` and `medications` tables.
//!
//! Pipeline: [`source::load_matrix`] → [`layout::parse_sheet`] →
//! [`normalize::normalize_slot`] → [`writer::ImportWriter`]. Layout problems
//! abort before anything is written; a bad cell only rejects its own slot,
//! which is reported in the [`ImportSummary`].

pub mod cell;
pub mod layout;
pub mod normalize;
pub mod source;
pub mod writer;

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::db::{Database, DbError};

pub use cell::{Cell, CellError};
pub use layout::{BlockField, BlockSchema, LayoutError, SheetLayout, SlotRow};
pub use normalize::NormalizedSlot;
pub use writer::{ImportSummary, ImportWriter, RejectedSlot};

/// Import error types
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook {0} has no worksheets")]
    NoWorksheet(String),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Cell {} ({} on {}): {}", location(.row, .column), .field, .date, .source)]
    Cell {
        /// 1-based sheet row
        row: usize,
        /// 1-based sheet column
        column: usize,
        date: String,
        field: &'static str,
        source: CellError,
    },

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Spreadsheet-style cell reference, e.g. `H5`
pub fn cell_ref(row: usize, column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row)
}

fn location(row: &usize, column: &usize) -> String {
    cell_ref(*row, *column)
}

/// Import an already-loaded sheet in a single transaction
pub fn import_matrix(
    db: &Database,
    matrix: &[Vec<Cell>],
    layout: &SheetLayout,
) -> Result<ImportSummary, ImportError> {
    let parsed = layout::parse_sheet(matrix, layout)?;

    let summary = db.with_transaction(|tx| {
        let mut writer = ImportWriter::new(tx);
        {
            let summary = writer.summary_mut();
            summary.blocks = parsed.blocks;
            summary.rows_scanned = parsed.rows_scanned;
            summary.rows_skipped = parsed.rows_skipped;
        }

        for slot in &parsed.slots {
            match normalize::normalize_slot(slot, &layout.schema) {
                Ok(records) => writer.write(&records)?,
                Err(err) => writer.reject(&slot.timestamp, &err),
            }
        }

        Ok::<_, ImportError>(writer.finish())
    })?;

    info!(
        readings = summary.readings_inserted,
        duplicates = summary.readings_ignored,
        doses = summary.doses_inserted,
        rejected = summary.rejected.len(),
        "import finished"
    );

    Ok(summary)
}

/// Load `path` and import it with the standard layout
pub fn import_file(db: &Database, path: &Path) -> Result<ImportSummary, ImportError> {
    let matrix = source::load_matrix(path)?;
    import_matrix(db, &matrix, &SheetLayout::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(1, 1), "A1");
        assert_eq!(cell_ref(5, 8), "H5");
        assert_eq!(cell_ref(3, 26), "Z3");
        assert_eq!(cell_ref(3, 27), "AA3");
        assert_eq!(cell_ref(10, 52), "AZ10");
    }

    #[test]
    fn test_cell_error_message_names_location() {
        let err = ImportError::Cell {
            row: 5,
            column: 9,
            date: "2024-01-01".to_string(),
            field: "diastolic",
            source: CellError::NotInteger("text \"??\"".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("I5"));
        assert!(message.contains("diastolic"));
        assert!(message.contains("2024-01-01"));
    }
}
