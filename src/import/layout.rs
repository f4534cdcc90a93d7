//! Wide sheet layout
//!
//! The source sheet has one time-of-day label per row in its first column and
//! then repeats a fixed block of columns per calendar date:
//!
//! ```text
//!          | 2024-01-01                       | 2024-01-02                       |
//!          | sys | dia | hr | cand | lerc | meto | sys | dia | hr | cand | ...
//! 06:00    | 118 |  76 | 62 |   8  |      |      | ...
//! 22:00    | ...
//! ```
//!
//! Parsing slices every (row, block) pair into a [`SlotRow`]; deciding which
//! records a slot produces is left to the normalizer.

use thiserror::Error;
use tracing::debug;

use super::cell::Cell;
use crate::models::Medication;

/// Structural problems that stop a sheet before anything is read from it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("sheet has no header row")]
    NoHeader,

    #[error("sheet has {columns} columns; expected one time column plus blocks of {width}")]
    ColumnCount { columns: usize, width: usize },

    #[error("block starting at column {column} has no date in its header cell")]
    MissingBlockDate { column: usize },
}

/// One value slot inside a date block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    Systolic,
    Diastolic,
    HeartRate,
    Dose(Medication),
}

impl BlockField {
    pub fn name(&self) -> &'static str {
        match self {
            BlockField::Systolic => "systolic",
            BlockField::Diastolic => "diastolic",
            BlockField::HeartRate => "heart_rate",
            BlockField::Dose(m) => m.display_name(),
        }
    }
}

/// Ordered list of the fields in each date block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSchema {
    fields: Vec<BlockField>,
}

impl BlockSchema {
    pub fn new(fields: Vec<BlockField>) -> Self {
        Self { fields }
    }

    /// Systolic, diastolic, heart rate, then one dose column per known medication
    pub fn standard() -> Self {
        let mut fields = vec![BlockField::Systolic, BlockField::Diastolic, BlockField::HeartRate];
        fields.extend(Medication::ALL.into_iter().map(BlockField::Dose));
        Self::new(fields)
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[BlockField] {
        &self.fields
    }

    /// Number of date blocks in a sheet `columns` wide (time column included)
    pub fn block_count(&self, columns: usize) -> Result<usize, LayoutError> {
        let width = self.width();
        if width == 0 || columns < 1 || (columns - 1) % width != 0 {
            return Err(LayoutError::ColumnCount { columns, width });
        }
        Ok((columns - 1) / width)
    }
}

impl Default for BlockSchema {
    fn default() -> Self {
        Self::standard()
    }
}

/// Where things are in the sheet
#[derive(Debug, Clone)]
pub struct SheetLayout {
    /// Row holding one date per block
    pub header_row: usize,
    /// First row of readings; rows in between hold metric labels
    pub first_data_row: usize,
    pub schema: BlockSchema,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 0,
            first_data_row: 2,
            schema: BlockSchema::standard(),
        }
    }
}

/// One date block on one time-of-day row
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    /// Zero-based sheet row
    pub row: usize,
    /// Zero-based column of the block's first field
    pub column: usize,
    pub date: String,
    pub time: String,
    /// `"{date} {time}"`, the key readings and doses are stored under
    pub timestamp: String,
    /// One cell per schema field, in schema order
    pub cells: Vec<Cell>,
}

/// Result of slicing a sheet into slots
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub slots: Vec<SlotRow>,
    pub blocks: usize,
    pub rows_scanned: usize,
    /// Rows dropped because their time-of-day cell was empty
    pub rows_skipped: usize,
}

/// Slice a sheet into per-date slots
///
/// The column count and every block header are checked before any row is
/// read. Ragged rows are padded with empty cells.
pub fn parse_sheet(matrix: &[Vec<Cell>], layout: &SheetLayout) -> Result<ParsedSheet, LayoutError> {
    let header = matrix.get(layout.header_row).ok_or(LayoutError::NoHeader)?;
    let columns = matrix.iter().map(Vec::len).max().unwrap_or(0);
    let width = layout.schema.width();
    let blocks = layout.schema.block_count(columns)?;

    let mut dates = Vec::with_capacity(blocks);
    for block in 0..blocks {
        let column = 1 + block * width;
        let date = header
            .get(column)
            .filter(|cell| !cell.is_empty())
            .map(Cell::as_date_label)
            .filter(|label| !label.is_empty())
            .ok_or(LayoutError::MissingBlockDate { column: column + 1 })?;
        dates.push(date);
    }

    let mut parsed = ParsedSheet {
        blocks,
        ..Default::default()
    };

    for (row_idx, row) in matrix.iter().enumerate().skip(layout.first_data_row) {
        parsed.rows_scanned += 1;

        let time = match row.first() {
            Some(cell) if !cell.is_empty() => cell.as_time_label(),
            _ => {
                parsed.rows_skipped += 1;
                continue;
            }
        };

        for (block, date) in dates.iter().enumerate() {
            let column = 1 + block * width;
            let cells = (column..column + width)
                .map(|c| row.get(c).cloned().unwrap_or(Cell::Empty))
                .collect();

            parsed.slots.push(SlotRow {
                row: row_idx,
                column,
                date: date.clone(),
                time: time.clone(),
                timestamp: format!("{} {}", date, time),
                cells,
            });
        }
    }

    debug!(
        blocks = parsed.blocks,
        rows = parsed.rows_scanned,
        skipped = parsed.rows_skipped,
        "parsed sheet layout"
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::from_text(s)
    }

    fn header(dates: &[&str]) -> Vec<Cell> {
        let mut row = vec![text("time")];
        for d in dates {
            row.push(text(d));
            row.extend(std::iter::repeat(Cell::Empty).take(5));
        }
        row
    }

    #[test]
    fn test_standard_schema_order() {
        let schema = BlockSchema::standard();
        assert_eq!(schema.width(), 6);
        assert_eq!(schema.fields()[0], BlockField::Systolic);
        assert_eq!(schema.fields()[3], BlockField::Dose(Medication::Candesartan));
        assert_eq!(schema.fields()[5], BlockField::Dose(Medication::Metoprolol));
    }

    #[test]
    fn test_block_count() {
        let schema = BlockSchema::standard();
        assert_eq!(schema.block_count(13), Ok(2));
        assert_eq!(schema.block_count(1), Ok(0));
        assert_eq!(
            schema.block_count(10),
            Err(LayoutError::ColumnCount { columns: 10, width: 6 })
        );
    }

    #[test]
    fn test_column_count_checked_before_rows() {
        let mut head = header(&["2024-01-01"]);
        head.push(Cell::Empty);
        let matrix = vec![head, vec![], vec![text("08:00")]];
        let err = parse_sheet(&matrix, &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LayoutError::ColumnCount { columns: 8, .. }));
    }

    #[test]
    fn test_missing_block_date() {
        let matrix = vec![header(&["2024-01-01", ""]), vec![]];
        let err = parse_sheet(&matrix, &SheetLayout::default()).unwrap_err();
        assert_eq!(err, LayoutError::MissingBlockDate { column: 8 });
    }

    #[test]
    fn test_slots_per_row_and_block() {
        let matrix = vec![
            header(&["2024-01-01 00:00:00", "2024-01-02"]),
            vec![text(""), text("sys")],
            vec![text("06:00"), Cell::Number(118.0)],
            vec![text("22:00")],
        ];

        let parsed = parse_sheet(&matrix, &SheetLayout::default()).unwrap();
        assert_eq!(parsed.blocks, 2);
        assert_eq!(parsed.rows_scanned, 2);
        assert_eq!(parsed.slots.len(), 4);

        let first = &parsed.slots[0];
        assert_eq!(first.timestamp, "2024-01-01 06:00");
        assert_eq!(first.row, 2);
        assert_eq!(first.column, 1);
        assert_eq!(first.cells.len(), 6);
        assert_eq!(first.cells[0], Cell::Number(118.0));
        assert_eq!(first.cells[5], Cell::Empty);

        assert_eq!(parsed.slots[1].timestamp, "2024-01-02 06:00");
        assert_eq!(parsed.slots[1].column, 7);
        assert_eq!(parsed.slots[3].timestamp, "2024-01-02 22:00");
    }

    #[test]
    fn test_blank_time_row_is_skipped() {
        let mut data_row = vec![Cell::Empty];
        data_row.extend((0..6).map(|n| Cell::Number(100.0 + n as f64)));
        let matrix = vec![header(&["2024-01-01"]), vec![], data_row];

        let parsed = parse_sheet(&matrix, &SheetLayout::default()).unwrap();
        assert!(parsed.slots.is_empty());
        assert_eq!(parsed.rows_skipped, 1);
    }

    #[test]
    fn test_empty_matrix_has_no_header() {
        assert_eq!(
            parse_sheet(&[], &SheetLayout::default()).unwrap_err(),
            LayoutError::NoHeader
        );
    }
}
