//! Reading a sheet into a cell matrix
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with calamine, first
//! worksheet only. Csv files are read with the csv crate, every field as text.

use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use tracing::debug;

use super::cell::Cell;
use super::ImportError;

/// Load the first sheet of `path` as rows of cells in sheet coordinates
pub fn load_matrix(path: &Path) -> Result<Vec<Vec<Cell>>, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let matrix = if is_csv {
        load_csv(path)?
    } else {
        load_workbook(path)?
    };

    debug!(path = %path.display(), rows = matrix.len(), "loaded sheet");
    Ok(matrix)
}

fn load_csv(path: &Path) -> Result<Vec<Vec<Cell>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut matrix = Vec::new();
    for record in reader.records() {
        let record = record?;
        matrix.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(matrix)
}

fn load_workbook(path: &Path) -> Result<Vec<Vec<Cell>>, ImportError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::NoWorksheet(path.display().to_string()))??;

    // calamine trims leading empty rows/columns; put them back so row and
    // column numbers in error messages match what the user sees
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut matrix: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(Cell::from));
        matrix.push(cells);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_keeps_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "time,2024-01-01,,,,,").unwrap();
        writeln!(file, ",sys,dia").unwrap();
        writeln!(file, "08:00,118,76,62,8,,").unwrap();
        drop(file);

        let matrix = load_matrix(&path).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0].len(), 7);
        assert_eq!(matrix[1].len(), 3);
        assert_eq!(matrix[2][0], Cell::Text("08:00".to_string()));
        assert_eq!(matrix[2][5], Cell::Empty);
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_matrix(&dir.path().join("missing.xlsx"));
        assert!(result.is_err());
    }
}
