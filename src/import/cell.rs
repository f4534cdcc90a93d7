//! Spreadsheet cell values
//!
//! Cells arrive loosely typed from calamine or as raw csv text. They are
//! pinned down to a [`Cell`] once, and every numeric use goes through an
//! explicit coercion that reports what was wrong.

use std::fmt;

use calamine::Data;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Why a cell could not be coerced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("expected a whole number, found {0}")]
    NotInteger(String),

    #[error("expected a number, found {0}")]
    NotNumber(String),
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Time(NaiveTime),
    Empty,
}

impl Cell {
    /// Blank cells and whitespace-only text both count as empty
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Parse a raw csv field
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.trim().to_string())
        }
    }

    /// Whole-number value; fractional numbers are an error, not truncated
    pub fn as_integer(&self) -> Result<i32, CellError> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => Ok(*n as i32),
            Cell::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i32>() {
                    return Ok(n);
                }
                // "118.0" is what a numeric column looks like after a csv export
                match s.parse::<f64>() {
                    Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                        Ok(n as i32)
                    }
                    _ => Err(CellError::NotInteger(self.describe())),
                }
            }
            _ => Err(CellError::NotInteger(self.describe())),
        }
    }

    /// Decimal value
    pub fn as_decimal(&self) -> Result<f64, CellError> {
        match self {
            Cell::Number(n) if n.is_finite() => Ok(*n),
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(n),
                _ => Err(CellError::NotNumber(self.describe())),
            },
            _ => Err(CellError::NotNumber(self.describe())),
        }
    }

    /// Date label for a block header
    ///
    /// Real dates keep only their date part; anything else is cut at the first
    /// whitespace, so `"2024-01-01 00:00:00"` typed as text still yields the date.
    pub fn as_date_label(&self) -> String {
        match self {
            Cell::Date(dt) => dt.format("%Y-%m-%d").to_string(),
            other => other
                .to_string()
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Time-of-day label for the first column
    pub fn as_time_label(&self) -> String {
        match self {
            Cell::Time(t) => format_time(t),
            Cell::Date(dt) => format_time(&dt.time()),
            Cell::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    /// Short description used in error messages
    fn describe(&self) -> String {
        match self {
            Cell::Number(n) => format!("number {}", n),
            Cell::Text(s) => format!("text {:?}", s),
            Cell::Date(dt) => format!("date {}", dt),
            Cell::Time(t) => format!("time {}", t),
            Cell::Empty => "an empty cell".to_string(),
        }
    }
}

fn format_time(t: &NaiveTime) -> String {
    if t.second() == 0 {
        t.format("%H:%M").to_string()
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Time(t) => write!(f, "{}", format_time(t)),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::from_text(s),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => {
                if dt.is_duration() {
                    return Cell::Number(dt.as_f64());
                }
                match dt.as_datetime() {
                    // Excel stores a bare time as a day fraction on the epoch day
                    Some(value) if dt.as_f64() < 1.0 => Cell::Time(value.time()),
                    Some(value) => Cell::Date(value),
                    None => Cell::Number(dt.as_f64()),
                }
            }
            Data::DateTimeIso(s) => parse_iso(s),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(format!("#{:?}", e)),
            Data::Empty => Cell::Empty,
        }
    }
}

fn parse_iso(s: &str) -> Cell {
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Cell::Date(dt);
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Cell::Date(date.and_time(NaiveTime::MIN));
    }
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return Cell::Time(t);
    }
    Cell::from_text(s)
}
