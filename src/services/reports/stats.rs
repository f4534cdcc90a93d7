//! Report statistics
//!
//! Pure calculations over the reading/dose history. Missing values are left
//! out of averages and never satisfy a comparison.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::models::{BloodPressureReading, MedicationDose};

/// Readings at or after a dose and no more than this far after it count as a response
pub const DOSE_RESPONSE_WINDOW_HOURS: i64 = 3;

const TIMESTAMP_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    // spreadsheet text dates, month first
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a stored timestamp; a bare date means midnight
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// A reading with its timestamp parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub at: NaiveDateTime,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
}

impl Sample {
    pub fn from_reading(reading: &BloodPressureReading) -> Option<Self> {
        Some(Self {
            at: parse_timestamp(&reading.datetime)?,
            systolic: reading.systolic,
            diastolic: reading.diastolic,
            heart_rate: reading.heart_rate,
        })
    }
}

/// A dose with its timestamp parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DoseEvent {
    pub at: NaiveDateTime,
    /// Display name (English name for known medications)
    pub medication: String,
    pub dosage: f64,
    pub color: (u8, u8, u8),
}

/// Chart color for medications outside the known set
pub const OTHER_MEDICATION_COLOR: (u8, u8, u8) = (52, 73, 94);

impl DoseEvent {
    pub fn from_dose(dose: &MedicationDose) -> Option<Self> {
        Some(Self {
            at: parse_timestamp(&dose.datetime)?,
            medication: dose.display_name().to_string(),
            dosage: dose.dosage,
            color: dose
                .known_medication()
                .map(|m| m.color())
                .unwrap_or(OTHER_MEDICATION_COLOR),
        })
    }
}

/// Which buckets a reading falls in
///
/// The three predicates are evaluated independently: a reading may match
/// none, and (125, 85) is "high" without being "elevated".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub normal: bool,
    pub elevated: bool,
    pub high: bool,
}

pub fn classify(systolic: Option<i32>, diastolic: Option<i32>) -> Classification {
    let sys_below = |limit: i32| systolic.map(|s| s < limit).unwrap_or(false);
    let dia_below_80 = diastolic.map(|d| d < 80).unwrap_or(false);

    Classification {
        normal: sys_below(120) && dia_below_80,
        elevated: systolic.map(|s| (120..130).contains(&s)).unwrap_or(false) && dia_below_80,
        high: systolic.map(|s| s >= 130).unwrap_or(false)
            || diastolic.map(|d| d >= 80).unwrap_or(false),
    }
}

/// Bucket tallies; percentages are over every reading, classified or not
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub total: usize,
    pub normal: usize,
    pub elevated: usize,
    pub high: usize,
}

impl ClassCounts {
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

pub fn count_classes(samples: &[Sample]) -> ClassCounts {
    samples.iter().fold(
        ClassCounts {
            total: samples.len(),
            ..Default::default()
        },
        |mut acc, s| {
            let class = classify(s.systolic, s.diastolic);
            acc.normal += class.normal as usize;
            acc.elevated += class.elevated as usize;
            acc.high += class.high as usize;
            acc
        },
    )
}

/// Arithmetic mean, `None` when there are no values
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn values(samples: &[Sample], pick: fn(&Sample) -> Option<i32>) -> impl Iterator<Item = f64> + '_ {
    samples.iter().filter_map(move |s| pick(s).map(f64::from))
}

pub fn systolic_of(s: &Sample) -> Option<i32> {
    s.systolic
}

pub fn diastolic_of(s: &Sample) -> Option<i32> {
    s.diastolic
}

pub fn heart_rate_of(s: &Sample) -> Option<i32> {
    s.heart_rate
}

/// Headline numbers for the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Whole days between the first and last reading
    pub days: i64,
    pub total_readings: usize,
    pub avg_systolic: Option<f64>,
    pub avg_diastolic: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub total_doses: usize,
    pub classes: ClassCounts,
}

/// Summary over samples sorted by time; `None` without samples
pub fn summarize(samples: &[Sample], dose_count: usize) -> Option<SummaryStats> {
    let first = samples.iter().map(|s| s.at).min()?;
    let last = samples.iter().map(|s| s.at).max()?;

    Some(SummaryStats {
        start_date: first.date(),
        end_date: last.date(),
        days: (last - first).num_days(),
        total_readings: samples.len(),
        avg_systolic: mean(values(samples, systolic_of)),
        avg_diastolic: mean(values(samples, diastolic_of)),
        avg_heart_rate: mean(values(samples, heart_rate_of)),
        total_doses: dose_count,
        classes: count_classes(samples),
    })
}

/// Averages for one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyAverage {
    pub hour: u32,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub heart_rate: Option<f64>,
}

/// Averages per hour of day, only for hours that have readings
pub fn hourly_averages(samples: &[Sample]) -> Vec<HourlyAverage> {
    let mut by_hour: BTreeMap<u32, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        by_hour.entry(sample.at.hour()).or_default().push(sample.clone());
    }

    by_hour
        .into_iter()
        .map(|(hour, group)| HourlyAverage {
            hour,
            systolic: mean(values(&group, systolic_of)),
            diastolic: mean(values(&group, diastolic_of)),
            heart_rate: mean(values(&group, heart_rate_of)),
        })
        .collect()
}

/// One reading taken within the response window after a dose
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseResponse {
    pub medication: String,
    pub color: (u8, u8, u8),
    pub hours_after: f64,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
}

/// Pair every dose with the readings in `[dose, dose + window]`
pub fn dose_responses(samples: &[Sample], doses: &[DoseEvent], window: Duration) -> Vec<DoseResponse> {
    let mut out = Vec::new();
    for dose in doses {
        let end = dose.at + window;
        for sample in samples.iter().filter(|s| s.at >= dose.at && s.at <= end) {
            out.push(DoseResponse {
                medication: dose.medication.clone(),
                color: dose.color,
                hours_after: (sample.at - dose.at).num_seconds() as f64 / 3600.0,
                systolic: sample.systolic,
                diastolic: sample.diastolic,
            });
        }
    }
    out
}

/// Box plot summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Quantile with linear interpolation between closest ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

pub fn five_number<I: IntoIterator<Item = f64>>(values: I) -> Option<FiveNumber> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(FiveNumber {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Distinct dose display names in first-seen order
pub fn medication_names(doses: &[DoseEvent]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for dose in doses {
        if !names.contains(&dose.medication) {
            names.push(dose.medication.clone());
        }
    }
    names
}
