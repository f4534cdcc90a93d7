//! Analysis report
//!
//! Reads the whole history and writes one self-contained HTML file with
//! summary statistics and six charts.

pub mod charts;
pub mod html;
pub mod stats;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::services::days;

pub use html::{ChartSection, ReportContent};
pub use stats::{DoseEvent, Sample, SummaryStats};

use charts::{CHART_HEIGHT, CHART_WIDTH};
use stats::DOSE_RESPONSE_WINDOW_HOURS;

/// Report error types
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No blood pressure readings in the database")]
    NoReadings,
}

/// What was written
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub output_path: PathBuf,
    pub start_date: String,
    pub end_date: String,
    pub total_readings: usize,
    pub total_doses: usize,
    pub charts_rendered: usize,
    pub charts_skipped: usize,
    /// Records left out because their timestamp could not be parsed
    pub records_skipped: usize,
}

/// Parsed history ready for analysis
#[derive(Debug, Clone, Default)]
pub struct History {
    pub samples: Vec<Sample>,
    pub doses: Vec<DoseEvent>,
    pub skipped: usize,
}

/// Load every record, oldest first, with timestamps parsed
///
/// Records whose timestamp matches no known form are left out and counted.
pub fn load_history(db: &Database) -> Result<History, ReportError> {
    let records = days::fetch_all(db)?;
    let mut history = History::default();

    for reading in &records.readings {
        match Sample::from_reading(reading) {
            Some(sample) => history.samples.push(sample),
            None => {
                warn!(datetime = %reading.datetime, "reading skipped, unrecognized timestamp");
                history.skipped += 1;
            }
        }
    }

    for dose in &records.doses {
        match DoseEvent::from_dose(dose) {
            Some(event) => history.doses.push(event),
            None => {
                warn!(datetime = %dose.datetime, medication = %dose.medication, "dose skipped, unrecognized timestamp");
                history.skipped += 1;
            }
        }
    }

    history.samples.sort_by_key(|s| s.at);
    history.doses.sort_by_key(|d| d.at);
    Ok(history)
}

/// Dose counts per display name, most frequent first
fn medication_counts(doses: &[DoseEvent]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for dose in doses {
        *counts.entry(dose.medication.as_str()).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Compute statistics and charts for `history`
pub fn build_content(history: &History) -> Result<ReportContent, ReportError> {
    let summary = stats::summarize(&history.samples, history.doses.len()).ok_or(ReportError::NoReadings)?;
    let hourly = stats::hourly_averages(&history.samples);
    let responses = stats::dose_responses(
        &history.samples,
        &history.doses,
        Duration::hours(DOSE_RESPONSE_WINDOW_HOURS),
    );
    let counts = medication_counts(&history.doses);
    let observations = html::key_observations(&summary, &hourly, &counts);

    let charts = vec![
        ChartSection {
            title: "Blood Pressure Trends",
            description: "Systolic and diastolic readings over time with the 120, 130 and 80 mmHg thresholds.",
            svg: charts::bp_trend_chart(&history.samples, CHART_WIDTH, CHART_HEIGHT),
        },
        ChartSection {
            title: "Heart Rate Trends",
            description: "Heart rate over time against the 60-100 bpm resting range.",
            svg: charts::heart_rate_chart(&history.samples, CHART_WIDTH, CHART_HEIGHT),
        },
        ChartSection {
            title: "Reading Distribution",
            description: "Spread of systolic, diastolic and heart rate values.",
            svg: charts::distribution_chart(&history.samples, CHART_WIDTH, CHART_HEIGHT),
        },
        ChartSection {
            title: "Medication Timeline",
            description: "Every recorded dose by time and dosage.",
            svg: charts::medication_timeline_chart(&history.doses, CHART_WIDTH, CHART_HEIGHT),
        },
        ChartSection {
            title: "Hourly Pattern",
            description: "Average blood pressure for each hour of the day.",
            svg: charts::hourly_pattern_chart(&hourly, CHART_WIDTH, CHART_HEIGHT),
        },
        ChartSection {
            title: "Medication Impact",
            description: "Readings taken within three hours after each dose.",
            svg: charts::dose_response_chart(
                &responses,
                DOSE_RESPONSE_WINDOW_HOURS as f64,
                CHART_WIDTH,
                CHART_HEIGHT,
            ),
        },
    ];

    for chart in &charts {
        if let Err(reason) = &chart.svg {
            warn!(chart = chart.title, reason = %reason, "chart skipped");
        }
    }

    Ok(ReportContent {
        summary,
        medication_counts: counts,
        charts,
        observations,
        generated_at: Local::now().format("%Y-%m-%d %H:%M").to_string(),
    })
}

/// Generate the report from the database and write it to `output_path`
pub fn generate_report(db: &Database, output_path: &Path) -> Result<ReportSummary, ReportError> {
    let history = load_history(db)?;
    let content = build_content(&history)?;
    let document = html::render(&content);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, document)?;

    let charts_rendered = content.charts.iter().filter(|c| c.svg.is_ok()).count();
    let summary = ReportSummary {
        output_path: output_path.to_path_buf(),
        start_date: content.summary.start_date.to_string(),
        end_date: content.summary.end_date.to_string(),
        total_readings: content.summary.total_readings,
        total_doses: content.summary.total_doses,
        charts_rendered,
        charts_skipped: content.charts.len() - charts_rendered,
        records_skipped: history.skipped,
    };

    info!(
        path = %output_path.display(),
        readings = summary.total_readings,
        doses = summary.total_doses,
        charts = charts_rendered,
        skipped = history.skipped,
        "report written"
    );

    Ok(summary)
}
