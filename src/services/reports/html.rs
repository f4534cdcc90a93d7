//! Report HTML
//!
//! Assembles the single-file report: stat cards, classification breakdown,
//! chart sections (inline SVG or a notice) and key observations.

use std::fmt::Write;

use super::stats::{HourlyAverage, SummaryStats};
use crate::build_info::BuildInfo;

/// One chart slot in the report
#[derive(Debug, Clone)]
pub struct ChartSection {
    pub title: &'static str,
    pub description: &'static str,
    /// Rendered SVG, or the reason there is none
    pub svg: Result<String, String>,
}

/// Everything the template needs
#[derive(Debug, Clone)]
pub struct ReportContent {
    pub summary: SummaryStats,
    pub medication_counts: Vec<(String, usize)>,
    pub charts: Vec<ChartSection>,
    pub observations: Vec<String>,
    pub generated_at: String,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fmt_avg(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
}

/// Plain-language findings from the summary and the hourly pattern
pub fn key_observations(
    summary: &SummaryStats,
    hourly: &[HourlyAverage],
    medication_counts: &[(String, usize)],
) -> Vec<String> {
    let mut notes = vec![format!(
        "{} readings recorded over {} days ({} to {}).",
        summary.total_readings, summary.days, summary.start_date, summary.end_date
    )];

    if let (Some(sys), Some(dia)) = (summary.avg_systolic, summary.avg_diastolic) {
        let level = if sys >= 130.0 || dia >= 80.0 {
            "in the high range"
        } else if sys >= 120.0 {
            "elevated"
        } else {
            "within the normal range"
        };
        notes.push(format!("Average blood pressure was {:.0}/{:.0} mmHg, {}.", sys, dia, level));
    }

    let classes = &summary.classes;
    notes.push(format!(
        "{:.1}% of readings were normal, {:.1}% elevated and {:.1}% high.",
        classes.percent(classes.normal),
        classes.percent(classes.elevated),
        classes.percent(classes.high)
    ));

    let with_systolic = hourly.iter().filter_map(|h| h.systolic.map(|v| (h.hour, v)));
    let peak = with_systolic.clone().max_by(|a, b| a.1.total_cmp(&b.1));
    let low = with_systolic.min_by(|a, b| a.1.total_cmp(&b.1));
    if let (Some((peak_hour, peak_value)), Some((low_hour, low_value))) = (peak, low) {
        if peak_hour != low_hour {
            notes.push(format!(
                "Systolic pressure peaked around {:02}:00 (avg {:.0} mmHg) and was lowest around {:02}:00 (avg {:.0} mmHg).",
                peak_hour, peak_value, low_hour, low_value
            ));
        }
    }

    if let Some(hr) = summary.avg_heart_rate {
        let note = if hr < 60.0 {
            "below the usual resting range"
        } else if hr > 100.0 {
            "above the usual resting range"
        } else {
            "within the usual resting range"
        };
        notes.push(format!("Average heart rate was {:.0} bpm, {}.", hr, note));
    }

    if medication_counts.is_empty() {
        notes.push("No medication doses were recorded.".to_string());
    } else {
        let list: Vec<String> = medication_counts
            .iter()
            .map(|(name, n)| format!("{} ({} doses)", name, n))
            .collect();
        notes.push(format!(
            "{} doses recorded over {} days: {}.",
            summary.total_doses,
            summary.days,
            list.join(", ")
        ));
    }

    notes
}

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #f5f7fa; color: #2c3e50; margin: 0; padding: 20px; }
.container { max-width: 1100px; margin: 0 auto; }
header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #fff; padding: 30px; border-radius: 10px; margin-bottom: 20px; }
header h1 { margin: 0 0 8px 0; }
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 15px; margin-bottom: 20px; }
.card { background: #fff; border-radius: 10px; padding: 20px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
.card .label { font-size: 13px; color: #7f8c8d; text-transform: uppercase; }
.card .value { font-size: 28px; font-weight: bold; margin-top: 6px; }
.card .unit { font-size: 13px; color: #95a5a6; }
section { background: #fff; border-radius: 10px; padding: 20px; margin-bottom: 20px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
section h2 { margin-top: 0; }
.classes { display: flex; gap: 15px; flex-wrap: wrap; }
.class { flex: 1; min-width: 160px; padding: 15px; border-radius: 8px; color: #fff; }
.class.normal { background: #27ae60; }
.class.elevated { background: #f39c12; }
.class.high { background: #e74c3c; }
.class .pct { font-size: 26px; font-weight: bold; }
.chart svg { width: 100%; height: auto; }
.notice { padding: 20px; background: #fdf2e9; border-left: 4px solid #e67e22; color: #7e5109; }
.description { color: #7f8c8d; }
ul.observations li { margin-bottom: 8px; }
footer { text-align: center; color: #95a5a6; font-size: 12px; padding: 10px; }
"#;

fn stat_card(out: &mut String, label: &str, value: &str, unit: &str) {
    let _ = write!(
        out,
        r#"<div class="card"><div class="label">{}</div><div class="value">{}</div><div class="unit">{}</div></div>"#,
        escape_html(label),
        escape_html(value),
        escape_html(unit)
    );
}

fn class_box(out: &mut String, css: &str, title: &str, range: &str, count: usize, percent: f64) {
    let _ = write!(
        out,
        r#"<div class="class {}"><div>{}</div><div class="pct">{:.1}%</div><div>{} readings &middot; {}</div></div>"#,
        css,
        escape_html(title),
        percent,
        count,
        escape_html(range)
    );
}

/// Render the complete report document
pub fn render(content: &ReportContent) -> String {
    let s = &content.summary;
    let mut out = String::with_capacity(64 * 1024);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>Blood Pressure Analysis Report</title>\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");

    let _ = write!(
        out,
        "<header><h1>Blood Pressure Analysis Report</h1><div>{} to {} &middot; generated {}</div></header>\n",
        s.start_date, s.end_date, escape_html(&content.generated_at)
    );

    out.push_str("<div class=\"cards\">");
    stat_card(&mut out, "Monitoring period", &s.days.to_string(), "days");
    stat_card(&mut out, "Total readings", &s.total_readings.to_string(), "measurements");
    stat_card(&mut out, "Average systolic", &fmt_avg(s.avg_systolic), "mmHg");
    stat_card(&mut out, "Average diastolic", &fmt_avg(s.avg_diastolic), "mmHg");
    stat_card(&mut out, "Average heart rate", &fmt_avg(s.avg_heart_rate), "bpm");
    stat_card(&mut out, "Medication doses", &s.total_doses.to_string(), "recorded");
    out.push_str("</div>\n");

    let c = &s.classes;
    out.push_str("<section><h2>Blood Pressure Classification</h2><div class=\"classes\">");
    class_box(&mut out, "normal", "Normal", "<120 / <80", c.normal, c.percent(c.normal));
    class_box(&mut out, "elevated", "Elevated", "120-129 / <80", c.elevated, c.percent(c.elevated));
    class_box(&mut out, "high", "High", ">=130 or >=80", c.high, c.percent(c.high));
    out.push_str("</div></section>\n");

    for chart in &content.charts {
        let _ = write!(
            out,
            "<section class=\"chart\"><h2>{}</h2><p class=\"description\">{}</p>",
            escape_html(chart.title),
            escape_html(chart.description)
        );
        match &chart.svg {
            Ok(svg) => out.push_str(svg),
            Err(reason) => {
                let _ = write!(out, "<div class=\"notice\">{}</div>", escape_html(reason));
            }
        }
        out.push_str("</section>\n");
    }

    out.push_str("<section><h2>Key Observations</h2><ul class=\"observations\">");
    for note in &content.observations {
        let _ = write!(out, "<li>{}</li>", escape_html(note));
    }
    out.push_str("</ul></section>\n");

    let _ = write!(
        out,
        "<footer>{} &middot; built {}</footer>\n</div>\n</body>\n</html>\n",
        escape_html(&BuildInfo::current().short()),
        escape_html(BuildInfo::current().build_timestamp)
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reports::stats::ClassCounts;
    use chrono::NaiveDate;

    fn summary() -> SummaryStats {
        SummaryStats {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            days: 7,
            total_readings: 4,
            avg_systolic: Some(126.4),
            avg_diastolic: Some(78.0),
            avg_heart_rate: Some(64.0),
            total_doses: 3,
            classes: ClassCounts { total: 4, normal: 1, elevated: 2, high: 1 },
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_render_sections_and_notice() {
        let content = ReportContent {
            summary: summary(),
            medication_counts: vec![("Candesartan".to_string(), 3)],
            charts: vec![
                ChartSection {
                    title: "Trend",
                    description: "over time",
                    svg: Ok("<svg id=\"trend\"></svg>".to_string()),
                },
                ChartSection {
                    title: "Impact",
                    description: "after doses",
                    svg: Err("Not enough data for medication impact analysis".to_string()),
                },
            ],
            observations: vec!["Average <ok>".to_string()],
            generated_at: "2024-01-09 10:00".to_string(),
        };

        let html = render(&content);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg id=\"trend\"></svg>"));
        assert!(html.contains("<div class=\"notice\">Not enough data for medication impact analysis</div>"));
        assert!(html.contains("50.0%"));
        assert!(html.contains("Average &lt;ok&gt;"));
        assert!(html.contains("126"));
    }

    #[test]
    fn test_key_observations() {
        let hourly = vec![
            HourlyAverage { hour: 6, systolic: Some(135.0), diastolic: Some(85.0), heart_rate: None },
            HourlyAverage { hour: 22, systolic: Some(118.0), diastolic: Some(72.0), heart_rate: None },
        ];
        let notes = key_observations(&summary(), &hourly, &[("Candesartan".to_string(), 3)]);

        assert_eq!(notes[0], "4 readings recorded over 7 days (2024-01-01 to 2024-01-08).");
        assert!(notes[1].contains("126/78"));
        assert!(notes[1].contains("elevated"));
        assert!(notes.iter().any(|n| n.contains("peaked around 06:00")));
        assert!(notes.iter().any(|n| n.contains("Candesartan (3 doses)")));
    }
}
