//! Report charts
//!
//! Every chart renders to an SVG string so the report stays a single
//! self-contained file. Errors come back as strings; the report shows them
//! in place of the chart.

use chrono::{Duration, NaiveDateTime};

use super::stats::{
    diastolic_of, five_number, heart_rate_of, medication_names, systolic_of, DoseEvent,
    DoseResponse, HourlyAverage, Sample,
};

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 400;

const SYSTOLIC_COLOR: (u8, u8, u8) = (231, 76, 60);
const DIASTOLIC_COLOR: (u8, u8, u8) = (52, 152, 219);
const HEART_RATE_COLOR: (u8, u8, u8) = (46, 204, 113);

fn rgb((r, g, b): (u8, u8, u8)) -> plotters::style::RGBColor {
    plotters::style::RGBColor(r, g, b)
}

/// Continuous time axis measured in days from the earliest point
struct TimeAxis {
    origin: NaiveDateTime,
    end: f64,
}

impl TimeAxis {
    fn spanning<I: IntoIterator<Item = NaiveDateTime>>(times: I) -> Option<Self> {
        let mut times = times.into_iter();
        let first = times.next()?;
        let (lo, hi) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        let mut axis = Self { origin: lo, end: 0.0 };
        axis.end = axis.x(hi).max(1.0);
        Some(axis)
    }

    fn x(&self, at: NaiveDateTime) -> f64 {
        (at - self.origin).num_seconds() as f64 / 86_400.0
    }

    fn label(&self, x: f64) -> String {
        let at = self.origin + Duration::seconds((x * 86_400.0).round() as i64);
        at.format("%m/%d").to_string()
    }
}

/// Axis bounds covering `values` and the reference levels, padded
fn value_range(values: &[f64], references: &[f64], pad: f64) -> (f64, f64) {
    let all = values.iter().chain(references.iter()).cloned();
    let lo = all.clone().fold(f64::INFINITY, f64::min);
    let hi = all.fold(f64::NEG_INFINITY, f64::max);
    (lo - pad, hi + pad)
}

fn points(samples: &[Sample], axis: &TimeAxis, pick: fn(&Sample) -> Option<i32>) -> Vec<(f64, f64)> {
    samples
        .iter()
        .filter_map(|s| pick(s).map(|v| (axis.x(s.at), f64::from(v))))
        .collect()
}

/// Systolic and diastolic over time with the classification thresholds
pub fn bp_trend_chart(samples: &[Sample], width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    let axis = TimeAxis::spanning(samples.iter().map(|s| s.at))
        .ok_or_else(|| "No blood pressure readings to chart".to_string())?;
    let systolic = points(samples, &axis, systolic_of);
    let diastolic = points(samples, &axis, diastolic_of);
    if systolic.is_empty() && diastolic.is_empty() {
        return Err("No blood pressure values to chart".to_string());
    }

    let values: Vec<f64> = systolic.iter().chain(diastolic.iter()).map(|(_, y)| *y).collect();
    let (y_min, y_max) = value_range(&values, &[80.0, 130.0], 10.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..axis.end, y_min..y_max)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .x_labels(10)
            .x_label_formatter(&|x| axis.label(*x))
            .x_desc("Date")
            .y_desc("mmHg")
            .draw()
            .map_err(|e| e.to_string())?;

        for (level, color) in [(130.0, (255, 0, 0)), (120.0, (255, 165, 0)), (80.0, (255, 165, 0))] {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(0.0, level), (axis.end, level)],
                    ShapeStyle::from(&rgb(color).mix(0.5)).stroke_width(1),
                )))
                .map_err(|e| e.to_string())?;
        }

        for (label, data, color) in [
            ("Systolic", &systolic, rgb(SYSTOLIC_COLOR)),
            ("Diastolic", &diastolic, rgb(DIASTOLIC_COLOR)),
        ] {
            chart
                .draw_series(LineSeries::new(data.iter().cloned(), color.stroke_width(2)))
                .map_err(|e| e.to_string())?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

            chart
                .draw_series(data.iter().map(|(x, y)| Circle::new((*x, *y), 3, color.filled())))
                .map_err(|e| e.to_string())?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

/// Heart rate over time with the 60 and 100 bpm bounds
pub fn heart_rate_chart(samples: &[Sample], width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    let axis = TimeAxis::spanning(samples.iter().map(|s| s.at))
        .ok_or_else(|| "No readings to chart".to_string())?;
    let heart_rate = points(samples, &axis, heart_rate_of);
    if heart_rate.is_empty() {
        return Err("No heart rate values to chart".to_string());
    }

    let values: Vec<f64> = heart_rate.iter().map(|(_, y)| *y).collect();
    let (y_min, y_max) = value_range(&values, &[60.0, 100.0], 10.0);
    let color = rgb(HEART_RATE_COLOR);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..axis.end, y_min..y_max)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .x_labels(10)
            .x_label_formatter(&|x| axis.label(*x))
            .x_desc("Date")
            .y_desc("BPM")
            .draw()
            .map_err(|e| e.to_string())?;

        for (level, line_color) in [(100.0, (255, 165, 0)), (60.0, (0, 112, 192))] {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(0.0, level), (axis.end, level)],
                    rgb(line_color).stroke_width(1),
                )))
                .map_err(|e| e.to_string())?;
        }

        chart
            .draw_series(
                AreaSeries::new(heart_rate.iter().cloned(), y_min, color.mix(0.15))
                    .border_style(color.stroke_width(2)),
            )
            .map_err(|e| e.to_string())?
            .label("Heart Rate")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart
            .draw_series(heart_rate.iter().map(|(x, y)| Circle::new((*x, *y), 3, color.filled())))
            .map_err(|e| e.to_string())?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE)
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

/// Box plots of systolic, diastolic and heart rate side by side
pub fn distribution_chart(samples: &[Sample], width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    const NAMES: [&str; 3] = ["Systolic", "Diastolic", "Heart Rate"];

    let pickers: [fn(&Sample) -> Option<i32>; 3] = [systolic_of, diastolic_of, heart_rate_of];
    let boxes: Vec<_> = pickers
        .into_iter()
        .zip(NAMES)
        .zip([SYSTOLIC_COLOR, DIASTOLIC_COLOR, HEART_RATE_COLOR])
        .enumerate()
        .filter_map(|(i, ((pick, name), color))| {
            five_number(samples.iter().filter_map(|s| pick(s).map(f64::from)))
                .map(|summary| (i as f64, name, rgb(color), summary))
        })
        .collect();
    if boxes.is_empty() {
        return Err("No values for distribution chart".to_string());
    }

    let extremes: Vec<f64> = boxes.iter().flat_map(|(_, _, _, b)| [b.min, b.max]).collect();
    let (y_min, y_max) = value_range(&extremes, &[], 10.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..2.5f64, y_min..y_max)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(3)
            .x_label_formatter(&|x| {
                let slot = x.round();
                if (x - slot).abs() < 1e-6 && (0.0..=2.0).contains(&slot) {
                    NAMES[slot as usize].to_string()
                } else {
                    String::new()
                }
            })
            .y_desc("Value")
            .draw()
            .map_err(|e| e.to_string())?;

        for (x, name, color, b) in &boxes {
            let color = *color;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.25, b.q1), (x + 0.25, b.q3)],
                    color.mix(0.3).filled(),
                )))
                .map_err(|e| e.to_string())?
                .label(*name)
                .legend(move |(lx, ly)| Rectangle::new([(lx, ly - 5), (lx + 20, ly + 5)], color.mix(0.3).filled()));

            let outline = [
                vec![(x - 0.25, b.q1), (x + 0.25, b.q1), (x + 0.25, b.q3), (x - 0.25, b.q3), (x - 0.25, b.q1)],
                vec![(x - 0.25, b.median), (x + 0.25, b.median)],
                vec![(*x, b.min), (*x, b.q1)],
                vec![(*x, b.q3), (*x, b.max)],
                vec![(x - 0.1, b.min), (x + 0.1, b.min)],
                vec![(x - 0.1, b.max), (x + 0.1, b.max)],
            ];
            chart
                .draw_series(outline.into_iter().map(|path| PathElement::new(path, color.stroke_width(2))))
                .map_err(|e| e.to_string())?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

/// Every dose as a point at its time and dosage, one color per medication
pub fn medication_timeline_chart(doses: &[DoseEvent], width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    let axis = TimeAxis::spanning(doses.iter().map(|d| d.at))
        .ok_or_else(|| "No medication doses to chart".to_string())?;
    let max_dose = doses.iter().map(|d| d.dosage).fold(0.0, f64::max);
    let y_max = if max_dose > 0.0 { max_dose * 1.2 } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..axis.end, 0f64..y_max)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .x_labels(10)
            .x_label_formatter(&|x| axis.label(*x))
            .x_desc("Date")
            .y_desc("Dosage (mg)")
            .draw()
            .map_err(|e| e.to_string())?;

        for name in medication_names(doses) {
            let group: Vec<&DoseEvent> = doses.iter().filter(|d| d.medication == name).collect();
            let color = rgb(group[0].color);

            chart
                .draw_series(group.iter().map(|d| Circle::new((axis.x(d.at), d.dosage), 5, color.filled())))
                .map_err(|e| e.to_string())?
                .label(name.as_str())
                .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

/// Average systolic and diastolic per hour of day as paired bars
pub fn hourly_pattern_chart(hourly: &[HourlyAverage], width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    let peak = hourly
        .iter()
        .flat_map(|h| [h.systolic, h.diastolic])
        .flatten()
        .fold(f64::NEG_INFINITY, f64::max);
    if !peak.is_finite() {
        return Err("No hourly blood pressure averages to chart".to_string());
    }

    let systolic_color = rgb(SYSTOLIC_COLOR);
    let diastolic_color = rgb(DIASTOLIC_COLOR);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..24f64, 0f64..(peak + 20.0))
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(13)
            .x_label_formatter(&|x| format!("{:02}:00", *x as u32))
            .x_desc("Hour of day")
            .y_desc("mmHg")
            .draw()
            .map_err(|e| e.to_string())?;

        let bars = |pick: fn(&HourlyAverage) -> Option<f64>, left: f64| {
            hourly
                .iter()
                .filter_map(move |h| pick(h).map(|v| (h.hour as f64 + left, v)))
                .collect::<Vec<_>>()
        };

        for (label, data, color) in [
            ("Systolic", bars(|h| h.systolic, 0.05), systolic_color),
            ("Diastolic", bars(|h| h.diastolic, 0.5), diastolic_color),
        ] {
            chart
                .draw_series(data.iter().map(|(x, v)| Rectangle::new([(*x, 0.0), (x + 0.45, *v)], color.mix(0.8).filled())))
                .map_err(|e| e.to_string())?
                .label(label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

/// Readings in the hours after each dose: systolic and diastolic panels
pub fn dose_response_chart(responses: &[DoseResponse], window_hours: f64, width: u32, height: u32) -> Result<String, String> {
    use plotters::prelude::*;

    if responses.is_empty() {
        return Err("Not enough data for medication impact analysis".to_string());
    }

    let mut names: Vec<&str> = Vec::new();
    for r in responses {
        if !names.contains(&r.medication.as_str()) {
            names.push(&r.medication);
        }
    }

    let panels: [(&str, fn(&DoseResponse) -> Option<i32>); 2] = [
        ("Systolic after dose", |r| r.systolic),
        ("Diastolic after dose", |r| r.diastolic),
    ];

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;
        let areas = root.split_evenly((1, 2));

        for (area, (caption, pick)) in areas.iter().zip(panels) {
            let values: Vec<f64> = responses.iter().filter_map(|r| pick(r).map(f64::from)).collect();
            let (y_min, y_max) = if values.is_empty() {
                (0.0, 1.0)
            } else {
                value_range(&values, &[], 10.0)
            };

            let mut chart = ChartBuilder::on(area)
                .caption(caption, ("sans-serif", 18))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(50)
                .build_cartesian_2d(0f64..window_hours, y_min..y_max)
                .map_err(|e| e.to_string())?;

            chart
                .configure_mesh()
                .x_desc("Hours after dose")
                .y_desc("mmHg")
                .draw()
                .map_err(|e| e.to_string())?;

            for name in &names {
                let group: Vec<&DoseResponse> = responses.iter().filter(|r| r.medication == *name).collect();
                let color = rgb(group[0].color);
                chart
                    .draw_series(group.iter().filter_map(|r| {
                        pick(r).map(|v| Circle::new((r.hours_after, f64::from(v)), 4, color.mix(0.7).filled()))
                    }))
                    .map_err(|e| e.to_string())?
                    .label(*name)
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(|e| e.to_string())?;
        }

        root.present().map_err(|e| e.to_string())?;
    }

    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reports::stats::{hourly_averages, parse_timestamp};

    fn sample(ts: &str, sys: Option<i32>, dia: Option<i32>, hr: Option<i32>) -> Sample {
        Sample {
            at: parse_timestamp(ts).unwrap(),
            systolic: sys,
            diastolic: dia,
            heart_rate: hr,
        }
    }

    fn history() -> Vec<Sample> {
        vec![
            sample("2024-01-01 06:00", Some(118), Some(76), Some(62)),
            sample("2024-01-01 22:00", Some(131), Some(84), Some(70)),
            sample("2024-01-02 06:00", Some(124), None, Some(66)),
        ]
    }

    #[test]
    fn test_time_axis() {
        let axis = TimeAxis::spanning(history().iter().map(|s| s.at)).unwrap();
        assert!((axis.end - 1.0).abs() < 1e-9);
        assert_eq!(axis.label(0.0), "01/01");
        assert_eq!(axis.label(1.0), "01/02");
        assert!(TimeAxis::spanning(Vec::new()).is_none());
    }

    #[test]
    fn test_value_range_includes_references() {
        assert_eq!(value_range(&[100.0, 140.0], &[80.0], 10.0), (70.0, 150.0));
    }

    #[test]
    fn test_bp_trend_chart_renders_svg() {
        let svg = bp_trend_chart(&history(), CHART_WIDTH, CHART_HEIGHT).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Systolic"));
    }

    #[test]
    fn test_empty_charts_report_errors() {
        assert!(bp_trend_chart(&[], CHART_WIDTH, CHART_HEIGHT).is_err());
        assert!(heart_rate_chart(&[sample("2024-01-01 06:00", Some(118), None, None)], CHART_WIDTH, CHART_HEIGHT).is_err());
        assert!(medication_timeline_chart(&[], CHART_WIDTH, CHART_HEIGHT).is_err());
        assert!(hourly_pattern_chart(&[], CHART_WIDTH, CHART_HEIGHT).is_err());
        assert_eq!(
            dose_response_chart(&[], 3.0, CHART_WIDTH, CHART_HEIGHT).unwrap_err(),
            "Not enough data for medication impact analysis"
        );
    }

    #[test]
    fn test_other_charts_render() {
        let samples = history();
        assert!(heart_rate_chart(&samples, CHART_WIDTH, CHART_HEIGHT).unwrap().contains("<svg"));
        assert!(distribution_chart(&samples, CHART_WIDTH, CHART_HEIGHT).unwrap().contains("<svg"));
        assert!(hourly_pattern_chart(&hourly_averages(&samples), CHART_WIDTH, CHART_HEIGHT)
            .unwrap()
            .contains("<svg"));

        let doses = vec![DoseEvent {
            at: parse_timestamp("2024-01-01 06:00").unwrap(),
            medication: "Candesartan".to_string(),
            dosage: 8.0,
            color: (155, 89, 182),
        }];
        assert!(medication_timeline_chart(&doses, CHART_WIDTH, CHART_HEIGHT).unwrap().contains("<svg"));
    }
}
