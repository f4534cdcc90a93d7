//! Generate the HTML analysis report
//!
//! Usage: generate_report [output.html]

use std::path::PathBuf;

use bptrack::db::Database;
use bptrack::services::reports;
use bptrack::{build_info, config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bptrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner("analysis report");

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::report_path);

    let db_path = config::database_path();
    println!("Database path: {}", db_path.display());
    let database = Database::open(&db_path)?;

    let summary = reports::generate_report(&database, &output)?;

    println!("Report written to {}", summary.output_path.display());
    println!("  Period:   {} to {}", summary.start_date, summary.end_date);
    println!("  Readings: {}", summary.total_readings);
    println!("  Doses:    {}", summary.total_doses);
    println!(
        "  Charts:   {} rendered, {} skipped",
        summary.charts_rendered, summary.charts_skipped
    );
    if summary.records_skipped > 0 {
        println!("  Skipped:  {} records with unrecognized timestamps", summary.records_skipped);
    }

    Ok(())
}
