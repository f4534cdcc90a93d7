//! Import the wide blood pressure spreadsheet into the database
//!
//! Usage: import_sheet <file.xlsx|file.csv>

use std::path::PathBuf;
use std::process::ExitCode;

use bptrack::db::Database;
use bptrack::models::{BloodPressureReading, MedicationDose};
use bptrack::{build_info, config, import};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bptrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let Some(sheet) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: import_sheet <file.xlsx|file.csv>");
        return Ok(ExitCode::from(2));
    };

    build_info::print_startup_banner("spreadsheet import");

    let db_path = config::database_path();
    println!("Database path: {}", db_path.display());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = Database::open(&db_path)?;

    println!("Importing {}", sheet.display());
    let summary = import::import_file(&database, &sheet)?;

    println!();
    println!("Blocks (dates):      {}", summary.blocks);
    println!("Rows scanned:        {}", summary.rows_scanned);
    println!("Rows without time:   {}", summary.rows_skipped);
    println!("Readings inserted:   {}", summary.readings_inserted);
    println!("Readings existing:   {}", summary.readings_ignored);
    println!("Doses inserted:      {}", summary.doses_inserted);
    for (name, count) in &summary.doses_by_medication {
        println!("  {}: {}", name, count);
    }

    database.with_conn(|conn| {
        println!();
        println!("Database now holds:");
        println!("  {} blood pressure readings", BloodPressureReading::count(conn)?);
        println!("  {} medication doses", MedicationDose::count(conn)?);
        for (name, count) in MedicationDose::count_by_medication(conn)? {
            println!("    {}: {}", name, count);
        }

        println!();
        println!("Sample readings:");
        for reading in BloodPressureReading::sample(conn, 5)? {
            println!("  {}  {}", reading.datetime, reading.format_value());
        }

        println!("Sample doses:");
        for dose in MedicationDose::sample(conn, 5)? {
            println!("  {}  {} {} mg", dose.datetime, dose.display_name(), dose.dosage);
        }
        Ok(())
    })?;

    if summary.is_clean() {
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!();
    eprintln!("{} time slots were rejected:", summary.rejected.len());
    for rejected in &summary.rejected {
        eprintln!("  {}: {}", rejected.timestamp, rejected.reason);
    }
    Ok(ExitCode::FAILURE)
}
