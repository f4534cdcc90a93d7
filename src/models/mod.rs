//! Data models
//!
//! Rust structs representing database entities.

mod dose;
mod reading;

pub use dose::{DoseRow, Medication, MedicationDose};
pub use reading::{BloodPressureReading, ReadingRow};
