//! Slot normalization
//!
//! Turns one [`SlotRow`] into at most one reading and up to one dose per
//! medication column. Empty cells mean "not measured"; anything non-empty must
//! coerce cleanly or the whole slot is rejected.

use super::cell::{Cell, CellError};
use super::layout::{BlockField, BlockSchema, SlotRow};
use super::ImportError;
use crate::models::{BloodPressureReading, MedicationDose};

/// Records produced by one slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSlot {
    pub reading: Option<BloodPressureReading>,
    pub doses: Vec<MedicationDose>,
}

impl NormalizedSlot {
    pub fn is_empty(&self) -> bool {
        self.reading.is_none() && self.doses.is_empty()
    }
}

/// Normalize one slot against the schema it was parsed with
pub fn normalize_slot(slot: &SlotRow, schema: &BlockSchema) -> Result<NormalizedSlot, ImportError> {
    let mut systolic = None;
    let mut diastolic = None;
    let mut heart_rate = None;
    let mut doses = Vec::new();

    for (offset, field) in schema.fields().iter().enumerate() {
        let cell = slot.cells.get(offset).unwrap_or(&Cell::Empty);
        if cell.is_empty() {
            continue;
        }

        let located = |source: CellError| ImportError::Cell {
            row: slot.row + 1,
            column: slot.column + offset + 1,
            date: slot.date.clone(),
            field: field.name(),
            source,
        };

        match field {
            BlockField::Systolic => systolic = Some(cell.as_integer().map_err(located)?),
            BlockField::Diastolic => diastolic = Some(cell.as_integer().map_err(located)?),
            BlockField::HeartRate => heart_rate = Some(cell.as_integer().map_err(located)?),
            BlockField::Dose(medication) => {
                let dosage = cell.as_decimal().map_err(located)?;
                doses.push(MedicationDose::new(
                    slot.timestamp.clone(),
                    medication.label(),
                    dosage,
                ));
            }
        }
    }

    let reading = BloodPressureReading::new(slot.timestamp.clone(), systolic, diastolic, heart_rate);

    Ok(NormalizedSlot {
        reading: (!reading.is_blank()).then_some(reading),
        doses,
    })
}
