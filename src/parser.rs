use std::path::Path;

use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use thiserror::Error;

use crate::assignment::{
    AssignableUnit, Assignment, Period, RequiredCategory, ShiftWindow, Slot, SlotId, SlotType,
    UnitId,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: unknown slot type '{value}'")]
    UnknownSlotType { line: u64, value: String },

    #[error("line {line}: unknown shift window '{value}'")]
    UnknownShift { line: u64, value: String },

    #[error("line {line}: invalid date '{value}'")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: a dated assignment needs both date and shift")]
    IncompletePeriod { line: u64 },
}

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1"
}

fn parse_slot_type(value: &str, line: u64) -> Result<SlotType, ParseError> {
    match value.trim().to_lowercase().replace('_', "-").as_str() {
        "" | "ordinary" => Ok(SlotType::Ordinary),
        "high-security" | "highsecurity" => Ok(SlotType::HighSecurity),
        _ => Err(ParseError::UnknownSlotType {
            line,
            value: value.to_string(),
        }),
    }
}

pub fn parse_shift(value: &str, line: u64) -> Result<Option<ShiftWindow>, ParseError> {
    match value.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "day" => Ok(Some(ShiftWindow::Day)),
        "night" => Ok(Some(ShiftWindow::Night)),
        _ => Err(ParseError::UnknownShift {
            line,
            value: value.to_string(),
        }),
    }
}

/// Builds a period from optional date and shift columns. Both empty means
/// an open-ended (housing) assignment.
pub fn parse_period(date: &str, shift: &str, line: u64) -> Result<Period, ParseError> {
    let shift = parse_shift(shift, line)?;
    let date = date.trim();
    match (date.is_empty(), shift) {
        (true, None) => Ok(Period::Indefinite),
        (false, Some(shift)) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                ParseError::InvalidDate {
                    line,
                    value: date.to_string(),
                }
            })?;
            Ok(Period::shift(date, shift))
        }
        _ => Err(ParseError::IncompletePeriod { line }),
    }
}

fn column(headers: &StringRecord, name: &'static str) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or(ParseError::MissingColumn(name))
}

fn optional_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn field(record: &StringRecord, col: Option<usize>) -> &str {
    col.and_then(|c| record.get(c)).unwrap_or("").trim()
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Loads slot master data.
///
/// Columns: `id` (required), `section`, `slot_type`, `required_category`,
/// `night_eligible`. Rows without an id are skipped; a missing
/// `night_eligible` column means every slot may be used at night.
pub fn load_slots<P: AsRef<Path>>(csv_path: P) -> Result<Vec<Slot>, ParseError> {
    let mut reader = Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let id_col = Some(column(&headers, "id")?);
    let section_col = optional_column(&headers, "section");
    let type_col = optional_column(&headers, "slot_type");
    let category_col = optional_column(&headers, "required_category");
    let night_col = optional_column(&headers, "night_eligible");

    let mut slots = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);

        let id = field(&record, id_col);
        if id.is_empty() {
            continue;
        }

        let section = field(&record, section_col);
        let mut slot = Slot::new(id)
            .with_slot_type(parse_slot_type(field(&record, type_col), line)?)
            .with_required_category(RequiredCategory::from_label(field(&record, category_col)))
            .with_night_eligible(night_col.is_none() || parse_bool(field(&record, night_col)));
        if !section.is_empty() {
            slot = slot.with_section(section);
        }
        slots.push(slot);
    }

    Ok(slots)
}

/// Loads staff and inmate master data.
///
/// Columns: `id` (required), `display_name`, `category`, `shift_window`.
/// When the same id appears twice the later row wins.
pub fn load_units<P: AsRef<Path>>(csv_path: P) -> Result<Vec<AssignableUnit>, ParseError> {
    let mut reader = Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let id_col = Some(column(&headers, "id")?);
    let name_col = optional_column(&headers, "display_name");
    let category_col = optional_column(&headers, "category");
    let shift_col = optional_column(&headers, "shift_window");

    let mut units: Vec<AssignableUnit> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);

        let id = field(&record, id_col);
        if id.is_empty() {
            continue;
        }

        let name = field(&record, name_col);
        let mut unit = AssignableUnit::new(id, if name.is_empty() { id } else { name });
        let category = field(&record, category_col);
        if !category.is_empty() {
            unit = unit.with_category(category);
        }
        if let Some(shift) = parse_shift(field(&record, shift_col), line)? {
            unit = unit.with_shift_window(shift);
        }

        units.retain(|u| u.id != unit.id);
        units.push(unit);
    }

    Ok(units)
}

/// Loads recorded assignments.
///
/// Columns: `slot_id`, `unit_id` (required), `date`, `shift`.
pub fn load_assignments<P: AsRef<Path>>(csv_path: P) -> Result<Vec<Assignment>, ParseError> {
    let mut reader = Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let slot_col = Some(column(&headers, "slot_id")?);
    let unit_col = Some(column(&headers, "unit_id")?);
    let date_col = optional_column(&headers, "date");
    let shift_col = optional_column(&headers, "shift");

    let mut assignments = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);

        let slot_id = field(&record, slot_col);
        let unit_id = field(&record, unit_col);
        if slot_id.is_empty() || unit_id.is_empty() {
            continue; // Skip incomplete records
        }

        assignments.push(Assignment {
            slot_id: SlotId::new(slot_id),
            unit_id: UnitId::new(unit_id),
            period: parse_period(field(&record, date_col), field(&record, shift_col), line)?,
        });
    }

    Ok(assignments)
}
