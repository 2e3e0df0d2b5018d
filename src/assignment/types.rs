use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a staff member or inmate, owned by the personnel records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a duty post or cell.
///
/// Ordering matters: when two slots are locked together they are always
/// locked in ascending `SlotId` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftWindow {
    Day,
    Night,
}

impl fmt::Display for ShiftWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftWindow::Day => f.write_str("day"),
            ShiftWindow::Night => f.write_str("night"),
        }
    }
}

/// Slot classification; decides the capacity ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotType {
    Ordinary,
    HighSecurity,
}

/// Category a unit must belong to in order to occupy a slot.
/// `General` accepts every unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredCategory {
    General,
    Named(String),
}

impl RequiredCategory {
    /// Reads a category column: blank or "general" (any case) is the wildcard.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("general") {
            RequiredCategory::General
        } else {
            RequiredCategory::Named(trimmed.to_string())
        }
    }
}

/// A staff member or inmate that can occupy a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableUnit {
    pub id: UnitId,
    pub display_name: String,
    /// Department for staff, `None` for inmates
    pub category: Option<String>,
    pub shift_window: Option<ShiftWindow>,
}

impl AssignableUnit {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(id),
            display_name: display_name.into(),
            category: None,
            shift_window: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_shift_window(mut self, shift: ShiftWindow) -> Self {
        self.shift_window = Some(shift);
        self
    }
}

/// A duty post or housing cell. Capacity is derived from `slot_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub section: Option<String>,
    pub slot_type: SlotType,
    pub required_category: RequiredCategory,
    pub night_eligible: bool,
}

impl Slot {
    /// An ordinary, general-purpose slot that may be used at night.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SlotId::new(id),
            section: None,
            slot_type: SlotType::Ordinary,
            required_category: RequiredCategory::General,
            night_eligible: true,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_slot_type(mut self, slot_type: SlotType) -> Self {
        self.slot_type = slot_type;
        self
    }

    pub fn with_required_category(mut self, category: RequiredCategory) -> Self {
        self.required_category = category;
        self
    }

    pub fn with_night_eligible(mut self, night_eligible: bool) -> Self {
        self.night_eligible = night_eligible;
        self
    }
}

/// Scope of an assignment: a dated shift for staff, open-ended for housing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Period {
    Shift { date: NaiveDate, shift: ShiftWindow },
    Indefinite,
}

impl Period {
    pub fn shift(date: NaiveDate, shift: ShiftWindow) -> Self {
        Period::Shift { date, shift }
    }

    pub fn is_night(&self) -> bool {
        matches!(self, Period::Shift { shift: ShiftWindow::Night, .. })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Shift { date, shift } => write!(f, "{} {}", date, shift),
            Period::Indefinite => f.write_str("indefinite"),
        }
    }
}

/// One unit placed in one slot for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub unit_id: UnitId,
    pub slot_id: SlotId,
    pub period: Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyStatus {
    Empty,
    Partial,
    Full,
}

impl OccupancyStatus {
    pub fn from_counts(count: usize, capacity: usize) -> Self {
        if count == 0 {
            OccupancyStatus::Empty
        } else if count >= capacity {
            OccupancyStatus::Full
        } else {
            OccupancyStatus::Partial
        }
    }
}

/// Read-only view of one slot's occupants for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub slot_id: SlotId,
    pub period: Period,
    /// Occupants in arrival order
    pub occupants: Vec<UnitId>,
    pub count: usize,
    pub capacity: usize,
    pub status: OccupancyStatus,
    /// Set when the data came from the fallback generator instead of the
    /// authoritative source.
    pub synthetic: bool,
}

impl OccupancySnapshot {
    pub fn new(
        slot_id: SlotId,
        period: Period,
        occupants: Vec<UnitId>,
        capacity: usize,
        synthetic: bool,
    ) -> Self {
        let count = occupants.len();
        Self {
            slot_id,
            period,
            occupants,
            count,
            capacity,
            status: OccupancyStatus::from_counts(count, capacity),
            synthetic,
        }
    }

    pub fn contains(&self, unit_id: &UnitId) -> bool {
        self.occupants.contains(unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_category_from_label() {
        assert_eq!(RequiredCategory::from_label("General"), RequiredCategory::General);
        assert_eq!(RequiredCategory::from_label("  "), RequiredCategory::General);
        assert_eq!(
            RequiredCategory::from_label(" Medical "),
            RequiredCategory::Named("Medical".to_string())
        );
    }

    #[test]
    fn test_period_night_detection() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Period::shift(date, ShiftWindow::Night).is_night());
        assert!(!Period::shift(date, ShiftWindow::Day).is_night());
        assert!(!Period::Indefinite.is_night());
    }

    #[test]
    fn test_snapshot_status() {
        let slot = SlotId::new("A1");
        let empty = OccupancySnapshot::new(slot.clone(), Period::Indefinite, vec![], 2, false);
        assert_eq!(empty.status, OccupancyStatus::Empty);

        let partial = OccupancySnapshot::new(
            slot.clone(),
            Period::Indefinite,
            vec![UnitId::new("u1")],
            2,
            false,
        );
        assert_eq!(partial.status, OccupancyStatus::Partial);

        let full = OccupancySnapshot::new(
            slot,
            Period::Indefinite,
            vec![UnitId::new("u1"), UnitId::new("u2")],
            2,
            false,
        );
        assert_eq!(full.status, OccupancyStatus::Full);
        assert_eq!(full.count, 2);
    }

    #[test]
    fn test_period_serializes_with_kind_tag() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let json = serde_json::to_value(Period::shift(date, ShiftWindow::Night)).unwrap();
        assert_eq!(json["kind"], "shift");
        assert_eq!(json["shift"], "night");
        assert_eq!(json["date"], "2024-03-01");
    }
}
