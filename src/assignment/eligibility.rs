use serde::Serialize;

use super::types::{AssignableUnit, Period, RequiredCategory, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IneligibleReason {
    ShiftNotAllowed,
    CategoryMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(IneligibleReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn reason(&self) -> Option<IneligibleReason> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::Ineligible(reason) => Some(*reason),
        }
    }
}

/// Decides whether `unit` may occupy `slot` during `period`.
///
/// Night shifts are checked before category, and the first failing check
/// wins.
pub fn is_eligible(unit: &AssignableUnit, slot: &Slot, period: &Period) -> Eligibility {
    if period.is_night() && !slot.night_eligible {
        return Eligibility::Ineligible(IneligibleReason::ShiftNotAllowed);
    }

    if !category_matches(unit.category.as_deref(), &slot.required_category) {
        return Eligibility::Ineligible(IneligibleReason::CategoryMismatch);
    }

    Eligibility::Eligible
}

/// The unit's category must contain the required one, ignoring case and
/// surrounding whitespace. A missing or blank category only fits `General`.
pub fn category_matches(unit_category: Option<&str>, required: &RequiredCategory) -> bool {
    let required = match required {
        RequiredCategory::General => return true,
        RequiredCategory::Named(name) => normalize_category(name),
    };

    match unit_category.map(normalize_category) {
        Some(category) if !category.is_empty() => category.contains(&required),
        _ => false,
    }
}

pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}
