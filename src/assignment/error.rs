use thiserror::Error;

use super::eligibility::IneligibleReason;
use super::types::{SlotId, UnitId};

/// Failures reported by `OccupancyStore`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("slot {slot} is full ({capacity} occupants)")]
    CapacityExceeded { slot: SlotId, capacity: usize },

    #[error("unit {unit} already occupies slot {slot}")]
    AlreadyAssigned { unit: UnitId, slot: SlotId },

    #[error("unit {unit} already occupies slot {current} in this period")]
    AssignedElsewhere { unit: UnitId, current: SlotId },

    #[error("unit {unit} is not in slot {slot}")]
    NotFound { unit: UnitId, slot: SlotId },
}

/// Broad classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Capacity or double-booking conflict
    Conflict,
    NotFound,
    /// The unit may not occupy the slot
    Ineligible,
    /// Broken caller contract; not a business outcome
    Internal,
}

/// Failures reported by `AssignmentEngine`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignError {
    #[error("slot {slot} is not available during a night shift")]
    ShiftNotAllowed { slot: SlotId },

    #[error("unit {unit} does not match the category required by slot {slot}")]
    CategoryMismatch { unit: UnitId, slot: SlotId },

    #[error("slot {slot} is full ({capacity} occupants)")]
    SlotFull { slot: SlotId, capacity: usize },

    #[error("unit {unit} is already assigned to slot {current}; move it instead")]
    AlreadyAssignedElsewhere { unit: UnitId, current: SlotId },

    #[error("unit {unit} is not in slot {slot}")]
    NotFound { unit: UnitId, slot: SlotId },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AssignError {
    pub fn ineligible(reason: IneligibleReason, unit: &UnitId, slot: &SlotId) -> Self {
        match reason {
            IneligibleReason::ShiftNotAllowed => AssignError::ShiftNotAllowed { slot: slot.clone() },
            IneligibleReason::CategoryMismatch => AssignError::CategoryMismatch {
                unit: unit.clone(),
                slot: slot.clone(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AssignError::ShiftNotAllowed { .. } | AssignError::CategoryMismatch { .. } => {
                ErrorKind::Ineligible
            }
            AssignError::SlotFull { .. } | AssignError::AlreadyAssignedElsewhere { .. } => {
                ErrorKind::Conflict
            }
            AssignError::NotFound { .. } => ErrorKind::NotFound,
            AssignError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AssignError::ShiftNotAllowed { .. } => "ShiftNotAllowed",
            AssignError::CategoryMismatch { .. } => "CategoryMismatch",
            AssignError::SlotFull { .. } => "SlotFull",
            AssignError::AlreadyAssignedElsewhere { .. } => "AlreadyAssignedElsewhere",
            AssignError::NotFound { .. } => "NotFound",
            AssignError::Internal(_) => "Internal",
        }
    }

    /// Message suitable for showing to the person who made the request.
    pub fn user_message(&self) -> String {
        match self {
            AssignError::ShiftNotAllowed { .. } => {
                "Location not available during night shift".to_string()
            }
            AssignError::CategoryMismatch { .. } => "Department mismatch".to_string(),
            AssignError::SlotFull { slot, .. } => {
                format!("Location {} is full, choose another location", slot)
            }
            AssignError::AlreadyAssignedElsewhere { current, .. } => {
                format!("Already assigned to {}, move the assignment instead", current)
            }
            AssignError::NotFound { .. } => "Assignment not found".to_string(),
            AssignError::Internal(_) => "Something went wrong, please try again".to_string(),
        }
    }
}

impl From<StoreError> for AssignError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { slot, capacity } => AssignError::SlotFull { slot, capacity },
            StoreError::AssignedElsewhere { unit, current } => {
                AssignError::AlreadyAssignedElsewhere { unit, current }
            }
            StoreError::NotFound { unit, slot } => AssignError::NotFound { unit, slot },
            // Callers absorb AlreadyAssigned as a no-op before converting
            StoreError::AlreadyAssigned { unit, slot } => AssignError::Internal(format!(
                "unexpected duplicate placement of {} in {}",
                unit, slot
            )),
        }
    }
}

/// Invalid runtime configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "high-security capacity ({high_security}) must be positive and below the standard capacity ({standard})"
    )]
    InvalidCapacity { standard: usize, high_security: usize },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("failed to read config file {path}: {message}")]
    File { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let err: AssignError = StoreError::CapacityExceeded {
            slot: SlotId::new("C1"),
            capacity: 5,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "SlotFull");

        let err: AssignError = StoreError::NotFound {
            unit: UnitId::new("u1"),
            slot: SlotId::new("C1"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_eligibility_errors_are_specific() {
        let unit = UnitId::new("u1");
        let slot = SlotId::new("Gate");
        let err = AssignError::ineligible(IneligibleReason::ShiftNotAllowed, &unit, &slot);
        assert_eq!(err.kind(), ErrorKind::Ineligible);
        assert_eq!(err.user_message(), "Location not available during night shift");

        let err = AssignError::ineligible(IneligibleReason::CategoryMismatch, &unit, &slot);
        assert_eq!(err.user_message(), "Department mismatch");
    }
}
