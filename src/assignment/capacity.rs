use super::error::ConfigError;
use super::types::SlotType;

pub const DEFAULT_STANDARD_CAPACITY: usize = 5;
pub const DEFAULT_HIGH_SECURITY_CAPACITY: usize = 2;

/// Capacity ceilings per slot type.
///
/// High-security slots always hold fewer occupants than ordinary ones; the
/// constructor refuses any configuration that breaks this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCapacityModel {
    standard: usize,
    high_security: usize,
}

impl SlotCapacityModel {
    pub fn new(standard: usize, high_security: usize) -> Result<Self, ConfigError> {
        if high_security == 0 || high_security >= standard {
            return Err(ConfigError::InvalidCapacity {
                standard,
                high_security,
            });
        }
        Ok(Self {
            standard,
            high_security,
        })
    }

    pub fn capacity_of(&self, slot_type: SlotType) -> usize {
        match slot_type {
            SlotType::Ordinary => self.standard,
            SlotType::HighSecurity => self.high_security,
        }
    }

    pub fn standard(&self) -> usize {
        self.standard
    }

    pub fn high_security(&self) -> usize {
        self.high_security
    }
}

impl Default for SlotCapacityModel {
    fn default() -> Self {
        Self {
            standard: DEFAULT_STANDARD_CAPACITY,
            high_security: DEFAULT_HIGH_SECURITY_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceilings() {
        let model = SlotCapacityModel::default();
        assert_eq!(model.capacity_of(SlotType::Ordinary), 5);
        assert_eq!(model.capacity_of(SlotType::HighSecurity), 2);
    }

    #[test]
    fn test_high_security_must_be_lower() {
        assert!(SlotCapacityModel::new(4, 4).is_err());
        assert!(SlotCapacityModel::new(3, 5).is_err());
        assert!(SlotCapacityModel::new(3, 0).is_err());

        let model = SlotCapacityModel::new(8, 3).unwrap();
        assert_eq!(model.capacity_of(SlotType::Ordinary), 8);
        assert_eq!(model.capacity_of(SlotType::HighSecurity), 3);
    }
}
