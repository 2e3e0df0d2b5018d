use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::assignment::{AssignableUnit, Slot, SlotId, UnitId};

/// Read-only index over slot and unit master data.
///
/// The data belongs to the personnel and facility records; the directory
/// only looks it up by id.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    units: HashMap<UnitId, AssignableUnit>,
    slots: BTreeMap<SlotId, Slot>,
}

impl Directory {
    pub fn new(slots: Vec<Slot>, units: Vec<AssignableUnit>) -> Self {
        Self {
            units: units.into_iter().map(|u| (u.id.clone(), u)).collect(),
            slots: slots.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn unit(&self, id: &UnitId) -> Option<&AssignableUnit> {
        self.units.get(id)
    }

    pub fn slot(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// All slots ordered by id.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Slots in `section`, ordered by id.
    pub fn slots_in_section(&self, section: &str) -> Vec<&Slot> {
        self.slots
            .values()
            .filter(|s| s.section.as_deref() == Some(section))
            .collect()
    }

    pub fn sections(&self) -> BTreeSet<&str> {
        self.slots
            .values()
            .filter_map(|s| s.section.as_deref())
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
