use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::capacity::SlotCapacityModel;
use super::error::StoreError;
use super::types::{Assignment, OccupancySnapshot, Period, Slot, SlotId, UnitId};

type CellKey = (Period, SlotId);

#[derive(Debug, Default)]
struct SlotCell {
    occupants: Vec<UnitId>,
    synthetic: bool,
}

/// Authoritative occupancy for every period the process manages.
///
/// Each (period, slot) pair has its own lock. Whenever more than one lock is
/// needed the order is: slot cells in ascending `SlotId`, then the placement
/// index. The cell map itself is only held while fetching or creating a cell.
#[derive(Debug)]
pub struct OccupancyStore {
    capacity: SlotCapacityModel,
    cells: RwLock<HashMap<CellKey, Arc<Mutex<SlotCell>>>>,
    placements: Mutex<HashMap<(Period, UnitId), SlotId>>,
}

impl OccupancyStore {
    pub fn new(capacity: SlotCapacityModel) -> Self {
        Self {
            capacity,
            cells: RwLock::new(HashMap::new()),
            placements: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity_model(&self) -> &SlotCapacityModel {
        &self.capacity
    }

    fn existing_cell(&self, period: &Period, slot_id: &SlotId) -> Option<Arc<Mutex<SlotCell>>> {
        self.cells.read().get(&(*period, slot_id.clone())).cloned()
    }

    fn cell(&self, period: &Period, slot_id: &SlotId) -> Arc<Mutex<SlotCell>> {
        if let Some(cell) = self.existing_cell(period, slot_id) {
            return cell;
        }
        self.cells
            .write()
            .entry((*period, slot_id.clone()))
            .or_default()
            .clone()
    }

    /// Current occupants in arrival order; empty for an unknown slot.
    pub fn occupants_of(&self, period: &Period, slot_id: &SlotId) -> Vec<UnitId> {
        self.existing_cell(period, slot_id)
            .map(|cell| cell.lock().occupants.clone())
            .unwrap_or_default()
    }

    pub fn count_of(&self, period: &Period, slot_id: &SlotId) -> usize {
        self.existing_cell(period, slot_id)
            .map(|cell| cell.lock().occupants.len())
            .unwrap_or(0)
    }

    /// Slot the unit occupies in `period`, if any.
    pub fn slot_of(&self, period: &Period, unit_id: &UnitId) -> Option<SlotId> {
        self.placements
            .lock()
            .get(&(*period, unit_id.clone()))
            .cloned()
    }

    pub fn try_add(&self, period: &Period, slot: &Slot, unit_id: &UnitId) -> Result<(), StoreError> {
        let cell = self.cell(period, &slot.id);
        let mut cell = cell.lock();
        let mut placements = self.placements.lock();

        let key = (*period, unit_id.clone());
        if let Some(current) = placements.get(&key) {
            if *current == slot.id {
                return Err(StoreError::AlreadyAssigned {
                    unit: unit_id.clone(),
                    slot: slot.id.clone(),
                });
            }
            return Err(StoreError::AssignedElsewhere {
                unit: unit_id.clone(),
                current: current.clone(),
            });
        }

        let capacity = self.capacity.capacity_of(slot.slot_type);
        if cell.occupants.len() >= capacity {
            return Err(StoreError::CapacityExceeded {
                slot: slot.id.clone(),
                capacity,
            });
        }

        cell.occupants.push(unit_id.clone());
        placements.insert(key, slot.id.clone());
        Ok(())
    }

    pub fn remove(&self, period: &Period, slot_id: &SlotId, unit_id: &UnitId) -> Result<(), StoreError> {
        let not_found = || StoreError::NotFound {
            unit: unit_id.clone(),
            slot: slot_id.clone(),
        };

        let cell = self.existing_cell(period, slot_id).ok_or_else(not_found)?;
        let mut cell = cell.lock();
        let mut placements = self.placements.lock();

        let pos = cell
            .occupants
            .iter()
            .position(|u| u == unit_id)
            .ok_or_else(not_found)?;
        cell.occupants.remove(pos);
        placements.remove(&(*period, unit_id.clone()));
        Ok(())
    }

    /// Moves `unit_id` from `from` into `to` as one step.
    ///
    /// Both slot locks and the placement index are held for the whole
    /// operation, so no reader sees the unit in zero or two slots. Nothing is
    /// mutated when an error is returned.
    pub fn transfer(
        &self,
        period: &Period,
        unit_id: &UnitId,
        from: &SlotId,
        to: &Slot,
    ) -> Result<(), StoreError> {
        let not_found = || StoreError::NotFound {
            unit: unit_id.clone(),
            slot: from.clone(),
        };

        if *from == to.id {
            return if self.occupants_of(period, from).contains(unit_id) {
                Ok(())
            } else {
                Err(not_found())
            };
        }

        let capacity = self.capacity.capacity_of(to.slot_type);
        let from_cell = self.existing_cell(period, from).ok_or_else(not_found)?;
        let to_cell = self.cell(period, &to.id);

        let (mut from_guard, mut to_guard) = if *from < to.id {
            let f = from_cell.lock();
            let t = to_cell.lock();
            (f, t)
        } else {
            let t = to_cell.lock();
            let f = from_cell.lock();
            (f, t)
        };
        let mut placements = self.placements.lock();

        let pos = from_guard
            .occupants
            .iter()
            .position(|u| u == unit_id)
            .ok_or_else(not_found)?;

        if to_guard.occupants.len() >= capacity {
            return Err(StoreError::CapacityExceeded {
                slot: to.id.clone(),
                capacity,
            });
        }

        from_guard.occupants.remove(pos);
        to_guard.occupants.push(unit_id.clone());
        placements.insert((*period, unit_id.clone()), to.id.clone());
        Ok(())
    }

    pub fn snapshot(&self, period: &Period, slot: &Slot) -> OccupancySnapshot {
        let capacity = self.capacity.capacity_of(slot.slot_type);
        let (occupants, synthetic) = match self.existing_cell(period, &slot.id) {
            Some(cell) => {
                let cell = cell.lock();
                (cell.occupants.clone(), cell.synthetic)
            }
            None => (Vec::new(), false),
        };
        OccupancySnapshot::new(slot.id.clone(), *period, occupants, capacity, synthetic)
    }

    /// Every assignment recorded for `period`, ordered by slot then arrival.
    pub fn assignments(&self, period: &Period) -> Vec<Assignment> {
        let mut cells: Vec<(SlotId, Arc<Mutex<SlotCell>>)> = self
            .cells
            .read()
            .iter()
            .filter(|((p, _), _)| p == period)
            .map(|((_, slot_id), cell)| (slot_id.clone(), cell.clone()))
            .collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        let mut assignments = Vec::new();
        for (slot_id, cell) in cells {
            for unit_id in &cell.lock().occupants {
                assignments.push(Assignment {
                    unit_id: unit_id.clone(),
                    slot_id: slot_id.clone(),
                    period: *period,
                });
            }
        }
        assignments
    }

    /// Replaces a slot's occupancy with externally supplied data.
    ///
    /// The whole list is rejected if it exceeds capacity, repeats a unit, or
    /// places a unit that already sits in another slot for the period.
    pub fn seed(
        &self,
        period: &Period,
        slot: &Slot,
        occupants: Vec<UnitId>,
        synthetic: bool,
    ) -> Result<(), StoreError> {
        self.seed_many(period, vec![(slot, occupants)], synthetic)
    }

    /// Replaces the occupancy of several slots as one step.
    ///
    /// Every list is checked before anything changes: capacity per slot, no
    /// unit listed twice across the batch, and no unit already placed in a
    /// slot outside the batch. Units may change slots within the batch.
    pub fn seed_many(
        &self,
        period: &Period,
        mut batch: Vec<(&Slot, Vec<UnitId>)>,
        synthetic: bool,
    ) -> Result<(), StoreError> {
        // Lock order needs ascending, distinct slot ids
        batch.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        batch.dedup_by(|next, kept| {
            if next.0.id != kept.0.id {
                return false;
            }
            kept.1.append(&mut next.1);
            true
        });

        {
            let mut seen: HashSet<&UnitId> = HashSet::new();
            for (slot, occupants) in &batch {
                let capacity = self.capacity.capacity_of(slot.slot_type);
                if occupants.len() > capacity {
                    return Err(StoreError::CapacityExceeded {
                        slot: slot.id.clone(),
                        capacity,
                    });
                }
                for unit_id in occupants {
                    if !seen.insert(unit_id) {
                        return Err(StoreError::AlreadyAssigned {
                            unit: unit_id.clone(),
                            slot: slot.id.clone(),
                        });
                    }
                }
            }
        }

        let cells: Vec<Arc<Mutex<SlotCell>>> = batch
            .iter()
            .map(|(slot, _)| self.cell(period, &slot.id))
            .collect();
        let mut guards: Vec<_> = cells.iter().map(|cell| cell.lock()).collect();
        let mut placements = self.placements.lock();

        let in_batch = |slot_id: &SlotId| batch.iter().any(|(slot, _)| slot.id == *slot_id);
        for (_, occupants) in &batch {
            for unit_id in occupants {
                if let Some(current) = placements.get(&(*period, unit_id.clone())) {
                    if !in_batch(current) {
                        return Err(StoreError::AssignedElsewhere {
                            unit: unit_id.clone(),
                            current: current.clone(),
                        });
                    }
                }
            }
        }

        for guard in guards.iter_mut() {
            for unit_id in guard.occupants.drain(..) {
                placements.remove(&(*period, unit_id));
            }
        }
        for (guard, (slot, occupants)) in guards.iter_mut().zip(batch) {
            for unit_id in &occupants {
                placements.insert((*period, unit_id.clone()), slot.id.clone());
            }
            guard.occupants = occupants;
            guard.synthetic = synthetic;
        }
        Ok(())
    }

    /// Drops the record for an empty period-slot. Returns whether anything
    /// was removed; a cell that is occupied or in use by another caller is
    /// kept.
    pub fn discard_if_empty(&self, period: &Period, slot_id: &SlotId) -> bool {
        let mut cells = self.cells.write();
        let key = (*period, slot_id.clone());
        let removable = match cells.get(&key) {
            Some(cell) => Arc::strong_count(cell) == 1 && cell.lock().occupants.is_empty(),
            None => false,
        };
        if removable {
            cells.remove(&key);
        }
        removable
    }
}
