use serde::Serialize;
use tracing::{debug, info, warn};

use super::capacity::SlotCapacityModel;
use super::eligibility::{is_eligible, Eligibility};
use super::error::{AssignError, StoreError};
use super::store::OccupancyStore;
use super::types::{AssignableUnit, OccupancySnapshot, Period, Slot, UnitId};

/// Result of an `assign` call.
#[derive(Debug, Clone, Serialize)]
pub struct AssignOutcome {
    pub snapshot: OccupancySnapshot,
    /// False when the unit was already in the slot and nothing changed
    pub changed: bool,
}

/// Result of a `move_unit` call: the slot the unit left and the one it
/// entered.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub source: OccupancySnapshot,
    pub destination: OccupancySnapshot,
    pub changed: bool,
}

/// Validates and applies assign, move and release requests against an
/// `OccupancyStore`.
///
/// Built once at startup and shared by reference; every operation either
/// fully applies or leaves occupancy untouched.
#[derive(Debug)]
pub struct AssignmentEngine {
    store: OccupancyStore,
}

impl AssignmentEngine {
    pub fn new(capacity: SlotCapacityModel) -> Self {
        Self {
            store: OccupancyStore::new(capacity),
        }
    }

    pub fn with_store(store: OccupancyStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn capacity_model(&self) -> &SlotCapacityModel {
        self.store.capacity_model()
    }

    fn check_eligibility(
        &self,
        unit: &AssignableUnit,
        slot: &Slot,
        period: &Period,
    ) -> Result<(), AssignError> {
        match is_eligible(unit, slot, period) {
            Eligibility::Eligible => Ok(()),
            Eligibility::Ineligible(reason) => {
                debug!(unit = %unit.id, slot = %slot.id, ?reason, "Eligibility check failed");
                Err(AssignError::ineligible(reason, &unit.id, &slot.id))
            }
        }
    }

    /// Places `unit` in `slot` for `period`.
    ///
    /// Assigning a unit to the slot it already occupies succeeds without
    /// changes. A unit placed elsewhere in the same period must be moved.
    pub fn assign(
        &self,
        unit: &AssignableUnit,
        slot: &Slot,
        period: &Period,
    ) -> Result<AssignOutcome, AssignError> {
        if let Some(current) = self.store.slot_of(period, &unit.id) {
            if current == slot.id {
                return Ok(AssignOutcome {
                    snapshot: self.store.snapshot(period, slot),
                    changed: false,
                });
            }
            return Err(AssignError::AlreadyAssignedElsewhere {
                unit: unit.id.clone(),
                current,
            });
        }

        self.check_eligibility(unit, slot, period)?;

        let changed = match self.store.try_add(period, slot, &unit.id) {
            Ok(()) => true,
            Err(StoreError::AlreadyAssigned { .. }) => false,
            Err(err) => {
                debug!(unit = %unit.id, slot = %slot.id, %period, error = %err, "Assign rejected");
                return Err(err.into());
            }
        };

        let snapshot = self.store.snapshot(period, slot);
        if changed {
            info!(
                unit = %unit.id,
                slot = %slot.id,
                %period,
                count = snapshot.count,
                capacity = snapshot.capacity,
                "Unit assigned"
            );
        }
        Ok(AssignOutcome { snapshot, changed })
    }

    /// Moves `unit` from `from` to `to` within `period` as one atomic step.
    ///
    /// Eligibility and destination capacity are checked before anything is
    /// touched; on failure the unit stays where it was. The source slot is
    /// left in place even when it becomes empty.
    pub fn move_unit(
        &self,
        unit: &AssignableUnit,
        from: &Slot,
        to: &Slot,
        period: &Period,
    ) -> Result<MoveOutcome, AssignError> {
        if from.id == to.id {
            let snapshot = self.store.snapshot(period, from);
            return Ok(MoveOutcome {
                source: snapshot.clone(),
                destination: snapshot,
                changed: false,
            });
        }

        self.check_eligibility(unit, to, period)?;

        if let Err(err) = self.store.transfer(period, &unit.id, &from.id, to) {
            debug!(
                unit = %unit.id,
                from = %from.id,
                to = %to.id,
                %period,
                error = %err,
                "Move rejected"
            );
            return Err(err.into());
        }

        let source = self.store.snapshot(period, from);
        let destination = self.store.snapshot(period, to);
        info!(
            unit = %unit.id,
            from = %from.id,
            to = %to.id,
            %period,
            source_count = source.count,
            destination_count = destination.count,
            "Unit moved"
        );
        Ok(MoveOutcome {
            source,
            destination,
            changed: true,
        })
    }

    /// Removes `unit_id` from `slot` for `period`.
    pub fn release(
        &self,
        unit_id: &UnitId,
        slot: &Slot,
        period: &Period,
    ) -> Result<OccupancySnapshot, AssignError> {
        self.store.remove(period, &slot.id, unit_id).map_err(|err| {
            debug!(unit = %unit_id, slot = %slot.id, %period, error = %err, "Release rejected");
            AssignError::from(err)
        })?;

        let snapshot = self.store.snapshot(period, slot);
        info!(unit = %unit_id, slot = %slot.id, %period, count = snapshot.count, "Unit released");
        Ok(snapshot)
    }

    pub fn occupancy(&self, slot: &Slot, period: &Period) -> OccupancySnapshot {
        self.store.snapshot(period, slot)
    }

    /// Snapshots for a group of slots, e.g. every slot in one section.
    pub fn occupancy_of_section<'a, I>(&self, slots: I, period: &Period) -> Vec<OccupancySnapshot>
    where
        I: IntoIterator<Item = &'a Slot>,
    {
        let snapshots: Vec<OccupancySnapshot> = slots
            .into_iter()
            .map(|slot| self.store.snapshot(period, slot))
            .collect();

        let synthetic = snapshots.iter().filter(|s| s.synthetic).count();
        if synthetic > 0 {
            warn!(%period, synthetic, "Serving synthetic occupancy");
        }
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::error::ErrorKind;
    use crate::assignment::types::{RequiredCategory, ShiftWindow, SlotType};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> AssignmentEngine {
        AssignmentEngine::new(SlotCapacityModel::default())
    }

    fn staff(n: usize) -> AssignableUnit {
        AssignableUnit::new(format!("s{}", n), format!("Officer {}", n)).with_category("Security")
    }

    fn night() -> Period {
        Period::shift(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), ShiftWindow::Night)
    }

    fn day() -> Period {
        Period::shift(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), ShiftWindow::Day)
    }

    #[test]
    fn test_full_ordinary_slot_rejects_sixth_unit() {
        let engine = engine();
        let slot = Slot::new("Block A");
        for n in 1..=5 {
            engine.assign(&staff(n), &slot, &day()).unwrap();
        }

        let err = engine.assign(&staff(6), &slot, &day()).unwrap_err();
        assert!(matches!(err, AssignError::SlotFull { capacity: 5, .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(engine.occupancy(&slot, &day()).count, 5);
    }

    #[test]
    fn test_high_security_slot_holds_two() {
        let engine = engine();
        let slot = Slot::new("Segregation").with_slot_type(SlotType::HighSecurity);
        let period = Period::Indefinite;

        let outcome = engine.assign(&staff(1), &slot, &period).unwrap();
        assert_eq!(outcome.snapshot.count, 1);

        let outcome = engine.assign(&staff(2), &slot, &period).unwrap();
        assert_eq!(outcome.snapshot.count, 2);

        assert!(matches!(
            engine.assign(&staff(3), &slot, &period),
            Err(AssignError::SlotFull { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_night_request_on_day_only_slot() {
        let engine = engine();
        let slot = Slot::new("Visiting Room").with_night_eligible(false);
        let unit = staff(1).with_shift_window(ShiftWindow::Day);

        let err = engine.assign(&unit, &slot, &night()).unwrap_err();
        assert!(matches!(err, AssignError::ShiftNotAllowed { .. }));
        assert_eq!(err.kind(), ErrorKind::Ineligible);
        assert_eq!(engine.occupancy(&slot, &night()).count, 0);
    }

    #[test]
    fn test_category_mismatch() {
        let engine = engine();
        let slot =
            Slot::new("Infirmary").with_required_category(RequiredCategory::Named("Medical".into()));

        assert!(matches!(
            engine.assign(&staff(1), &slot, &day()),
            Err(AssignError::CategoryMismatch { .. })
        ));

        let nurse = AssignableUnit::new("n1", "Nurse").with_category("Medical Services");
        assert!(engine.assign(&nurse, &slot, &day()).is_ok());
    }

    #[test]
    fn test_reassign_to_same_slot_is_noop() {
        let engine = engine();
        let slot = Slot::new("Gate");

        assert!(engine.assign(&staff(1), &slot, &day()).unwrap().changed);
        let again = engine.assign(&staff(1), &slot, &day()).unwrap();
        assert!(!again.changed);
        assert_eq!(again.snapshot.count, 1);
    }

    #[test]
    fn test_assign_elsewhere_requires_move() {
        let engine = engine();
        let a = Slot::new("A");
        let b = Slot::new("B");

        engine.assign(&staff(1), &a, &day()).unwrap();
        let err = engine.assign(&staff(1), &b, &day()).unwrap_err();
        assert_eq!(
            err,
            AssignError::AlreadyAssignedElsewhere {
                unit: staff(1).id,
                current: a.id.clone()
            }
        );

        // A different period is a separate booking
        assert!(engine.assign(&staff(1), &b, &night()).is_ok());
    }

    #[test]
    fn test_elsewhere_takes_precedence_over_eligibility() {
        let engine = engine();
        let a = Slot::new("A");
        let medical =
            Slot::new("M").with_required_category(RequiredCategory::Named("Medical".into()));

        engine.assign(&staff(1), &a, &day()).unwrap();
        assert!(matches!(
            engine.assign(&staff(1), &medical, &day()),
            Err(AssignError::AlreadyAssignedElsewhere { .. })
        ));
    }

    #[test]
    fn test_move_between_slots() {
        let engine = engine();
        let a = Slot::new("A");
        let b = Slot::new("B");
        for n in 1..=3 {
            engine.assign(&staff(n), &a, &day()).unwrap();
        }

        let outcome = engine.move_unit(&staff(2), &a, &b, &day()).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.source.count, 2);
        assert_eq!(outcome.destination.count, 1);
        assert!(outcome.destination.contains(&staff(2).id));
        assert!(!outcome.source.contains(&staff(2).id));
        assert_eq!(engine.store().slot_of(&day(), &staff(2).id), Some(b.id.clone()));
    }

    #[test]
    fn test_move_into_full_slot_leaves_source() {
        let engine = engine();
        let a = Slot::new("A");
        let b = Slot::new("B").with_slot_type(SlotType::HighSecurity);
        engine.assign(&staff(1), &a, &day()).unwrap();
        engine.assign(&staff(2), &b, &day()).unwrap();
        engine.assign(&staff(3), &b, &day()).unwrap();

        let before = engine.occupancy(&a, &day());
        let err = engine.move_unit(&staff(1), &a, &b, &day()).unwrap_err();
        assert!(matches!(err, AssignError::SlotFull { .. }));
        assert_eq!(engine.occupancy(&a, &day()), before);
        assert!(before.contains(&staff(1).id));
        assert_eq!(engine.occupancy(&b, &day()).count, 2);
    }

    #[test]
    fn test_move_to_ineligible_slot_leaves_source() {
        let engine = engine();
        let a = Slot::new("A");
        let b = Slot::new("B").with_night_eligible(false);
        engine.assign(&staff(1), &a, &night()).unwrap();

        assert!(matches!(
            engine.move_unit(&staff(1), &a, &b, &night()),
            Err(AssignError::ShiftNotAllowed { .. })
        ));
        assert_eq!(engine.occupancy(&a, &night()).occupants, vec![staff(1).id]);
        assert_eq!(engine.occupancy(&b, &night()).count, 0);
    }

    #[test]
    fn test_same_slot_move_is_noop() {
        let engine = engine();
        let a = Slot::new("A");
        engine.assign(&staff(1), &a, &day()).unwrap();
        let before = engine.occupancy(&a, &day());

        let outcome = engine.move_unit(&staff(1), &a, &a, &day()).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.source, before);
        assert_eq!(engine.occupancy(&a, &day()), before);

        // Also succeeds for a unit that is not there
        assert!(engine.move_unit(&staff(9), &a, &a, &day()).is_ok());
        assert_eq!(engine.occupancy(&a, &day()), before);
    }

    #[test]
    fn test_move_of_unit_not_in_source() {
        let engine = engine();
        let a = Slot::new("A");
        let b = Slot::new("B");

        assert!(matches!(
            engine.move_unit(&staff(1), &a, &b, &day()),
            Err(AssignError::NotFound { .. })
        ));
        assert_eq!(engine.occupancy(&b, &day()).count, 0);
    }

    #[test]
    fn test_release() {
        let engine = engine();
        let a = Slot::new("A");
        engine.assign(&staff(1), &a, &day()).unwrap();

        let snapshot = engine.release(&staff(1).id, &a, &day()).unwrap();
        assert_eq!(snapshot.count, 0);

        let err = engine.release(&staff(1).id, &a, &day()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_assign_for_last_place() {
        let engine = engine();
        let slot = Slot::new("Block C");
        for n in 1..=4 {
            engine.assign(&staff(n), &slot, &day()).unwrap();
        }

        let wins = AtomicUsize::new(0);
        let full = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for n in [5, 6] {
                let (engine, slot, wins, full) = (&engine, &slot, &wins, &full);
                s.spawn(move || match engine.assign(&staff(n), slot, &day()) {
                    Ok(_) => {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(AssignError::SlotFull { .. }) => {
                        full.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(full.load(Ordering::SeqCst), 1);
        assert_eq!(engine.occupancy(&slot, &day()).count, 5);
    }

    #[test]
    fn test_move_storm_keeps_high_security_ceiling() {
        let engine = engine();
        let hs = Slot::new("HS").with_slot_type(SlotType::HighSecurity);
        let sources: Vec<Slot> = (0..4).map(|i| Slot::new(format!("S{}", i))).collect();
        for (i, slot) in sources.iter().enumerate() {
            engine.assign(&staff(i), slot, &Period::Indefinite).unwrap();
        }

        std::thread::scope(|s| {
            for (i, slot) in sources.iter().enumerate() {
                let (engine, hs) = (&engine, &hs);
                s.spawn(move || {
                    for _ in 0..50 {
                        let _ = engine.move_unit(&staff(i), slot, hs, &Period::Indefinite);
                        assert!(engine.occupancy(hs, &Period::Indefinite).count <= 2);
                        let _ = engine.move_unit(&staff(i), hs, slot, &Period::Indefinite);
                    }
                });
            }
        });

        assert!(engine.occupancy(&hs, &Period::Indefinite).count <= 2);
        for i in 0..4 {
            assert!(engine.store().slot_of(&Period::Indefinite, &staff(i).id).is_some());
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Assign { unit: usize, slot: usize },
            Move { unit: usize, from: usize, to: usize },
            Release { unit: usize, slot: usize },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..12, 0usize..3).prop_map(|(unit, slot)| Op::Assign { unit, slot }),
                (0usize..12, 0usize..3, 0usize..3)
                    .prop_map(|(unit, from, to)| Op::Move { unit, from, to }),
                (0usize..12, 0usize..3).prop_map(|(unit, slot)| Op::Release { unit, slot }),
            ]
        }

        fn slots() -> Vec<Slot> {
            vec![
                Slot::new("P0"),
                Slot::new("P1").with_slot_type(SlotType::HighSecurity),
                Slot::new("P2").with_night_eligible(false),
            ]
        }

        proptest! {
            /// Property: no sequence of operations overfills a slot or
            /// double-books a unit.
            #[test]
            fn prop_capacity_and_single_placement(ops in prop::collection::vec(op(), 1..80)) {
                let engine = engine();
                let slots = slots();
                let period = night();

                for op in ops {
                    match op {
                        Op::Assign { unit, slot } => {
                            let _ = engine.assign(&staff(unit), &slots[slot], &period);
                        }
                        Op::Move { unit, from, to } => {
                            let before = engine.store().slot_of(&period, &staff(unit).id);
                            let result = engine.move_unit(&staff(unit), &slots[from], &slots[to], &period);
                            if result.is_err() {
                                prop_assert_eq!(engine.store().slot_of(&period, &staff(unit).id), before);
                            }
                        }
                        Op::Release { unit, slot } => {
                            let _ = engine.release(&staff(unit).id, &slots[slot], &period);
                        }
                    }

                    for slot in &slots {
                        let snapshot = engine.occupancy(slot, &period);
                        prop_assert!(snapshot.count <= snapshot.capacity);
                    }
                    prop_assert_eq!(engine.occupancy(&slots[2], &period).count, 0);

                    for unit in 0..12 {
                        let holders = slots
                            .iter()
                            .filter(|slot| engine.occupancy(slot, &period).contains(&staff(unit).id))
                            .count();
                        prop_assert!(holders <= 1);
                    }
                }
            }
        }
    }
}
