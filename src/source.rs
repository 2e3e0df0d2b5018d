use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::assignment::{
    Assignment, AssignmentEngine, FallbackOccupancyGenerator, OccupancySnapshot, Period,
    SeedPolicy, Slot, SlotId, StoreError, UnitId,
};
use crate::directory::Directory;
use crate::parser::{load_assignments, ParseError};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("occupancy source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("occupancy for section {section} rejected: {source}")]
    Rejected {
        section: String,
        #[source]
        source: StoreError,
    },

    #[error("unknown section '{0}'")]
    UnknownSection(String),
}

/// Authoritative occupancy records, e.g. a backing store behind HTTP.
///
/// Implementations may return assignments for slots outside `section`;
/// those are ignored by the caller.
pub trait OccupancySource {
    fn fetch(&self, section: &str, period: &Period) -> Result<Vec<Assignment>, SourceError>;
}

/// Reads recorded assignments from a CSV export.
#[derive(Debug, Clone)]
pub struct CsvOccupancySource {
    path: PathBuf,
}

impl CsvOccupancySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OccupancySource for CsvOccupancySource {
    fn fetch(&self, _section: &str, period: &Period) -> Result<Vec<Assignment>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::Unavailable(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        let assignments = load_assignments(&self.path)?;
        Ok(assignments
            .into_iter()
            .filter(|a| a.period == *period)
            .collect())
    }
}

/// What `seed_section` loaded into the store.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub section: String,
    pub period: Period,
    /// True when the source failed and generated occupancy was used
    pub synthetic: bool,
    pub snapshots: Vec<OccupancySnapshot>,
}

/// Loads one section's occupancy for `period` into the engine's store.
///
/// Recorded data replaces whatever the store held for those slots. If the
/// source fails, or its data breaks capacity or double-booking rules, every
/// slot in the section is filled from the fallback generator instead and the
/// report is marked synthetic.
pub fn seed_section(
    engine: &AssignmentEngine,
    directory: &Directory,
    source: &dyn OccupancySource,
    generator: &FallbackOccupancyGenerator,
    policy: SeedPolicy,
    section: &str,
    period: &Period,
) -> Result<SeedReport, SourceError> {
    let slots = directory.slots_in_section(section);
    if slots.is_empty() {
        return Err(SourceError::UnknownSection(section.to_string()));
    }

    let recorded = source
        .fetch(section, period)
        .and_then(|assignments| apply_recorded(engine, section, &slots, period, assignments));

    let synthetic = match recorded {
        Ok(count) => {
            info!(section, %period, assignments = count, "Seeded occupancy from source");
            false
        }
        Err(err) => {
            warn!(section, %period, error = %err, "Occupancy source failed, using generated occupancy");
            let generated = slots
                .iter()
                .map(|slot| (*slot, generator.generate(slot, period, policy).occupants))
                .collect();
            engine
                .store()
                .seed_many(period, generated, true)
                .map_err(|source| SourceError::Rejected {
                    section: section.to_string(),
                    source,
                })?;
            true
        }
    };

    Ok(SeedReport {
        section: section.to_string(),
        period: *period,
        synthetic,
        snapshots: engine.occupancy_of_section(slots.iter().copied(), period),
    })
}

fn apply_recorded(
    engine: &AssignmentEngine,
    section: &str,
    slots: &[&Slot],
    period: &Period,
    assignments: Vec<Assignment>,
) -> Result<usize, SourceError> {
    let mut by_slot: HashMap<SlotId, Vec<UnitId>> =
        slots.iter().map(|s| (s.id.clone(), Vec::new())).collect();
    let mut count = 0;
    for assignment in assignments {
        if assignment.period != *period {
            continue;
        }
        if let Some(occupants) = by_slot.get_mut(&assignment.slot_id) {
            occupants.push(assignment.unit_id);
            count += 1;
        }
    }

    // The store checks capacity and repeated units for the whole section
    // before writing any slot
    let batch = slots
        .iter()
        .map(|slot| (*slot, by_slot.remove(&slot.id).unwrap_or_default()))
        .collect();
    engine
        .store()
        .seed_many(period, batch, false)
        .map_err(|source| SourceError::Rejected {
            section: section.to_string(),
            source,
        })?;
    Ok(count)
}
