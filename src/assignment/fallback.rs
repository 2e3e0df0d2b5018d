use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::capacity::SlotCapacityModel;
use super::types::{OccupancySnapshot, Period, Slot, SlotId, UnitId};

/// How the generator derives its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Seed from the slot id alone
    #[default]
    SlotIdentity,
    /// Seed from the slot id mixed with a fixed salt
    Salted(u64),
}

/// Produces stand-in occupancy while the authoritative source is down.
///
/// Output depends only on the slot id and the seed policy, so repeated
/// renders in degraded mode show the same numbers. Counts never exceed the
/// slot's capacity and every snapshot is flagged `synthetic`.
#[derive(Debug, Clone, Copy)]
pub struct FallbackOccupancyGenerator {
    capacity: SlotCapacityModel,
}

impl FallbackOccupancyGenerator {
    pub fn new(capacity: SlotCapacityModel) -> Self {
        Self { capacity }
    }

    pub fn generate(&self, slot: &Slot, period: &Period, policy: SeedPolicy) -> OccupancySnapshot {
        let capacity = self.capacity.capacity_of(slot.slot_type);
        // ChaCha8 keeps the same stream per seed across rand releases
        let mut rng = ChaCha8Rng::seed_from_u64(seed_for(&slot.id, policy));
        let count = (rng.next_u64() % (capacity as u64 + 1)) as usize;

        let occupants = (1..=count).map(|n| synthetic_unit(&slot.id, n)).collect();
        OccupancySnapshot::new(slot.id.clone(), *period, occupants, capacity, true)
    }
}

pub fn synthetic_unit(slot_id: &SlotId, n: usize) -> UnitId {
    UnitId::new(format!("synthetic:{}:{}", slot_id, n))
}

fn seed_for(slot_id: &SlotId, policy: SeedPolicy) -> u64 {
    let base = fnv1a(slot_id.as_str().as_bytes());
    match policy {
        SeedPolicy::SlotIdentity => base,
        SeedPolicy::Salted(salt) => base ^ salt.rotate_left(17),
    }
}

// FNV-1a, stable across builds and platforms unlike std's hasher
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}
