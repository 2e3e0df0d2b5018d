pub mod types;
pub mod error;
pub mod capacity;
pub mod eligibility;
pub mod store;
pub mod engine;
pub mod fallback;

pub use types::{
    Assignment, AssignableUnit, OccupancySnapshot, OccupancyStatus, Period, RequiredCategory,
    ShiftWindow, Slot, SlotId, SlotType, UnitId,
};
pub use error::{AssignError, ConfigError, ErrorKind, StoreError};
pub use capacity::SlotCapacityModel;
pub use eligibility::{is_eligible, Eligibility, IneligibleReason};
pub use store::OccupancyStore;
pub use engine::{AssignOutcome, AssignmentEngine, MoveOutcome};
pub use fallback::{FallbackOccupancyGenerator, SeedPolicy};
