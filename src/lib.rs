//! Capacity-constrained assignment of staff to duty posts and inmates to
//! cells.
//!
//! [`assignment::AssignmentEngine`] validates and applies assign, move and
//! release requests against an in-memory [`assignment::OccupancyStore`].
//! The remaining modules load master data, seed occupancy from an external
//! source (with a deterministic fallback when it is down), render reports
//! and expose the engine over HTTP.

pub mod assignment;
pub mod config;
pub mod directory;
pub mod display;
pub mod parser;
pub mod source;
pub mod web;
