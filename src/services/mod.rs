//! Core services for the classwatch server
//!
//! The attendance decision engine, the duplicate-attempt tracker and the
//! stats aggregator. These hold the policy logic; everything else in the
//! crate is plumbing around them.

pub mod attendance;
pub mod duplicate_tracker;
pub mod stats;

pub use attendance::{AttendanceEngine, Outcome, UNAUTHORIZED_NAME};
pub use duplicate_tracker::{DuplicateAttempt, DuplicateTracker, TRACKER_CAPACITY};
pub use stats::{Stats, StatsAggregator};
