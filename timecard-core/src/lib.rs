//! Timecard Core Library
//!
//! Pure, I/O-free domain logic for the timecard gateway:
//! - The nested week → project → task → day container model
//! - Reconciliation rules for merging and deleting day entries
//! - Decimal-hours duration arithmetic
//! - Name-resolution ranking for project and label lookups

pub mod duration;
pub mod error;
pub mod reconcile;
pub mod resolve;
pub mod week;

pub use duration::HoursMinutes;
pub use error::Error;
pub use week::{DayEntry, ProjectEntry, TaskEntry, WeekLog};

/// Result type for timecard-core operations
pub type Result<T> = std::result::Result<T, Error>;
