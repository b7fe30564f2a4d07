//! Schedule evaluation (the fitness oracle).
//!
//! Turns an [`crate::models::Assignment`] into a fully timed
//! [`crate::models::Solution`] via list scheduling, and fans out batches
//! of independent evaluations in parallel.

mod list;

pub use list::{ListScheduler, HARD_VIOLATION_PENALTY};
