//! Scheduling problem domain models.
//!
//! Core data types for DAG-constrained task scheduling on heterogeneous
//! virtual machines: the immutable problem description ([`ProblemInstance`]),
//! the search decision variable ([`Assignment`]), and the evaluated result
//! ([`Solution`] with per-task and per-machine snapshots).
//!
//! The canonical instance is never mutated during a run; every evaluation
//! owns its snapshots, so instances can be shared freely across workers.

mod assignment;
mod instance;
mod machine;
mod solution;
mod task;

pub use assignment::Assignment;
pub use instance::ProblemInstance;
pub use machine::{MachineId, VirtualMachine};
pub use solution::{MachineTimeline, ScheduledTask, Solution};
pub use task::{Task, TaskId};
