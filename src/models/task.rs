//! Compute task model.
//!
//! A task is an indivisible unit of work characterized by its computation
//! volume (abstract work units) and memory footprint. Tasks are partially
//! ordered by predecessor edges stored as ids, forming a DAG.
//!
//! # Reference
//! Topcuoglu et al. (2002), "Performance-Effective and Low-Complexity
//! Task Scheduling for Heterogeneous Computing"

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a task. Positive and unique within an instance.
pub type TaskId = u32;

/// A compute task to be assigned to a virtual machine.
///
/// Start and completion times are *not* stored here: they are produced per
/// evaluation by the scheduler and live in [`crate::models::ScheduledTask`]
/// snapshots, so the canonical instance is never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Amount of work, in abstract work units. Must be positive.
    pub computation_volume: f64,
    /// Memory needed on the hosting machine, in abstract memory units.
    pub memory_requirement: f64,
    /// Ids of tasks that must complete before this one starts.
    #[serde(default)]
    pub predecessor_ids: BTreeSet<TaskId>,
}

impl Task {
    /// Creates a task with the given id and computation volume.
    pub fn new(id: TaskId, computation_volume: f64) -> Self {
        Self {
            id,
            computation_volume,
            memory_requirement: 0.0,
            predecessor_ids: BTreeSet::new(),
        }
    }

    /// Sets the memory requirement.
    pub fn with_memory(mut self, memory_requirement: f64) -> Self {
        self.memory_requirement = memory_requirement;
        self
    }

    /// Adds a predecessor.
    pub fn with_predecessor(mut self, id: TaskId) -> Self {
        self.predecessor_ids.insert(id);
        self
    }

    /// Adds several predecessors.
    pub fn with_predecessors(mut self, ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.predecessor_ids.extend(ids);
        self
    }

    /// Whether this task can start immediately (no predecessors).
    pub fn is_entry(&self) -> bool {
        self.predecessor_ids.is_empty()
    }

    /// Number of predecessors.
    pub fn predecessor_count(&self) -> usize {
        self.predecessor_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new(3, 42.0)
            .with_memory(8.0)
            .with_predecessor(1)
            .with_predecessor(2);

        assert_eq!(task.id, 3);
        assert!((task.computation_volume - 42.0).abs() < 1e-10);
        assert!((task.memory_requirement - 8.0).abs() < 1e-10);
        assert_eq!(task.predecessor_count(), 2);
        assert!(!task.is_entry());
    }

    #[test]
    fn test_entry_task() {
        let task = Task::new(1, 10.0);
        assert!(task.is_entry());
        assert_eq!(task.predecessor_count(), 0);
    }

    #[test]
    fn test_duplicate_predecessors_collapse() {
        let task = Task::new(5, 1.0).with_predecessors([2, 2, 3]);
        assert_eq!(task.predecessor_count(), 2);
    }
}
