//! Task-to-machine assignment.
//!
//! An assignment is the decision variable of the search: a total map from
//! task id to machine id. Search drivers generate and perturb assignments;
//! the scheduler turns them into timed solutions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MachineId, TaskId};

/// A total mapping from task id to machine id.
///
/// Iteration order is ascending by task id, which keeps every operator
/// built on top of it (crossover cut points, repair, position updates)
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    machine_of: BTreeMap<TaskId, MachineId>,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a task to a machine, replacing any previous placement.
    pub fn assign(&mut self, task: TaskId, machine: MachineId) {
        self.machine_of.insert(task, machine);
    }

    /// The machine the task is placed on, if assigned.
    pub fn machine_for(&self, task: TaskId) -> Option<MachineId> {
        self.machine_of.get(&task).copied()
    }

    /// Iterates `(task, machine)` pairs in ascending task-id order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, MachineId)> + '_ {
        self.machine_of.iter().map(|(&t, &m)| (t, m))
    }

    /// Task ids in ascending order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.machine_of.keys().copied().collect()
    }

    /// Number of assigned tasks.
    pub fn len(&self) -> usize {
        self.machine_of.len()
    }

    /// Whether no task is assigned.
    pub fn is_empty(&self) -> bool {
        self.machine_of.is_empty()
    }
}

impl FromIterator<(TaskId, MachineId)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (TaskId, MachineId)>>(iter: I) -> Self {
        Self {
            machine_of: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_lookup() {
        let mut a = Assignment::new();
        a.assign(1, 2);
        a.assign(2, 1);
        a.assign(1, 3); // replaces

        assert_eq!(a.machine_for(1), Some(3));
        assert_eq!(a.machine_for(2), Some(1));
        assert_eq!(a.machine_for(9), None);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_iteration_order() {
        let a: Assignment = [(3, 1), (1, 2), (2, 3)].into_iter().collect();
        let tasks: Vec<_> = a.iter().map(|(t, _)| t).collect();
        assert_eq!(tasks, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty() {
        let a = Assignment::new();
        assert!(a.is_empty());
        assert_eq!(a.len(), 0);
    }
}
