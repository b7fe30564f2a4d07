//! Problem instance model.
//!
//! An instance bundles the task set, the machine park, and the penalty
//! coefficients used by the fitness oracle. Instances are immutable for
//! the duration of a run and are shared read-only across evaluation
//! workers; all per-evaluation state lives in solution snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MachineId, Task, TaskId, VirtualMachine};
use crate::validation::{validate_instance, ValidationResult};

fn default_penalty_coefficient() -> f64 {
    1000.0
}

/// A complete static scheduling problem.
///
/// Tasks are partially ordered by predecessor ids; the precedence graph
/// must be a DAG ([`ProblemInstance::validate`] checks this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemInstance {
    /// Tasks keyed by id.
    pub tasks: BTreeMap<TaskId, Task>,
    /// Machines keyed by id.
    pub machines: BTreeMap<MachineId, VirtualMachine>,
    /// Penalty per unit of memory shortfall for infeasible placements.
    #[serde(default = "default_penalty_coefficient")]
    pub memory_penalty_coefficient: f64,
    /// Reserved for soft-precedence variants. The list scheduler enforces
    /// precedence structurally and never reads this coefficient.
    #[serde(default = "default_penalty_coefficient")]
    pub precedence_penalty_coefficient: f64,
}

impl Default for ProblemInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemInstance {
    /// Creates an empty instance with default penalty coefficients.
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            machines: BTreeMap::new(),
            memory_penalty_coefficient: default_penalty_coefficient(),
            precedence_penalty_coefficient: default_penalty_coefficient(),
        }
    }

    /// Adds a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.insert(task.id, task);
        self
    }

    /// Adds a machine.
    pub fn with_machine(mut self, machine: VirtualMachine) -> Self {
        self.machines.insert(machine.id, machine);
        self
    }

    /// Sets the memory penalty coefficient.
    pub fn with_memory_penalty(mut self, coefficient: f64) -> Self {
        self.memory_penalty_coefficient = coefficient;
        self
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of machines.
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    /// Machine ids in ascending order.
    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.machines.keys().copied().collect()
    }

    /// Machines with enough memory for the given task, ids ascending.
    pub fn feasible_machines(&self, task: &Task) -> Vec<MachineId> {
        self.machines
            .values()
            .filter(|m| m.can_host(task.memory_requirement))
            .map(|m| m.id)
            .collect()
    }

    /// Validates structural integrity: positive volumes and performance,
    /// existing predecessor references, and an acyclic precedence graph.
    pub fn validate(&self) -> ValidationResult {
        validate_instance(self)
    }

    /// Whether the instance passes all validation checks.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_builder() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(5.0))
            .with_task(Task::new(2, 20.0).with_predecessor(1))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0))
            .with_memory_penalty(500.0);

        assert_eq!(instance.task_count(), 2);
        assert_eq!(instance.machine_count(), 1);
        assert!((instance.memory_penalty_coefficient - 500.0).abs() < 1e-10);
        assert!(instance.is_valid());
    }

    #[test]
    fn test_feasible_machines() {
        let instance = ProblemInstance::new()
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(4.0))
            .with_machine(VirtualMachine::new(2, 10.0).with_memory(8.0))
            .with_machine(VirtualMachine::new(3, 10.0).with_memory(16.0));

        let task = Task::new(1, 10.0).with_memory(8.0);
        assert_eq!(instance.feasible_machines(&task), vec![2, 3]);

        let heavy = Task::new(2, 10.0).with_memory(100.0);
        assert!(instance.feasible_machines(&heavy).is_empty());
    }

    #[test]
    fn test_default_penalty_coefficients() {
        let instance = ProblemInstance::new();
        assert!((instance.memory_penalty_coefficient - 1000.0).abs() < 1e-10);
        assert!((instance.precedence_penalty_coefficient - 1000.0).abs() < 1e-10);
    }
}
