//! Virtual machine model.
//!
//! Machines are the heterogeneous execution targets: each has a performance
//! rating (work units per time unit) and a fixed memory capacity. Per-run
//! timeline state (busy-until time, executed task order) is kept in
//! [`crate::models::MachineTimeline`] snapshots owned by each evaluation.

use serde::{Deserialize, Serialize};

/// Identifier of a virtual machine.
pub type MachineId = u32;

/// A virtual machine that executes tasks sequentially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    /// Unique machine identifier.
    pub id: MachineId,
    /// Processing speed in work units per time unit. Must be positive.
    pub performance: f64,
    /// Memory capacity in abstract memory units.
    pub available_memory: f64,
}

impl VirtualMachine {
    /// Creates a machine with the given id and performance rating.
    pub fn new(id: MachineId, performance: f64) -> Self {
        Self {
            id,
            performance,
            available_memory: 0.0,
        }
    }

    /// Sets the memory capacity.
    pub fn with_memory(mut self, available_memory: f64) -> Self {
        self.available_memory = available_memory;
        self
    }

    /// Whether this machine has enough memory to host a task with the
    /// given requirement.
    #[inline]
    pub fn can_host(&self, memory_requirement: f64) -> bool {
        self.available_memory >= memory_requirement
    }

    /// Time to execute the given computation volume on this machine.
    ///
    /// Returns `f64::INFINITY` when the performance rating is not positive.
    #[inline]
    pub fn execution_time(&self, computation_volume: f64) -> f64 {
        if self.performance > 0.0 {
            computation_volume / self.performance
        } else {
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_builder() {
        let vm = VirtualMachine::new(1, 10.0).with_memory(16.0);
        assert_eq!(vm.id, 1);
        assert!((vm.performance - 10.0).abs() < 1e-10);
        assert!((vm.available_memory - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_can_host() {
        let vm = VirtualMachine::new(1, 10.0).with_memory(16.0);
        assert!(vm.can_host(16.0));
        assert!(vm.can_host(0.0));
        assert!(!vm.can_host(16.1));
    }

    #[test]
    fn test_execution_time() {
        let vm = VirtualMachine::new(1, 10.0);
        assert!((vm.execution_time(25.0) - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_execution_time_zero_performance() {
        let vm = VirtualMachine::new(1, 0.0);
        assert!(vm.execution_time(25.0).is_infinite());
    }
}
