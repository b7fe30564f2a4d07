//! Candidate assignment construction and repair.
//!
//! Both drivers encode candidates as plain [`Assignment`]s. Construction
//! places every task on a uniformly random machine; repair rewrites
//! placements that obviously violate memory capacity whenever a feasible
//! alternative exists, leaving hopeless tasks in place for the penalty
//! path to price.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::models::{Assignment, ProblemInstance};

/// Builds a uniformly random assignment over the instance's machines.
///
/// The result is unrepaired; callers that need memory feasibility run
/// [`repair`] afterwards.
pub fn random_assignment<R: Rng>(instance: &ProblemInstance, rng: &mut R) -> Assignment {
    let machine_ids = instance.machine_ids();
    let mut assignment = Assignment::new();
    for &task_id in instance.tasks.keys() {
        if let Some(&machine) = machine_ids.choose(rng) {
            assignment.assign(task_id, machine);
        }
    }
    assignment
}

/// Repairs memory-infeasible placements in place.
///
/// Every task whose machine lacks sufficient memory (or whose machine
/// reference is dangling) moves to a uniformly random machine with enough
/// capacity. Tasks no machine can host are left unchanged; the scheduler
/// prices those as penalties. Deterministic given the passed RNG.
pub fn repair<R: Rng>(instance: &ProblemInstance, assignment: &mut Assignment, rng: &mut R) {
    for task in instance.tasks.values() {
        let hosted = assignment
            .machine_for(task.id)
            .and_then(|id| instance.machines.get(&id))
            .is_some_and(|m| m.can_host(task.memory_requirement));
        if hosted {
            continue;
        }

        let feasible = instance.feasible_machines(task);
        if let Some(&machine) = feasible.choose(rng) {
            assignment.assign(task.id, machine);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, VirtualMachine};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn tight_instance() -> ProblemInstance {
        ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(12.0))
            .with_task(Task::new(2, 10.0).with_memory(2.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(4.0))
            .with_machine(VirtualMachine::new(2, 10.0).with_memory(16.0))
    }

    #[test]
    fn test_random_assignment_is_total() {
        let instance = tight_instance();
        let mut rng = SmallRng::seed_from_u64(42);
        let assignment = random_assignment(&instance, &mut rng);

        assert_eq!(assignment.len(), instance.task_count());
        for (_, machine) in assignment.iter() {
            assert!(instance.machines.contains_key(&machine));
        }
    }

    #[test]
    fn test_repair_moves_infeasible_task() {
        let instance = tight_instance();
        let mut rng = SmallRng::seed_from_u64(42);
        // Task 1 (memory 12) forced onto machine 1 (capacity 4).
        let mut assignment: Assignment = [(1, 1), (2, 1)].into_iter().collect();
        repair(&instance, &mut assignment, &mut rng);

        // Only machine 2 can host task 1; task 2 fits where it is.
        assert_eq!(assignment.machine_for(1), Some(2));
        assert_eq!(assignment.machine_for(2), Some(1));
    }

    #[test]
    fn test_repair_leaves_hopeless_task() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(100.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(4.0))
            .with_machine(VirtualMachine::new(2, 10.0).with_memory(8.0));
        let mut rng = SmallRng::seed_from_u64(42);
        let mut assignment: Assignment = [(1, 1)].into_iter().collect();
        repair(&instance, &mut assignment, &mut rng);

        // No machine fits: the placement stays for the penalty path.
        assert_eq!(assignment.machine_for(1), Some(1));
    }

    #[test]
    fn test_repair_fixes_dangling_machine() {
        let instance = tight_instance();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut assignment: Assignment = [(1, 99), (2, 99)].into_iter().collect();
        repair(&instance, &mut assignment, &mut rng);

        assert_eq!(assignment.machine_for(1), Some(2));
        assert!(matches!(assignment.machine_for(2), Some(1) | Some(2)));
    }

    #[test]
    fn test_repair_is_deterministic_per_seed() {
        let instance = tight_instance();
        let make = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut assignment = random_assignment(&instance, &mut rng);
            repair(&instance, &mut assignment, &mut rng);
            assignment
        };
        assert_eq!(make(7), make(7));
    }
}
