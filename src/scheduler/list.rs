//! List-scheduling evaluator.
//!
//! # Algorithm
//!
//! 1. Penalty pre-pass: every task placed on a machine without enough
//!    memory accumulates `(requirement - available) * coefficient`; any
//!    violation makes the assignment unschedulable (infinite makespan).
//! 2. Main pass: ready tasks (all predecessors complete) are scheduled in
//!    ascending task-id order; each starts at the later of its machine
//!    becoming free and its last predecessor finishing.
//!
//! The evaluator never mutates the instance: all timing state lives in
//! snapshots owned by the returned solution, so batches of assignments
//! evaluate in parallel without cross-interference.
//!
//! # Complexity
//! O(V + E) per evaluation over tasks V and precedence edges E, plus the
//! ready-queue ordering.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 5: Parallel Machine Models

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::models::{
    Assignment, MachineTimeline, ProblemInstance, ScheduledTask, Solution, TaskId,
};

/// Penalty charged per task whose assignment cannot be interpreted at all
/// (missing machine reference or unassigned task). Dominates any realistic
/// memory shortfall penalty.
pub const HARD_VIOLATION_PENALTY: f64 = 1e9;

/// Deterministic list-scheduling evaluator over a shared instance.
///
/// # Example
/// ```
/// use vm_sched::models::{Assignment, ProblemInstance, Task, VirtualMachine};
/// use vm_sched::scheduler::ListScheduler;
///
/// let instance = ProblemInstance::new()
///     .with_task(Task::new(1, 10.0).with_memory(5.0))
///     .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));
/// let assignment: Assignment = [(1, 1)].into_iter().collect();
///
/// let solution = ListScheduler::new(&instance).schedule(&assignment);
/// assert!((solution.makespan - 1.0).abs() < 1e-10);
/// assert!((solution.total_penalty - 0.0).abs() < 1e-10);
/// ```
pub struct ListScheduler<'a> {
    instance: &'a ProblemInstance,
}

impl<'a> ListScheduler<'a> {
    /// Creates an evaluator over the given instance.
    pub fn new(instance: &'a ProblemInstance) -> Self {
        Self { instance }
    }

    /// Evaluates one assignment into a timed solution.
    ///
    /// Hard violations (memory shortfall, missing machine, unassigned
    /// task) short-circuit: the result carries the accumulated penalty
    /// and an infinite makespan, with no timing snapshots.
    pub fn schedule(&self, assignment: &Assignment) -> Solution {
        if let Some(penalty) = self.constraint_penalty(assignment) {
            return Solution::unschedulable(assignment.clone(), penalty);
        }
        self.run_list_scheduling(assignment)
    }

    /// Evaluates a batch of assignments in parallel.
    ///
    /// The returned vector matches the input order (results are collected
    /// by index, not appended under a lock). A panicking evaluation only
    /// poisons its own slot, which becomes a sentinel with infinite
    /// fitness.
    pub fn schedule_all(&self, assignments: &[Assignment]) -> Vec<Solution> {
        assignments
            .par_iter()
            .map(|assignment| {
                catch_unwind(AssertUnwindSafe(|| self.schedule(assignment))).unwrap_or_else(|_| {
                    Solution::unschedulable(assignment.clone(), HARD_VIOLATION_PENALTY)
                })
            })
            .collect()
    }

    /// Pre-pass over the assignment. Returns the accumulated penalty when
    /// any hard constraint is violated, `None` when timing may proceed.
    fn constraint_penalty(&self, assignment: &Assignment) -> Option<f64> {
        let mut penalty = 0.0;
        let mut violated = false;

        for task in self.instance.tasks.values() {
            match assignment
                .machine_for(task.id)
                .and_then(|id| self.instance.machines.get(&id))
            {
                Some(machine) => {
                    if !machine.can_host(task.memory_requirement) {
                        penalty += (task.memory_requirement - machine.available_memory)
                            * self.instance.memory_penalty_coefficient;
                        violated = true;
                    }
                }
                None => {
                    penalty += HARD_VIOLATION_PENALTY;
                    violated = true;
                }
            }
        }

        violated.then_some(penalty)
    }

    fn run_list_scheduling(&self, assignment: &Assignment) -> Solution {
        let tasks = &self.instance.tasks;

        let mut scheduled: BTreeMap<TaskId, ScheduledTask> = BTreeMap::new();
        let mut timelines: BTreeMap<_, _> = self
            .instance
            .machines
            .keys()
            .map(|&id| (id, MachineTimeline::idle(id)))
            .collect();

        // Successor lists and outstanding predecessor counts.
        let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut remaining_preds: HashMap<TaskId, usize> = HashMap::new();
        for task in tasks.values() {
            remaining_preds.insert(task.id, task.predecessor_ids.len());
            for &pred in &task.predecessor_ids {
                successors.entry(pred).or_default().push(task.id);
            }
        }

        // Ready queue ordered by task id (deterministic tie-break).
        let mut ready: BTreeSet<TaskId> = tasks
            .values()
            .filter(|t| t.is_entry())
            .map(|t| t.id)
            .collect();

        let mut completed: BTreeSet<TaskId> = BTreeSet::new();
        let mut max_completion = 0.0f64;

        while completed.len() < tasks.len() {
            let batch: Vec<TaskId> = ready.iter().copied().collect();
            let mut progressed = false;

            for id in batch {
                let task = &tasks[&id];
                // Guards against staged insertion of not-yet-eligible tasks.
                if !task.predecessor_ids.iter().all(|p| completed.contains(p)) {
                    continue;
                }

                let machine_id = assignment
                    .machine_for(id)
                    .expect("assignment verified total in pre-pass");
                let machine = &self.instance.machines[&machine_id];
                let timeline = timelines.get_mut(&machine_id).expect("machine verified");

                let pred_finish = task
                    .predecessor_ids
                    .iter()
                    .filter_map(|p| scheduled.get(p))
                    .map(|s| s.completion_time)
                    .fold(0.0f64, f64::max);
                let start_time = timeline.last_completion_time.max(pred_finish);
                let completion_time = start_time + machine.execution_time(task.computation_volume);

                timeline.last_completion_time = completion_time;
                timeline.assigned_tasks.push(id);
                scheduled.insert(
                    id,
                    ScheduledTask {
                        task_id: id,
                        machine_id,
                        start_time,
                        completion_time,
                    },
                );

                ready.remove(&id);
                completed.insert(id);
                progressed = true;
                max_completion = max_completion.max(completion_time);

                // Promote successors whose predecessors are now complete.
                if let Some(succs) = successors.get(&id) {
                    for &succ in succs {
                        let count = remaining_preds.get_mut(&succ).expect("known task");
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(succ);
                        }
                    }
                }
            }

            if !progressed {
                // Unreachable on a validated DAG; treat a stall as a hard
                // violation rather than looping forever.
                return Solution::unschedulable(assignment.clone(), HARD_VIOLATION_PENALTY);
            }
        }

        Solution::scheduled(assignment.clone(), max_completion, 0.0, scheduled, timelines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, VirtualMachine};

    fn assignment_of(pairs: &[(TaskId, u32)]) -> Assignment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_single_task_single_machine() {
        // Volume 10 on performance 10 → makespan 1.0, no penalty.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(5.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1)]));
        assert!((solution.makespan - 1.0).abs() < 1e-10);
        assert!((solution.total_penalty - 0.0).abs() < 1e-10);
        assert!((solution.fitness - 1.0).abs() < 1e-10);
        assert!(solution.verify_feasibility(&instance));
    }

    #[test]
    fn test_chain_precedence() {
        // 1 → 2 → 3 with volumes (10, 20, 30) on one machine of performance 10:
        // starts at (0, 1, 3), makespan 6.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_task(Task::new(2, 20.0).with_memory(1.0).with_predecessor(1))
            .with_task(Task::new(3, 30.0).with_memory(1.0).with_predecessor(2))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        let solution =
            ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1), (2, 1), (3, 1)]));
        assert_eq!(solution.start_time(1), Some(0.0));
        assert_eq!(solution.start_time(2), Some(1.0));
        assert_eq!(solution.start_time(3), Some(3.0));
        assert!((solution.makespan - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_independent_tasks_on_heterogeneous_machines() {
        // Equal volumes on performance 10 vs 5 → makespan max(1, 2) = 2.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_task(Task::new(2, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0))
            .with_machine(VirtualMachine::new(2, 5.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1), (2, 2)]));
        assert!((solution.makespan - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_memory_violation_penalized() {
        // Requirement 100 on capacity 1 → penalty ≥ 99 * 1000, infinite makespan.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(100.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(1.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1)]));
        assert!(solution.makespan.is_infinite());
        assert!(solution.fitness.is_infinite());
        assert!(solution.total_penalty >= 99.0 * 1000.0);
        assert!(solution.scheduled_tasks.is_empty());
    }

    #[test]
    fn test_fork_join_dag() {
        // 1 → {2, 3} → 4 on two machines; 2 and 3 overlap, 4 waits for both.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_task(Task::new(2, 10.0).with_memory(1.0).with_predecessor(1))
            .with_task(Task::new(3, 10.0).with_memory(1.0).with_predecessor(1))
            .with_task(Task::new(4, 10.0).with_memory(1.0).with_predecessors([2, 3]))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0))
            .with_machine(VirtualMachine::new(2, 10.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance)
            .schedule(&assignment_of(&[(1, 1), (2, 1), (3, 2), (4, 1)]));
        assert_eq!(solution.start_time(1), Some(0.0));
        assert!(solution.start_time(2).unwrap() >= 1.0);
        assert!(solution.start_time(3).unwrap() >= 1.0);
        assert!(solution.start_time(4).unwrap() >= 2.0);
        assert!((solution.makespan - 3.0).abs() < 1e-10);
        assert!(solution.verify_feasibility(&instance));
    }

    #[test]
    fn test_empty_instance() {
        let instance = ProblemInstance::new();
        let solution = ListScheduler::new(&instance).schedule(&Assignment::new());
        assert!((solution.makespan - 0.0).abs() < 1e-10);
        assert!((solution.fitness - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_machine_is_hard_violation() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 99)]));
        assert!(solution.fitness.is_infinite());
        assert!(solution.total_penalty >= HARD_VIOLATION_PENALTY);
    }

    #[test]
    fn test_unassigned_task_is_hard_violation() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_task(Task::new(2, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1)]));
        assert!(solution.fitness.is_infinite());
    }

    #[test]
    fn test_machine_sequencing_no_overlap() {
        // Two independent tasks on the same machine execute back to back.
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_task(Task::new(2, 20.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1), (2, 1)]));
        // Ready queue is id-ordered: task 1 runs first.
        assert_eq!(solution.start_time(1), Some(0.0));
        assert_eq!(solution.start_time(2), Some(1.0));
        assert!((solution.makespan - 3.0).abs() < 1e-10);
        let timeline = &solution.scheduled_machines[&1];
        assert_eq!(timeline.assigned_tasks, vec![1, 2]);
        assert!((timeline.last_completion_time - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_performance_machine_gives_infinite_makespan() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 0.0).with_memory(10.0));

        let solution = ListScheduler::new(&instance).schedule(&assignment_of(&[(1, 1)]));
        assert!(solution.makespan.is_infinite());
        // No memory violation: the penalty stays zero even though timing blew up.
        assert!((solution.total_penalty - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_determinism() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 12.0).with_memory(2.0))
            .with_task(Task::new(2, 7.0).with_memory(2.0).with_predecessor(1))
            .with_task(Task::new(3, 25.0).with_memory(2.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(8.0))
            .with_machine(VirtualMachine::new(2, 4.0).with_memory(8.0));
        let assignment = assignment_of(&[(1, 2), (2, 1), (3, 1)]);

        let scheduler = ListScheduler::new(&instance);
        let a = scheduler.schedule(&assignment);
        let b = scheduler.schedule(&assignment);
        assert_eq!(a.makespan, b.makespan);
        assert_eq!(a.total_penalty, b.total_penalty);
        assert_eq!(a.scheduled_tasks, b.scheduled_tasks);
    }

    #[test]
    fn test_penalty_monotone_in_memory_shortfall() {
        let base = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(10.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(5.0));
        let worse = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(20.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(5.0));
        let assignment = assignment_of(&[(1, 1)]);

        let p1 = ListScheduler::new(&base).schedule(&assignment).total_penalty;
        let p2 = ListScheduler::new(&worse)
            .schedule(&assignment)
            .total_penalty;
        assert!(p2 > p1);
    }

    #[test]
    fn test_schedule_all_matches_input_order() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0))
            .with_machine(VirtualMachine::new(2, 5.0).with_memory(10.0));

        let assignments = vec![assignment_of(&[(1, 1)]), assignment_of(&[(1, 2)])];
        let solutions = ListScheduler::new(&instance).schedule_all(&assignments);
        assert_eq!(solutions.len(), 2);
        assert!((solutions[0].makespan - 1.0).abs() < 1e-10);
        assert!((solutions[1].makespan - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_schedule_all_isolates_failures() {
        let instance = ProblemInstance::new()
            .with_task(Task::new(1, 10.0).with_memory(1.0))
            .with_machine(VirtualMachine::new(1, 10.0).with_memory(10.0));

        // A broken assignment alongside a good one: only its slot is poisoned.
        let assignments = vec![assignment_of(&[(1, 42)]), assignment_of(&[(1, 1)])];
        let solutions = ListScheduler::new(&instance).schedule_all(&assignments);
        assert!(solutions[0].fitness.is_infinite());
        assert!((solutions[1].fitness - 1.0).abs() < 1e-10);
    }
}
