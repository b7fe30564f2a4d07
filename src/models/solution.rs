//! Solution model.
//!
//! A solution couples an assignment with the schedule the fitness oracle
//! derived from it: per-task timing, per-machine timelines, makespan,
//! penalty, and search bookkeeping (fitness history, iteration found).
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Assignment, MachineId, ProblemInstance, TaskId};

/// Serializes non-finite makespan/fitness as JSON `null` and reads `null`
/// back as `+∞`, since JSON has no infinity literal.
mod finite_or_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Same convention for fitness histories, whose leading entries are `+∞`
/// until the first feasible candidate appears.
mod finite_seq {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            if value.is_finite() {
                seq.serialize_element(value)?;
            } else {
                seq.serialize_element(&None::<f64>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Ok(Vec::<Option<f64>>::deserialize(deserializer)?
            .into_iter()
            .map(|value| value.unwrap_or(f64::INFINITY))
            .collect())
    }
}

/// Timing snapshot for one scheduled task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// The task this snapshot belongs to.
    pub task_id: TaskId,
    /// Machine the task executed on.
    pub machine_id: MachineId,
    /// Time the task started.
    pub start_time: f64,
    /// Time the task finished.
    pub completion_time: f64,
}

/// Execution timeline of one machine within a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineTimeline {
    /// The machine this timeline belongs to.
    pub machine_id: MachineId,
    /// Completion time of the last task on this machine (0 when idle).
    pub last_completion_time: f64,
    /// Tasks in execution order.
    pub assigned_tasks: Vec<TaskId>,
}

impl MachineTimeline {
    /// Creates an idle timeline for a machine.
    pub fn idle(machine_id: MachineId) -> Self {
        Self {
            machine_id,
            last_completion_time: 0.0,
            assigned_tasks: Vec::new(),
        }
    }

    /// Total busy time on this machine (sum of task durations).
    pub fn busy_time(&self, tasks: &BTreeMap<TaskId, ScheduledTask>) -> f64 {
        self.assigned_tasks
            .iter()
            .filter_map(|id| tasks.get(id))
            .map(|t| t.completion_time - t.start_time)
            .sum()
    }
}

/// A complete evaluated solution.
///
/// `fitness = makespan + total_penalty`; hard-constraint violations force
/// `makespan` (and therefore `fitness`) to `+∞`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// The assignment this solution was evaluated from.
    pub assignment: Assignment,
    /// Maximum completion time across tasks; `+∞` on hard violation.
    #[serde(with = "finite_or_null")]
    pub makespan: f64,
    /// Accumulated soft/hard constraint penalty.
    pub total_penalty: f64,
    /// Objective value used by the search.
    #[serde(with = "finite_or_null")]
    pub fitness: f64,
    /// Best fitness per iteration of the producing run.
    #[serde(with = "finite_seq", default)]
    pub fitness_history: Vec<f64>,
    /// Wall-clock time spent by the producing run, in milliseconds.
    #[serde(default)]
    pub computation_time_ms: u64,
    /// Iteration at which this solution was first found.
    #[serde(default)]
    pub iteration_found: usize,
    /// Per-task timing snapshots.
    #[serde(default)]
    pub scheduled_tasks: BTreeMap<TaskId, ScheduledTask>,
    /// Per-machine execution timelines.
    #[serde(default)]
    pub scheduled_machines: BTreeMap<MachineId, MachineTimeline>,
}

impl Solution {
    /// Creates a feasible solution from schedule snapshots.
    pub fn scheduled(
        assignment: Assignment,
        makespan: f64,
        total_penalty: f64,
        scheduled_tasks: BTreeMap<TaskId, ScheduledTask>,
        scheduled_machines: BTreeMap<MachineId, MachineTimeline>,
    ) -> Self {
        Self {
            assignment,
            makespan,
            total_penalty,
            fitness: makespan + total_penalty,
            fitness_history: Vec::new(),
            computation_time_ms: 0,
            iteration_found: 0,
            scheduled_tasks,
            scheduled_machines,
        }
    }

    /// Creates a sentinel solution for a hard-constraint violation.
    ///
    /// Makespan and fitness are `+∞`; no timing snapshots are produced.
    pub fn unschedulable(assignment: Assignment, total_penalty: f64) -> Self {
        Self {
            assignment,
            makespan: f64::INFINITY,
            total_penalty,
            fitness: f64::INFINITY,
            fitness_history: Vec::new(),
            computation_time_ms: 0,
            iteration_found: 0,
            scheduled_tasks: BTreeMap::new(),
            scheduled_machines: BTreeMap::new(),
        }
    }

    /// Whether the solution violates no hard constraint.
    pub fn is_feasible(&self) -> bool {
        self.makespan.is_finite()
    }

    /// Completion time of a task, if scheduled.
    pub fn completion_time(&self, task: TaskId) -> Option<f64> {
        self.scheduled_tasks.get(&task).map(|t| t.completion_time)
    }

    /// Start time of a task, if scheduled.
    pub fn start_time(&self, task: TaskId) -> Option<f64> {
        self.scheduled_tasks.get(&task).map(|t| t.start_time)
    }

    /// Audits the stored snapshots against the instance.
    ///
    /// Checks that every task ran at full machine speed, started no earlier
    /// than all its predecessors finished, and that no machine ran two
    /// tasks at once. Infeasible solutions fail the audit by definition.
    pub fn verify_feasibility(&self, instance: &ProblemInstance) -> bool {
        if !self.is_feasible() {
            return false;
        }

        for task in instance.tasks.values() {
            let scheduled = match self.scheduled_tasks.get(&task.id) {
                Some(s) => s,
                None => return false,
            };
            let machine = match instance.machines.get(&scheduled.machine_id) {
                Some(m) => m,
                None => return false,
            };

            let duration = scheduled.completion_time - scheduled.start_time;
            if (duration - machine.execution_time(task.computation_volume)).abs() > 1e-6 {
                return false;
            }

            for &pred in &task.predecessor_ids {
                match self.completion_time(pred) {
                    Some(finish) if finish <= scheduled.start_time + 1e-9 => {}
                    _ => return false,
                }
            }
        }

        for timeline in self.scheduled_machines.values() {
            let mut previous_end = 0.0f64;
            for id in &timeline.assigned_tasks {
                let scheduled = match self.scheduled_tasks.get(id) {
                    Some(s) => s,
                    None => return false,
                };
                if scheduled.start_time + 1e-9 < previous_end {
                    return false;
                }
                previous_end = scheduled.completion_time;
            }
        }

        true
    }
}
