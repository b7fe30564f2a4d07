//! Chart-ready projections over a solution.
//!
//! Pure functions turning a [`Solution`] into flat tables a UI layer can
//! render directly: Gantt bars per machine, the convergence curve, and a
//! machine utilization summary. No chart or host concerns live here.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};

use crate::models::{MachineId, ProblemInstance, Solution, TaskId};

/// One bar of a Gantt chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttRow {
    /// Machine the bar belongs to.
    pub machine_id: MachineId,
    /// Task rendered by the bar.
    pub task_id: TaskId,
    /// Bar start.
    pub start_time: f64,
    /// Bar end.
    pub completion_time: f64,
}

/// One point of the convergence curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergencePoint {
    /// 1-based iteration.
    pub iteration: usize,
    /// Best fitness known at that iteration.
    pub best_fitness: f64,
}

/// Busy time and utilization of one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationRow {
    /// Machine the row describes.
    pub machine_id: MachineId,
    /// Number of tasks executed.
    pub task_count: usize,
    /// Total busy time.
    pub busy_time: f64,
    /// Busy time over makespan, in `[0, 1]`.
    pub utilization: f64,
}

/// All chart-ready tables for one solution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationData {
    /// Gantt bars ordered by machine id, then start time.
    pub gantt: Vec<GanttRow>,
    /// Best-fitness curve across the producing run.
    pub convergence: Vec<ConvergencePoint>,
    /// Per-machine utilization, ordered by machine id.
    pub utilization: Vec<UtilizationRow>,
    /// Mean utilization across machines.
    pub average_utilization: f64,
    /// Whether the solution violates no hard constraint.
    pub feasible: bool,
}

/// Projects a solution into chart-ready tables.
///
/// Infeasible solutions produce an empty Gantt and zero utilization but
/// still expose the convergence curve.
pub fn project(instance: &ProblemInstance, solution: &Solution) -> VisualizationData {
    let mut gantt: Vec<GanttRow> = Vec::with_capacity(solution.scheduled_tasks.len());
    for timeline in solution.scheduled_machines.values() {
        for task_id in &timeline.assigned_tasks {
            if let Some(scheduled) = solution.scheduled_tasks.get(task_id) {
                gantt.push(GanttRow {
                    machine_id: timeline.machine_id,
                    task_id: *task_id,
                    start_time: scheduled.start_time,
                    completion_time: scheduled.completion_time,
                });
            }
        }
    }

    let convergence = solution
        .fitness_history
        .iter()
        .enumerate()
        .map(|(index, &best_fitness)| ConvergencePoint {
            iteration: index + 1,
            best_fitness,
        })
        .collect();

    let horizon = solution.makespan;
    let mut utilization: Vec<UtilizationRow> = Vec::with_capacity(instance.machine_count());
    for &machine_id in instance.machines.keys() {
        let (task_count, busy_time) = solution
            .scheduled_machines
            .get(&machine_id)
            .map(|timeline| {
                (
                    timeline.assigned_tasks.len(),
                    timeline.busy_time(&solution.scheduled_tasks),
                )
            })
            .unwrap_or((0, 0.0));
        let ratio = if horizon.is_finite() && horizon > 0.0 {
            busy_time / horizon
        } else {
            0.0
        };
        utilization.push(UtilizationRow {
            machine_id,
            task_count,
            busy_time,
            utilization: ratio,
        });
    }

    let average_utilization = if utilization.is_empty() {
        0.0
    } else {
        utilization.iter().map(|row| row.utilization).sum::<f64>() / utilization.len() as f64
    };

    VisualizationData {
        gantt,
        convergence,
        utilization,
        average_utilization,
        feasible: solution.is_feasible(),
    }
}
