//! Problem instance validation.
//!
//! Checks structural integrity of an instance before scheduling. Detects:
//! - Non-positive computation volumes or machine performance
//! - Negative memory values
//! - Predecessor references to missing tasks
//! - Circular precedence dependencies (DAG validation)
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::models::{ProblemInstance, TaskId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A task references a predecessor that doesn't exist.
    InvalidPredecessor,
    /// The precedence graph contains a cycle.
    CyclicDependency,
    /// A task lists itself as its own predecessor.
    SelfDependency,
    /// A numeric attribute is out of its valid range.
    InvalidAttribute,
    /// The instance has no machines to schedule on.
    NoMachines,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a problem instance.
///
/// Checks:
/// 1. At least one machine exists when tasks do
/// 2. Computation volumes and machine performance are positive
/// 3. Memory values are non-negative
/// 4. All predecessor references point to existing tasks
/// 5. No task depends on itself
/// 6. No circular precedence dependencies
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &ProblemInstance) -> ValidationResult {
    let mut errors = Vec::new();

    if !instance.tasks.is_empty() && instance.machines.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoMachines,
            "instance has tasks but no machines",
        ));
    }

    for task in instance.tasks.values() {
        if task.computation_volume <= 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAttribute,
                format!("task {} has non-positive computation volume", task.id),
            ));
        }
        if task.memory_requirement < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAttribute,
                format!("task {} has negative memory requirement", task.id),
            ));
        }

        for &pred in &task.predecessor_ids {
            if pred == task.id {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SelfDependency,
                    format!("task {} depends on itself", task.id),
                ));
            } else if !instance.tasks.contains_key(&pred) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("task {} references unknown predecessor {pred}", task.id),
                ));
            }
        }
    }

    for machine in instance.machines.values() {
        if machine.performance <= 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAttribute,
                format!("machine {} has non-positive performance", machine.id),
            ));
        }
        if machine.available_memory < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAttribute,
                format!("machine {} has negative memory", machine.id),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(instance) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the precedence graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(instance: &ProblemInstance) -> Option<ValidationError> {
    // Adjacency list: predecessor → successors.
    let mut adj: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for task in instance.tasks.values() {
        for &pred in &task.predecessor_ids {
            adj.entry(pred).or_default().push(task.id);
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for &id in instance.tasks.keys() {
        if !visited.contains(&id) && has_cycle_dfs(id, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("circular dependency detected involving task {id}"),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    node: TaskId,
    adj: &HashMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    in_stack: &mut HashSet<TaskId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}
