//! Random problem instance generation.
//!
//! Produces seeded instances for benchmarks and tests. Predecessors of
//! task `i` are drawn only from tasks `1..i`, so the precedence graph is
//! acyclic by construction; machines are drawn independently.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{ProblemInstance, Task, VirtualMachine};

/// An inclusive range to draw a uniform attribute from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl ValueRange {
    /// Creates a range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.min >= self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

/// Attribute ranges for random instance generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// Task computation volume range.
    pub computation_volume: ValueRange,
    /// Task memory requirement range.
    pub memory_requirement: ValueRange,
    /// Upper bound on the number of predecessors per task.
    pub max_predecessors: usize,
    /// Machine performance range.
    pub machine_performance: ValueRange,
    /// Machine memory capacity range.
    pub machine_memory: ValueRange,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            computation_volume: ValueRange::new(10.0, 100.0),
            memory_requirement: ValueRange::new(1.0, 20.0),
            max_predecessors: 3,
            machine_performance: ValueRange::new(5.0, 25.0),
            machine_memory: ValueRange::new(10.0, 30.0),
        }
    }
}

impl GenerationConfig {
    /// Checks range sanity.
    pub fn validate(&self) -> EngineResult<()> {
        let ranges = [
            ("computationVolume", &self.computation_volume),
            ("memoryRequirement", &self.memory_requirement),
            ("machinePerformance", &self.machine_performance),
            ("machineMemory", &self.machine_memory),
        ];
        for (name, range) in ranges {
            if range.min > range.max {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} range has min > max"
                )));
            }
        }
        if self.computation_volume.min <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "computationVolume must be positive".into(),
            ));
        }
        if self.machine_performance.min <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "machinePerformance must be positive".into(),
            ));
        }
        if self.memory_requirement.min < 0.0 || self.machine_memory.min < 0.0 {
            return Err(EngineError::InvalidConfig(
                "memory ranges must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Generates a random problem instance.
///
/// Task `i` (1-indexed) draws its predecessor count from
/// `[0, min(max_predecessors, i - 1)]` and its predecessor ids uniformly
/// from `[1, i - 1]`, discarding duplicates. The same `seed` always yields
/// the same instance.
///
/// # Example
/// ```
/// use vm_sched::generator::{generate_instance, GenerationConfig};
///
/// let instance = generate_instance(20, 4, 42, &GenerationConfig::default()).unwrap();
/// assert_eq!(instance.task_count(), 20);
/// assert_eq!(instance.machine_count(), 4);
/// assert!(instance.is_valid());
/// ```
pub fn generate_instance(
    task_count: usize,
    machine_count: usize,
    seed: u64,
    config: &GenerationConfig,
) -> EngineResult<ProblemInstance> {
    if task_count == 0 {
        return Err(EngineError::InvalidConfig(
            "taskCount must be at least 1".into(),
        ));
    }
    if machine_count == 0 {
        return Err(EngineError::InvalidConfig(
            "machineCount must be at least 1".into(),
        ));
    }
    config.validate()?;

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut instance = ProblemInstance::new();

    for i in 1..=task_count as u32 {
        let mut task = Task::new(i, config.computation_volume.sample(&mut rng))
            .with_memory(config.memory_requirement.sample(&mut rng));

        let limit = config.max_predecessors.min(i as usize - 1);
        if limit > 0 {
            let count = rng.random_range(0..=limit);
            for _ in 0..count {
                // Duplicate draws collapse in the predecessor set.
                task = task.with_predecessor(rng.random_range(1..i));
            }
        }
        instance = instance.with_task(task);
    }

    for id in 1..=machine_count as u32 {
        instance = instance.with_machine(
            VirtualMachine::new(id, config.machine_performance.sample(&mut rng))
                .with_memory(config.machine_memory.sample(&mut rng)),
        );
    }

    Ok(instance)
}
