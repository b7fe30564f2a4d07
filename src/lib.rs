//! Metaheuristic task-to-VM scheduling.
//!
//! Assigns DAG-ordered compute tasks to heterogeneous virtual machines,
//! minimizing makespan under per-machine memory capacity. Two
//! interchangeable population-based drivers (discrete PSO and a GA)
//! search the assignment space; a deterministic list scheduler is their
//! shared fitness oracle.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Task`, `VirtualMachine`,
//!   `ProblemInstance`, `Assignment`, `Solution`
//! - **`validation`**: Instance integrity checks (attribute ranges,
//!   dangling references, DAG cycles)
//! - **`generator`**: Seeded random instance generation
//! - **`scheduler`**: List-scheduling evaluator with parallel batch fan-out
//! - **`search`**: PSO and GA drivers behind a common capability trait
//! - **`orchestrator`**: Run lifecycle, step mode, cancellation, events
//! - **`viz`**: Chart-ready projections over a solution
//! - **`persistence`**: camelCase JSON export/import
//!
//! # Quick Start
//!
//! ```
//! use vm_sched::generator::{GenerationConfig, ValueRange};
//! use vm_sched::orchestrator::Orchestrator;
//! use vm_sched::search::pso::PsoConfig;
//!
//! let mut engine = Orchestrator::new();
//! engine.set_pso_config(PsoConfig {
//!     swarm_size: 16,
//!     max_iterations: 30,
//!     random_seed: Some(42),
//!     ..PsoConfig::default()
//! }).unwrap();
//!
//! // Machine memory covers every task requirement, so repaired
//! // candidates are always feasible.
//! let generation = GenerationConfig {
//!     machine_memory: ValueRange::new(20.0, 30.0),
//!     ..GenerationConfig::default()
//! };
//! engine.initialize_random_instance(12, 3, Some(42), Some(generation)).unwrap();
//! engine.run().unwrap();
//!
//! let best = engine.best_solution().unwrap();
//! assert_eq!(best.assignment.len(), 12);
//! assert!(best.is_feasible());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Kennedy & Eberhart (1997), "A discrete binary version of the particle
//!   swarm algorithm"
//! - Topcuoglu et al. (2002), "Performance-Effective and Low-Complexity
//!   Task Scheduling for Heterogeneous Computing"

pub mod error;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod scheduler;
pub mod search;
pub mod validation;
pub mod viz;

pub use error::{EngineError, EngineResult};
pub use models::{
    Assignment, MachineId, MachineTimeline, ProblemInstance, ScheduledTask, Solution, Task,
    TaskId, VirtualMachine,
};
pub use orchestrator::{EngineStatus, Orchestrator, SearchObserver};
pub use scheduler::ListScheduler;
pub use search::{AlgorithmKind, IterationProgress, RunOutcome, SearchDriver};
