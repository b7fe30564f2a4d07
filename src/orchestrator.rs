//! Run lifecycle orchestration.
//!
//! The orchestrator owns one search driver at a time and advances it
//! cooperatively: one iteration per step, an optional yield hook between
//! iterations so a host can interleave its own work, and a cancellation
//! token checked at iteration boundaries (in-flight evaluations run to
//! completion).
//!
//! # States
//!
//! `Idle → Ready → Running → {Completed, Stopped, Error} → Ready` (via
//! [`Orchestrator::reset`]). The best-known solution survives `Completed`,
//! `Stopped`, and `Error`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::generator::{generate_instance, GenerationConfig};
use crate::models::{ProblemInstance, Solution};
use crate::search::ga::{GaConfig, GaDriver};
use crate::search::pso::{PsoConfig, PsoDriver};
use crate::search::{AlgorithmKind, IterationProgress, RunOutcome, SearchDriver};
use crate::viz::{project, VisualizationData};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineStatus {
    /// No problem instance set.
    #[default]
    Idle,
    /// Instance set and validated; ready to run.
    Ready,
    /// A run or step session is in progress.
    Running,
    /// The driver reached a termination condition.
    Completed,
    /// The run was cancelled cooperatively.
    Stopped,
    /// A surfaced error; see the returned [`EngineError`].
    Error,
}

/// Observer for engine events. All methods default to no-ops so consumers
/// implement only what they need.
pub trait SearchObserver: Send {
    /// The lifecycle state changed.
    fn on_status(&mut self, _status: EngineStatus) {}
    /// A driver iteration finished.
    fn on_iteration(&mut self, _progress: &IterationProgress) {}
    /// The run finished or was stopped.
    fn on_complete(&mut self, _outcome: &RunOutcome) {}
}

/// Owns the instance, configuration, driver, and observers for one
/// optimization session.
///
/// # Example
/// ```
/// use vm_sched::generator::{GenerationConfig, ValueRange};
/// use vm_sched::orchestrator::Orchestrator;
/// use vm_sched::search::pso::PsoConfig;
///
/// let mut engine = Orchestrator::new();
/// engine.set_pso_config(PsoConfig {
///     swarm_size: 10,
///     max_iterations: 20,
///     random_seed: Some(42),
///     ..PsoConfig::default()
/// }).unwrap();
/// let generation = GenerationConfig {
///     machine_memory: ValueRange::new(20.0, 30.0),
///     ..GenerationConfig::default()
/// };
/// engine.initialize_random_instance(10, 3, Some(42), Some(generation)).unwrap();
/// engine.run().unwrap();
/// assert!(engine.best_solution().is_some());
/// ```
pub struct Orchestrator {
    status: EngineStatus,
    algorithm: AlgorithmKind,
    pso_config: PsoConfig,
    ga_config: GaConfig,
    instance: Option<Arc<ProblemInstance>>,
    driver: Option<Box<dyn SearchDriver>>,
    observers: Vec<Box<dyn SearchObserver>>,
    cancel: Arc<AtomicBool>,
    yield_hook: Option<Box<dyn FnMut() + Send>>,
    best: Option<Solution>,
    step_mode: bool,
    iterations_run: usize,
    elapsed_ms: u64,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Creates an idle orchestrator with default configurations.
    pub fn new() -> Self {
        Self {
            status: EngineStatus::Idle,
            algorithm: AlgorithmKind::default(),
            pso_config: PsoConfig::default(),
            ga_config: GaConfig::default(),
            instance: None,
            driver: None,
            observers: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            yield_hook: None,
            best: None,
            step_mode: false,
            iterations_run: 0,
            elapsed_ms: 0,
        }
    }

    /// Installs a hook invoked between iterations during [`Orchestrator::run`],
    /// letting the host process events without the engine owning a timer.
    pub fn with_yield_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.yield_hook = Some(Box::new(hook));
        self
    }

    /// Registers an observer. Registrations last until
    /// [`Orchestrator::reset`] tears the session down.
    pub fn subscribe(&mut self, observer: Box<dyn SearchObserver>) {
        self.observers.push(observer);
    }

    /// Current lifecycle state.
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Selected search algorithm.
    pub fn algorithm(&self) -> AlgorithmKind {
        self.algorithm
    }

    /// Selects the search algorithm for the next run.
    pub fn set_algorithm(&mut self, algorithm: AlgorithmKind) -> EngineResult<()> {
        self.ensure_not_running()?;
        self.algorithm = algorithm;
        Ok(())
    }

    /// Current PSO configuration.
    pub fn pso_config(&self) -> &PsoConfig {
        &self.pso_config
    }

    /// Replaces the PSO configuration after validating it.
    pub fn set_pso_config(&mut self, config: PsoConfig) -> EngineResult<()> {
        self.ensure_not_running()?;
        config.validate()?;
        self.pso_config = config;
        Ok(())
    }

    /// Current GA configuration.
    pub fn ga_config(&self) -> &GaConfig {
        &self.ga_config
    }

    /// Replaces the GA configuration after validating it.
    pub fn set_ga_config(&mut self, config: GaConfig) -> EngineResult<()> {
        self.ensure_not_running()?;
        config.validate()?;
        self.ga_config = config;
        Ok(())
    }

    /// The current problem instance, if set.
    pub fn current_instance(&self) -> Option<&ProblemInstance> {
        self.instance.as_deref()
    }

    /// Best solution known from the current or last run.
    pub fn best_solution(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// Chart-ready projection of the best solution.
    pub fn visualization_data(&self) -> Option<VisualizationData> {
        match (&self.instance, &self.best) {
            (Some(instance), Some(best)) => Some(project(instance, best)),
            _ => None,
        }
    }

    /// Token that cancels a running loop when set. Clone it to request
    /// cancellation from another thread while [`Orchestrator::run`] blocks.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Installs a validated problem instance and transitions to `Ready`.
    ///
    /// Validation failure (cycle, dangling reference) transitions to
    /// `Error` and surfaces [`EngineError::InvalidInstance`].
    pub fn set_instance(&mut self, instance: ProblemInstance) -> EngineResult<()> {
        self.ensure_not_running()?;
        if let Err(errors) = instance.validate() {
            self.set_status(EngineStatus::Error);
            let summary = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EngineError::InvalidInstance(summary));
        }

        self.instance = Some(Arc::new(instance));
        self.driver = None;
        self.best = None;
        self.step_mode = false;
        self.set_status(EngineStatus::Ready);
        Ok(())
    }

    /// Generates, validates, and installs a random instance.
    pub fn initialize_random_instance(
        &mut self,
        task_count: usize,
        machine_count: usize,
        seed: Option<u64>,
        generation: Option<GenerationConfig>,
    ) -> EngineResult<()> {
        self.ensure_not_running()?;
        let generation = generation.unwrap_or_default();
        let seed = seed.unwrap_or_else(rand::random);
        let instance = generate_instance(task_count, machine_count, seed, &generation)
            .inspect_err(|_| self.set_status(EngineStatus::Error))?;
        self.set_instance(instance)
    }

    /// Runs the selected driver to completion, honoring cancellation.
    ///
    /// Emits an iteration event per step and a completion event at the
    /// end. Cancellation transitions to `Stopped` and is not an error.
    pub fn run(&mut self) -> EngineResult<()> {
        self.build_driver()?;
        self.cancel.store(false, Ordering::SeqCst);
        self.set_status(EngineStatus::Running);

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                if let Some(driver) = &mut self.driver {
                    driver.stop();
                }
                self.set_status(EngineStatus::Stopped);
                break;
            }

            let progress = self.advance()?;
            if progress.is_complete {
                self.set_status(EngineStatus::Completed);
                break;
            }

            if let Some(hook) = &mut self.yield_hook {
                hook();
            }
        }

        self.emit_outcome();
        Ok(())
    }

    /// Builds and starts the driver for explicit single-step advancement.
    pub fn start_step_mode(&mut self) -> EngineResult<()> {
        self.build_driver()?;
        self.cancel.store(false, Ordering::SeqCst);
        self.step_mode = true;
        self.set_status(EngineStatus::Running);
        Ok(())
    }

    /// Whether a step-mode iteration may be taken.
    pub fn can_step(&self) -> bool {
        self.step_mode
            && self.status == EngineStatus::Running
            && self
                .driver
                .as_ref()
                .is_some_and(|driver| !driver.is_complete())
    }

    /// Advances the driver by exactly one iteration (step mode only).
    pub fn step(&mut self) -> EngineResult<IterationProgress> {
        if !self.can_step() {
            return Err(EngineError::NotInitialized);
        }
        let progress = self.advance()?;
        if progress.is_complete {
            self.set_status(EngineStatus::Completed);
            self.emit_outcome();
        }
        Ok(progress)
    }

    /// Requests cancellation. In step mode the driver is torn down
    /// immediately; a blocking [`Orchestrator::run`] observes the token at
    /// its next iteration boundary.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if self.step_mode && self.driver.is_some() {
            if let Some(driver) = &mut self.driver {
                driver.stop();
            }
            self.driver = None;
            self.step_mode = false;
            self.set_status(EngineStatus::Stopped);
            self.emit_outcome();
        }
    }

    /// Discards all per-run state, including observer registrations.
    /// Keeps the instance and configurations.
    pub fn reset(&mut self) {
        self.driver = None;
        self.best = None;
        self.observers.clear();
        self.step_mode = false;
        self.iterations_run = 0;
        self.elapsed_ms = 0;
        self.cancel.store(false, Ordering::SeqCst);
        let next = if self.instance.is_some() {
            EngineStatus::Ready
        } else {
            EngineStatus::Idle
        };
        self.set_status(next);
    }

    fn ensure_not_running(&self) -> EngineResult<()> {
        if self.status == EngineStatus::Running {
            return Err(EngineError::AlreadyRunning);
        }
        Ok(())
    }

    fn build_driver(&mut self) -> EngineResult<()> {
        self.ensure_not_running()?;
        let instance = self.instance.clone().ok_or(EngineError::NotInitialized)?;

        let mut driver: Box<dyn SearchDriver> = match self.algorithm {
            AlgorithmKind::Pso => Box::new(PsoDriver::new(instance, self.pso_config.clone())),
            AlgorithmKind::Ga => Box::new(GaDriver::new(instance, self.ga_config.clone())),
        };
        driver.start().inspect_err(|_| {
            self.set_status(EngineStatus::Error);
        })?;

        self.driver = Some(driver);
        self.best = None;
        self.step_mode = false;
        self.iterations_run = 0;
        self.elapsed_ms = 0;
        info!("orchestrator: {:?} driver started", self.algorithm);
        Ok(())
    }

    /// Steps the driver once and relays the progress event.
    fn advance(&mut self) -> EngineResult<IterationProgress> {
        let step_started = Instant::now();
        let result = self
            .driver
            .as_mut()
            .ok_or(EngineError::NotInitialized)
            .and_then(|driver| driver.step());
        let progress = match result {
            Ok(progress) => progress,
            Err(error) => {
                // The best-known solution stays accessible across Error.
                self.set_status(EngineStatus::Error);
                return Err(error);
            }
        };
        self.elapsed_ms += step_started.elapsed().as_millis() as u64;
        self.iterations_run = progress.iteration;
        if progress.best_solution.is_some() {
            self.best = progress.best_solution.clone();
        }
        for observer in &mut self.observers {
            observer.on_iteration(&progress);
        }
        Ok(progress)
    }

    fn emit_outcome(&mut self) {
        let outcome = RunOutcome {
            best_solution: self.best.clone(),
            total_iterations: self.iterations_run,
            computation_time_ms: self.elapsed_ms,
        };
        for observer in &mut self.observers {
            observer.on_complete(&outcome);
        }
    }

    fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            info!("orchestrator: {:?} -> {:?}", self.status, status);
            self.status = status;
            for observer in &mut self.observers {
                observer.on_status(status);
            }
        }
    }
}
