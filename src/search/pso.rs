//! Discrete particle swarm optimization driver.
//!
//! Particles carry an assignment (position), a per-task flip probability
//! (velocity), and personal-best memory. Velocities rise when a particle
//! disagrees with its personal or the global best on a task's placement,
//! making a re-draw of that task's machine more likely.
//!
//! # Reference
//! Kennedy & Eberhart (1997), "A discrete binary version of the particle
//! swarm algorithm"

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::candidate::{random_assignment, repair};
use super::{derive_rng, IterationProgress, SearchDriver};
use crate::error::{EngineError, EngineResult};
use crate::models::{Assignment, MachineId, ProblemInstance, Solution, TaskId};
use crate::scheduler::ListScheduler;

/// PSO driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PsoConfig {
    /// Number of particles.
    pub swarm_size: usize,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Velocity carry-over factor, in `[0, 1]`.
    pub inertia_weight: f64,
    /// Pull towards the personal best.
    pub cognitive_weight: f64,
    /// Pull towards the global best.
    pub social_weight: f64,
    /// Consecutive non-improving iterations before early termination.
    pub no_improvement_limit: usize,
    /// Seed for reproducible runs; `None` draws one from the OS.
    pub random_seed: Option<u64>,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            swarm_size: 50,
            max_iterations: 500,
            inertia_weight: 0.7,
            cognitive_weight: 1.5,
            social_weight: 1.5,
            no_improvement_limit: 50,
            random_seed: None,
        }
    }
}

impl PsoConfig {
    /// Checks all parameter ranges.
    pub fn validate(&self) -> EngineResult<()> {
        if self.swarm_size < 1 {
            return Err(EngineError::InvalidConfig("swarmSize must be at least 1".into()));
        }
        if self.max_iterations < 1 {
            return Err(EngineError::InvalidConfig(
                "maxIterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.inertia_weight) {
            return Err(EngineError::InvalidConfig(
                "inertiaWeight must be in [0, 1]".into(),
            ));
        }
        if self.cognitive_weight < 0.0 || self.social_weight < 0.0 {
            return Err(EngineError::InvalidConfig(
                "cognitiveWeight and socialWeight must be non-negative".into(),
            ));
        }
        if self.no_improvement_limit < 1 {
            return Err(EngineError::InvalidConfig(
                "noImprovementLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// One particle: position, velocity, and personal-best memory.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Current assignment.
    pub position: Assignment,
    /// Per-task flip probability, each in `[0, 1]`.
    pub velocity: BTreeMap<TaskId, f64>,
    /// Best assignment this particle has visited.
    pub best_position: Assignment,
    /// Fitness of `best_position`.
    pub best_fitness: f64,
    /// Solution for the current position (set after each evaluation).
    pub current_solution: Option<Solution>,
    /// Solution for the personal best.
    pub best_solution: Option<Solution>,
}

/// Discrete PSO search driver.
pub struct PsoDriver {
    instance: Arc<ProblemInstance>,
    config: PsoConfig,
    seed: u64,
    rng: SmallRng,
    particles: Vec<Particle>,
    global_best_position: Option<Assignment>,
    global_best_fitness: f64,
    global_best_solution: Option<Solution>,
    fitness_history: Vec<f64>,
    average_history: Vec<f64>,
    iteration: usize,
    iteration_found: usize,
    no_improvement: usize,
    started: bool,
    complete: bool,
    elapsed_ms: u64,
}

impl PsoDriver {
    /// Creates an unstarted driver over a shared instance.
    pub fn new(instance: Arc<ProblemInstance>, config: PsoConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self {
            instance,
            config,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            particles: Vec::new(),
            global_best_position: None,
            global_best_fitness: f64::INFINITY,
            global_best_solution: None,
            fitness_history: Vec::new(),
            average_history: Vec::new(),
            iteration: 0,
            iteration_found: 0,
            no_improvement: 0,
            started: false,
            complete: false,
            elapsed_ms: 0,
        }
    }

    /// Best fitness per iteration so far.
    pub fn fitness_history(&self) -> &[f64] {
        &self.fitness_history
    }

    /// Swarm-average fitness per iteration so far.
    pub fn average_history(&self) -> &[f64] {
        &self.average_history
    }

    /// Iterations executed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Wall-clock milliseconds spent stepping.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Merges freshly evaluated solutions into personal bests (parallel,
    /// disjoint per particle), then folds the global best serially so its
    /// fitness sequence stays monotone.
    fn merge_bests(&mut self, solutions: Vec<Solution>) -> bool {
        self.particles
            .par_iter_mut()
            .zip(solutions.into_par_iter())
            .for_each(|(particle, solution)| {
                if solution.fitness < particle.best_fitness {
                    particle.best_fitness = solution.fitness;
                    particle.best_position = solution.assignment.clone();
                    particle.best_solution = Some(solution.clone());
                }
                particle.current_solution = Some(solution);
            });

        let mut improved = false;
        for particle in &self.particles {
            if particle.best_fitness < self.global_best_fitness {
                self.global_best_fitness = particle.best_fitness;
                self.global_best_position = Some(particle.best_position.clone());
                self.global_best_solution = particle.best_solution.clone();
                improved = true;
            }
        }
        improved
    }

    /// Updates velocities and positions in parallel with per-particle RNGs.
    fn move_swarm(&mut self) {
        let global_best = self
            .global_best_position
            .clone()
            .expect("swarm initialized before moving");
        let machine_ids: Vec<MachineId> = self.instance.machine_ids();
        let instance = Arc::clone(&self.instance);
        let (w, c1, c2) = (
            self.config.inertia_weight,
            self.config.cognitive_weight,
            self.config.social_weight,
        );
        let (seed, iteration) = (self.seed, self.iteration);

        self.particles
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, particle)| {
                let mut rng = derive_rng(seed, iteration, index);

                for task_id in particle.position.task_ids() {
                    let current = particle
                        .position
                        .machine_for(task_id)
                        .expect("position is total");
                    let cognitive = if particle.best_position.machine_for(task_id) != Some(current)
                    {
                        1.0
                    } else {
                        0.0
                    };
                    let social = if global_best.machine_for(task_id) != Some(current) {
                        1.0
                    } else {
                        0.0
                    };
                    let (r1, r2): (f64, f64) = (rng.random(), rng.random());

                    let velocity = particle.velocity.get(&task_id).copied().unwrap_or(0.0);
                    let velocity =
                        (w * velocity + c1 * r1 * cognitive + c2 * r2 * social).clamp(0.0, 1.0);
                    particle.velocity.insert(task_id, velocity);

                    if machine_ids.len() > 1 && rng.random_bool(velocity) {
                        let alternatives: Vec<MachineId> = machine_ids
                            .iter()
                            .copied()
                            .filter(|&m| m != current)
                            .collect();
                        if let Some(&machine) = alternatives.choose(&mut rng) {
                            particle.position.assign(task_id, machine);
                        }
                    }
                }

                repair(&instance, &mut particle.position, &mut rng);
            });
    }
}

impl SearchDriver for PsoDriver {
    fn start(&mut self) -> EngineResult<()> {
        self.config.validate()?;

        self.particles = (0..self.config.swarm_size)
            .map(|_| {
                let mut position = random_assignment(&self.instance, &mut self.rng);
                repair(&self.instance, &mut position, &mut self.rng);
                let velocity = self
                    .instance
                    .tasks
                    .keys()
                    .map(|&id| (id, self.rng.random::<f64>()))
                    .collect();
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_fitness: f64::INFINITY,
                    current_solution: None,
                    best_solution: None,
                }
            })
            .collect();

        // Placeholder until the first evaluation overwrites it.
        self.global_best_position = self.particles.first().map(|p| p.position.clone());
        self.global_best_fitness = f64::INFINITY;
        self.started = true;

        info!(
            "pso: started swarm of {} over {} tasks / {} machines (seed {})",
            self.config.swarm_size,
            self.instance.task_count(),
            self.instance.machine_count(),
            self.seed,
        );
        Ok(())
    }

    fn step(&mut self) -> EngineResult<IterationProgress> {
        if !self.started {
            return Err(EngineError::NotInitialized);
        }
        let step_started = Instant::now();
        self.iteration += 1;

        let positions: Vec<Assignment> =
            self.particles.iter().map(|p| p.position.clone()).collect();
        let solutions = ListScheduler::new(&self.instance).schedule_all(&positions);

        let average_fitness = if solutions.is_empty() {
            f64::INFINITY
        } else {
            solutions.iter().map(|s| s.fitness).sum::<f64>() / solutions.len() as f64
        };

        let improved = self.merge_bests(solutions);
        if improved {
            self.iteration_found = self.iteration;
            self.no_improvement = 0;
        } else {
            self.no_improvement += 1;
        }

        self.move_swarm();

        self.fitness_history.push(self.global_best_fitness);
        self.average_history.push(average_fitness);
        self.elapsed_ms += step_started.elapsed().as_millis() as u64;

        if let Some(best) = &mut self.global_best_solution {
            best.fitness_history = self.fitness_history.clone();
            best.computation_time_ms = self.elapsed_ms;
            best.iteration_found = self.iteration_found;
        }

        if self.iteration >= self.config.max_iterations
            || self.no_improvement >= self.config.no_improvement_limit
        {
            self.complete = true;
        }

        debug!(
            "pso: iteration {} best {:.4} avg {:.4}",
            self.iteration, self.global_best_fitness, average_fitness,
        );

        Ok(IterationProgress {
            iteration: self.iteration,
            best_solution: self.global_best_solution.clone(),
            best_fitness: self.global_best_fitness,
            average_fitness,
            is_complete: self.complete,
        })
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn best_solution(&self) -> Option<&Solution> {
        self.global_best_solution.as_ref()
    }

    fn stop(&mut self) {
        self.complete = true;
    }
}
