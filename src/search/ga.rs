//! Genetic algorithm driver.
//!
//! Classic generational GA over assignments: tournament selection,
//! single-point crossover on the task-id-ordered gene string, per-gene
//! mutation, elitism, and an aging filter that retires individuals which
//! have survived too many generations without being elite.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//! Machine Learning"

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::candidate::{random_assignment, repair};
use super::{IterationProgress, SearchDriver};
use crate::error::{EngineError, EngineResult};
use crate::models::{Assignment, MachineId, ProblemInstance, Solution};
use crate::scheduler::ListScheduler;

/// GA driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaConfig {
    /// Number of individuals.
    pub population_size: usize,
    /// Generation budget.
    pub max_generations: usize,
    /// Probability of recombining a parent pair.
    pub crossover_rate: f64,
    /// Per-gene probability of reassignment.
    pub mutation_rate: f64,
    /// Fraction of the population carried over unchanged, in `[0, 1)`.
    pub elite_ratio: f64,
    /// Individuals sampled per tournament.
    pub tournament_size: usize,
    /// Generations an individual may survive without being elite; 0
    /// disables aging.
    pub max_age: u32,
    /// Consecutive non-improving generations before early termination.
    pub no_improvement_limit: usize,
    /// Seed for reproducible runs; `None` draws one from the OS.
    pub random_seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_generations: 500,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_ratio: 0.1,
            tournament_size: 3,
            max_age: 50,
            no_improvement_limit: 50,
            random_seed: None,
        }
    }
}

impl GaConfig {
    /// Checks all parameter ranges and derived constraints.
    pub fn validate(&self) -> EngineResult<()> {
        if self.population_size < 2 {
            return Err(EngineError::InvalidConfig(
                "populationSize must be at least 2".into(),
            ));
        }
        if self.max_generations < 1 {
            return Err(EngineError::InvalidConfig(
                "maxGenerations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(EngineError::InvalidConfig(
                "crossoverRate must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EngineError::InvalidConfig(
                "mutationRate must be in [0, 1]".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.elite_ratio) {
            return Err(EngineError::InvalidConfig(
                "eliteRatio must be in [0, 1)".into(),
            ));
        }
        if self.tournament_size < 1 || self.tournament_size > self.population_size {
            return Err(EngineError::InvalidConfig(
                "tournamentSize must be in [1, populationSize]".into(),
            ));
        }
        if self.no_improvement_limit < 1 {
            return Err(EngineError::InvalidConfig(
                "noImprovementLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn elite_count(&self) -> usize {
        ((self.population_size as f64 * self.elite_ratio) as usize).max(1)
    }
}

/// One GA individual: an assignment plus its evaluation and age.
#[derive(Debug, Clone)]
pub struct Individual {
    /// The encoded assignment.
    pub chromosome: Assignment,
    /// Evaluation of the chromosome, if any.
    pub solution: Option<Solution>,
    /// Generations survived since creation.
    pub age: u32,
}

impl Individual {
    fn new(chromosome: Assignment) -> Self {
        Self {
            chromosome,
            solution: None,
            age: 0,
        }
    }

    /// Fitness of the last evaluation; `+∞` when unevaluated.
    pub fn fitness(&self) -> f64 {
        self.solution.as_ref().map_or(f64::INFINITY, |s| s.fitness)
    }
}

/// Generational GA search driver.
pub struct GaDriver {
    instance: Arc<ProblemInstance>,
    config: GaConfig,
    seed: u64,
    rng: SmallRng,
    population: Vec<Individual>,
    best_solution: Option<Solution>,
    best_fitness: f64,
    fitness_history: Vec<f64>,
    average_history: Vec<f64>,
    generation: usize,
    iteration_found: usize,
    no_improvement: usize,
    started: bool,
    complete: bool,
    elapsed_ms: u64,
}

impl GaDriver {
    /// Creates an unstarted driver over a shared instance.
    pub fn new(instance: Arc<ProblemInstance>, config: GaConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self {
            instance,
            config,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            population: Vec::new(),
            best_solution: None,
            best_fitness: f64::INFINITY,
            fitness_history: Vec::new(),
            average_history: Vec::new(),
            generation: 0,
            iteration_found: 0,
            no_improvement: 0,
            started: false,
            complete: false,
            elapsed_ms: 0,
        }
    }

    /// Best fitness per generation so far.
    pub fn fitness_history(&self) -> &[f64] {
        &self.fitness_history
    }

    /// Population-average fitness per generation so far.
    pub fn average_history(&self) -> &[f64] {
        &self.average_history
    }

    /// Generations executed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Wall-clock milliseconds spent stepping.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Evaluates every individual's chromosome (in parallel) and refreshes
    /// the stored solutions. Returns the population-average fitness.
    fn evaluate_population(&mut self) -> f64 {
        let chromosomes: Vec<Assignment> = self
            .population
            .iter()
            .map(|i| i.chromosome.clone())
            .collect();
        let solutions = ListScheduler::new(&self.instance).schedule_all(&chromosomes);

        let mut total = 0.0;
        for (individual, solution) in self.population.iter_mut().zip(solutions) {
            total += solution.fitness;
            individual.solution = Some(solution);
        }

        if self.population.is_empty() {
            f64::INFINITY
        } else {
            total / self.population.len() as f64
        }
    }

    /// Folds the current population into the global best. Returns whether
    /// the best strictly improved.
    fn update_best(&mut self) -> bool {
        let mut improved = false;
        for individual in &self.population {
            if individual.fitness() < self.best_fitness {
                self.best_fitness = individual.fitness();
                self.best_solution = individual.solution.clone();
                improved = true;
            }
        }
        improved
    }

    /// Tournament selection: sample with replacement, lowest fitness wins,
    /// earlier samples win ties.
    fn tournament(&mut self) -> usize {
        let mut winner = self.rng.random_range(0..self.population.len());
        for _ in 1..self.config.tournament_size {
            let challenger = self.rng.random_range(0..self.population.len());
            if self.population[challenger].fitness() < self.population[winner].fitness() {
                winner = challenger;
            }
        }
        winner
    }

    fn breed_next_generation(&mut self) -> Vec<Individual> {
        let elite_count = self.config.elite_count().min(self.population.len());

        // Fitness-ascending order, stable so equal fitness keeps first-seen.
        let mut ranked: Vec<usize> = (0..self.population.len()).collect();
        ranked.sort_by(|&a, &b| {
            self.population[a]
                .fitness()
                .partial_cmp(&self.population[b].fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut next: Vec<Individual> = ranked[..elite_count]
            .iter()
            .map(|&i| self.population[i].clone())
            .collect();

        while next.len() < self.config.population_size {
            let first = self.tournament();
            let second = self.tournament();
            let parent1 = self.population[first].chromosome.clone();
            let parent2 = self.population[second].chromosome.clone();

            let (mut child1, mut child2) = if self.rng.random_bool(self.config.crossover_rate) {
                single_point_crossover(&parent1, &parent2, &mut self.rng)
            } else {
                (parent1, parent2)
            };

            mutate(&self.instance, &mut child1, self.config.mutation_rate, &mut self.rng);
            mutate(&self.instance, &mut child2, self.config.mutation_rate, &mut self.rng);
            repair(&self.instance, &mut child1, &mut self.rng);
            repair(&self.instance, &mut child2, &mut self.rng);

            next.push(Individual::new(child1));
            if next.len() < self.config.population_size {
                next.push(Individual::new(child2));
            }
        }

        // Ages tick after construction; the aging filter spares this
        // generation's elites (the leading clones).
        for individual in &mut next {
            individual.age += 1;
        }
        if self.config.max_age > 0 {
            let max_age = self.config.max_age;
            let mut index = 0;
            next.retain(|individual| {
                let keep = index < elite_count || individual.age <= max_age;
                index += 1;
                keep
            });
        }
        next.truncate(self.config.population_size);
        next
    }
}

impl SearchDriver for GaDriver {
    fn start(&mut self) -> EngineResult<()> {
        self.config.validate()?;

        self.population = (0..self.config.population_size)
            .map(|_| {
                let mut chromosome = random_assignment(&self.instance, &mut self.rng);
                repair(&self.instance, &mut chromosome, &mut self.rng);
                Individual::new(chromosome)
            })
            .collect();

        self.evaluate_population();
        self.update_best();
        self.started = true;

        info!(
            "ga: started population of {} over {} tasks / {} machines (seed {})",
            self.config.population_size,
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
        self.generation += 1;

        let average_fitness = self.evaluate_population();
        if self.update_best() {
            self.iteration_found = self.generation;
            self.no_improvement = 0;
        } else {
            self.no_improvement += 1;
        }
        self.fitness_history.push(self.best_fitness);
        self.average_history.push(average_fitness);

        self.population = self.breed_next_generation();
        self.elapsed_ms += step_started.elapsed().as_millis() as u64;

        if let Some(best) = &mut self.best_solution {
            best.fitness_history = self.fitness_history.clone();
            best.computation_time_ms = self.elapsed_ms;
            best.iteration_found = self.iteration_found;
        }

        if self.generation >= self.config.max_generations
            || self.no_improvement >= self.config.no_improvement_limit
        {
            self.complete = true;
        }

        debug!(
            "ga: generation {} best {:.4} avg {:.4}",
            self.generation, self.best_fitness, average_fitness,
        );

        Ok(IterationProgress {
            iteration: self.generation,
            best_solution: self.best_solution.clone(),
            best_fitness: self.best_fitness,
            average_fitness,
            is_complete: self.complete,
        })
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn best_solution(&self) -> Option<&Solution> {
        self.best_solution.as_ref()
    }

    fn stop(&mut self) {
        self.complete = true;
    }
}

/// Single-point crossover over the task-id-ascending gene string.
///
/// The cut point is uniform in `[1, n - 1]`; chromosomes with fewer than
/// two genes are returned unchanged.
fn single_point_crossover<R: Rng>(
    parent1: &Assignment,
    parent2: &Assignment,
    rng: &mut R,
) -> (Assignment, Assignment) {
    let tasks = parent1.task_ids();
    if tasks.len() < 2 {
        return (parent1.clone(), parent2.clone());
    }
    let cut = rng.random_range(1..tasks.len());

    let mut child1 = Assignment::new();
    let mut child2 = Assignment::new();
    for (index, &task) in tasks.iter().enumerate() {
        let from1 = parent1.machine_for(task).unwrap_or_default();
        let from2 = parent2.machine_for(task).unwrap_or(from1);
        if index < cut {
            child1.assign(task, from1);
            child2.assign(task, from2);
        } else {
            child1.assign(task, from2);
            child2.assign(task, from1);
        }
    }
    (child1, child2)
}

/// Per-gene mutation: each task reassigns, with probability `rate`, to a
/// uniformly random machine different from its current one.
fn mutate<R: Rng>(
    instance: &ProblemInstance,
    assignment: &mut Assignment,
    rate: f64,
    rng: &mut R,
) {
    let machine_ids = instance.machine_ids();
    if machine_ids.len() < 2 {
        return;
    }
    for task in assignment.task_ids() {
        if rng.random_bool(rate) {
            let current = assignment.machine_for(task).unwrap_or_default();
            let alternatives: Vec<MachineId> = machine_ids
                .iter()
                .copied()
                .filter(|&m| m != current)
                .collect();
            if let Some(&machine) = alternatives.choose(rng) {
                assignment.assign(task, machine);
            }
        }
    }
}

/// Greedy reassignment sweep over a solution (GA post-processing).
///
/// For each task, tries every other machine and keeps the first strict
/// improvement, restarting the sweep after each one. Stops after a full
/// sweep without improvement or `max_sweeps` restarts.
pub fn local_search(
    instance: &ProblemInstance,
    solution: &Solution,
    max_sweeps: usize,
) -> Solution {
    let scheduler = ListScheduler::new(instance);
    let machine_ids = instance.machine_ids();
    let task_ids: Vec<_> = instance.tasks.keys().copied().collect();
    let mut best = solution.clone();

    for _ in 0..max_sweeps {
        let mut improved = false;

        'sweep: for &task in &task_ids {
            let current = match best.assignment.machine_for(task) {
                Some(machine) => machine,
                None => continue,
            };
            for &machine in &machine_ids {
                if machine == current {
                    continue;
                }
                let mut candidate = best.assignment.clone();
                candidate.assign(task, machine);
                let mut evaluated = scheduler.schedule(&candidate);
                if evaluated.fitness < best.fitness {
                    evaluated.fitness_history = best.fitness_history.clone();
                    evaluated.computation_time_ms = best.computation_time_ms;
                    evaluated.iteration_found = best.iteration_found;
                    best = evaluated;
                    improved = true;
                    break 'sweep;
                }
            }
        }

        if !improved {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, VirtualMachine};

    fn small_instance() -> Arc<ProblemInstance> {
        Arc::new(
            ProblemInstance::new()
                .with_task(Task::new(1, 30.0).with_memory(2.0))
                .with_task(Task::new(2, 10.0).with_memory(2.0).with_predecessor(1))
                .with_task(Task::new(3, 20.0).with_memory(2.0))
                .with_task(Task::new(4, 40.0).with_memory(2.0).with_predecessor(3))
                .with_machine(VirtualMachine::new(1, 10.0).with_memory(8.0))
                .with_machine(VirtualMachine::new(2, 5.0).with_memory(8.0)),
        )
    }

    fn quick_config(seed: u64) -> GaConfig {
        GaConfig {
            population_size: 16,
            max_generations: 30,
            no_improvement_limit: 30,
            random_seed: Some(seed),
            ..GaConfig::default()
        }
    }

    fn run_to_completion(driver: &mut GaDriver) {
        driver.start().unwrap();
        while !driver.is_complete() {
            driver.step().unwrap();
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(GaConfig::default().validate().is_ok());
        let bad = GaConfig {
            population_size: 1,
            ..GaConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = GaConfig {
            tournament_size: 101,
            ..GaConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = GaConfig {
            elite_ratio: 1.0,
            ..GaConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_elite_count_floor() {
        let config = GaConfig {
            population_size: 10,
            elite_ratio: 0.0,
            ..GaConfig::default()
        };
        assert_eq!(config.elite_count(), 1);
        let config = GaConfig {
            population_size: 10,
            elite_ratio: 0.25,
            ..GaConfig::default()
        };
        assert_eq!(config.elite_count(), 2);
    }

    #[test]
    fn test_step_before_start_fails() {
        let mut driver = GaDriver::new(small_instance(), quick_config(1));
        assert!(matches!(driver.step(), Err(EngineError::NotInitialized)));
    }

    #[test]
    fn test_terminates_within_budget() {
        let mut driver = GaDriver::new(small_instance(), quick_config(7));
        run_to_completion(&mut driver);
        assert!(driver.generation() <= 30);
        assert!(driver.best_solution().is_some());
        assert!(driver.best_solution().unwrap().is_feasible());
    }

    #[test]
    fn test_best_fitness_history_is_monotone() {
        let mut driver = GaDriver::new(small_instance(), quick_config(11));
        run_to_completion(&mut driver);
        for pair in driver.fitness_history().windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_same_seed_same_history() {
        let mut a = GaDriver::new(small_instance(), quick_config(23));
        let mut b = GaDriver::new(small_instance(), quick_config(23));
        run_to_completion(&mut a);
        run_to_completion(&mut b);
        assert_eq!(a.fitness_history(), b.fitness_history());
    }

    #[test]
    fn test_population_size_is_stable() {
        let mut driver = GaDriver::new(small_instance(), quick_config(5));
        driver.start().unwrap();
        for _ in 0..5 {
            driver.step().unwrap();
            assert!(driver.population.len() <= 16);
            assert!(driver.population.len() >= driver.config.elite_count());
        }
    }

    #[test]
    fn test_aging_disabled_keeps_everyone() {
        let config = GaConfig {
            max_age: 0,
            ..quick_config(9)
        };
        let mut driver = GaDriver::new(small_instance(), config);
        driver.start().unwrap();
        for _ in 0..5 {
            driver.step().unwrap();
            assert_eq!(driver.population.len(), 16);
        }
    }

    #[test]
    fn test_single_point_crossover_swaps_tail() {
        let parent1: Assignment = [(1, 1), (2, 1), (3, 1)].into_iter().collect();
        let parent2: Assignment = [(1, 2), (2, 2), (3, 2)].into_iter().collect();
        let mut rng = SmallRng::seed_from_u64(0);
        let (child1, child2) = single_point_crossover(&parent1, &parent2, &mut rng);

        // Every gene comes from one of the parents, and the two children
        // are complementary.
        for task in [1, 2, 3] {
            let (a, b) = (
                child1.machine_for(task).unwrap(),
                child2.machine_for(task).unwrap(),
            );
            assert_ne!(a, b);
        }
        // A prefix of child1 matches parent1 and the rest matches parent2.
        assert_eq!(child1.machine_for(1), Some(1));
        assert_eq!(child2.machine_for(1), Some(2));
    }

    #[test]
    fn test_mutation_respects_machine_set() {
        let instance = small_instance();
        let mut assignment: Assignment = [(1, 1), (2, 1), (3, 1), (4, 1)].into_iter().collect();
        let mut rng = SmallRng::seed_from_u64(42);
        mutate(&instance, &mut assignment, 1.0, &mut rng);

        // Rate 1.0 flips every gene to the other machine.
        for (_, machine) in assignment.iter() {
            assert_eq!(machine, 2);
        }
    }

    #[test]
    fn test_local_search_improves_or_keeps() {
        let instance = small_instance();
        // Everything on the slow machine: plenty of room to improve.
        let assignment: Assignment = [(1, 2), (2, 2), (3, 2), (4, 2)].into_iter().collect();
        let start = ListScheduler::new(&instance).schedule(&assignment);
        let improved = local_search(&instance, &start, 50);

        assert!(improved.fitness <= start.fitness);
        assert!(improved.verify_feasibility(&instance));
    }

    #[test]
    fn test_local_search_fixed_point_on_optimum() {
        let instance = Arc::new(
            ProblemInstance::new()
                .with_task(Task::new(1, 10.0).with_memory(1.0))
                .with_machine(VirtualMachine::new(1, 10.0).with_memory(4.0))
                .with_machine(VirtualMachine::new(2, 1.0).with_memory(4.0)),
        );
        let assignment: Assignment = [(1, 1)].into_iter().collect();
        let optimal = ListScheduler::new(&instance).schedule(&assignment);
        let result = local_search(&instance, &optimal, 10);
        assert_eq!(result.assignment, optimal.assignment);
    }
}
