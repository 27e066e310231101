//! Fitness transforms
//!
//! Fitness is the always-maximized score used by selection. It is a pure
//! function of the population's evaluations, so recomputing it without an
//! intervening evaluation change yields identical values.
//!
//! Minimization under [`FitnessType::Raw`] is remapped either by
//! `CMAX` (`fitness_cmax * worst - eval`) or by `RECIPROCAL`
//! (`1 / (1 + eval - best)`), then shifted so no fitness is negative.
//! With constraints or multi-objective replacement the fitness is always the
//! linear ranking of the constraint-aware order.

use crate::config::{Direction, EngineConfig, FitnessMinType, FitnessType};
use crate::fitness::compare::Comparator;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Evaluation to fitness mapping
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitnessTransform {
    pub fitness_type: FitnessType,
    pub min_type: FitnessMinType,
    pub cmax: f64,
    pub max_rank: f64,
    pub comparator: Comparator,
}

impl FitnessTransform {
    /// Create the transform described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            fitness_type: config.fitness_type,
            min_type: config.fitness_min_type,
            cmax: config.fitness_cmax,
            max_rank: config.max_fitness_rank,
            comparator: Comparator::from_config(config),
        }
    }

    fn rank_based(&self) -> bool {
        self.fitness_type == FitnessType::Ranking
            || self.comparator.num_constraint > 0
            || self.comparator.multi_objective
    }

    /// Compute fitness for every individual
    pub fn compute(&self, individuals: &[Individual]) -> Vec<f64> {
        if individuals.is_empty() {
            return Vec::new();
        }
        if self.rank_based() {
            return self.ranking(individuals);
        }
        let evals: Vec<f64> = individuals.iter().map(Individual::evaluation).collect();
        match self.fitness_type {
            FitnessType::Normal => self.normal(&evals),
            _ => self.raw(&evals),
        }
    }

    /// Compute and store fitness on a population
    pub fn apply(&self, population: &mut Population) {
        let fitness = self.compute(population.individuals());
        for (ind, f) in population.iter_mut().zip(fitness) {
            ind.set_fitness(f);
        }
    }

    fn raw(&self, evals: &[f64]) -> Vec<f64> {
        let (min, max) = finite_min_max(evals);
        let mapped: Vec<f64> = match self.comparator.direction {
            Direction::Maximize => evals.to_vec(),
            Direction::Minimize => match self.min_type {
                FitnessMinType::Cmax => evals.iter().map(|&e| self.cmax * max - e).collect(),
                FitnessMinType::Reciprocal => {
                    evals.iter().map(|&e| 1.0 / (1.0 + (e - min))).collect()
                }
            },
        };
        shift_non_negative(mapped)
    }

    fn normal(&self, evals: &[f64]) -> Vec<f64> {
        let oriented: Vec<f64> = evals
            .iter()
            .map(|&e| self.comparator.direction.oriented(e))
            .collect();
        let n = oriented.len() as f64;
        let mean = oriented.iter().sum::<f64>() / n;
        let var = oriented.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        if !(std > 0.0 && std.is_finite()) {
            return vec![1.0; oriented.len()];
        }
        oriented
            .iter()
            .map(|x| ((x - mean) / std + 2.0).max(0.0))
            .collect()
    }

    fn ranking(&self, individuals: &[Individual]) -> Vec<f64> {
        let n = individuals.len();
        let max = self.max_rank;
        let min = 2.0 - max;
        let mut fitness = vec![max; n];
        if n == 1 {
            return fitness;
        }
        for (rank, index) in self.comparator.ranked(individuals).into_iter().enumerate() {
            fitness[index] = max - (max - min) * rank as f64 / (n - 1) as f64;
        }
        fitness
    }
}

fn finite_min_max(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

fn shift_non_negative(mut values: Vec<f64>) -> Vec<f64> {
    let (min, _) = finite_min_max(&values);
    if min < 0.0 {
        for v in &mut values {
            *v -= min;
        }
    }
    for v in &mut values {
        if !v.is_finite() {
            *v = 0.0;
        }
    }
    values
}
