//! Diagnostics and statistics
//!
//! This module provides per-generation statistics and the summary returned
//! by a completed run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fitness::compare::Comparator;
use crate::population::population::Population;

/// Statistics for a single generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Completed generations when this was recorded
    pub iteration: usize,
    /// Total evaluations so far
    pub evaluations: usize,
    /// Primary evaluation of the best individual
    pub best_evaluation: f64,
    /// Primary evaluation of the worst individual
    pub worst_evaluation: f64,
    /// Mean primary evaluation
    pub mean_evaluation: f64,
    /// Standard deviation of the primary evaluation
    pub evaluation_std: f64,
    /// Alleles changed by mutation in this generation
    pub mutations: usize,
    /// Timing information
    pub timing: TimingStats,
}

/// Timing statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Time spent on evaluation (ms)
    pub evaluation_ms: f64,
    /// Time spent on selection, crossover and mutation (ms)
    pub variation_ms: f64,
    /// Time spent on replacement (ms)
    pub replacement_ms: f64,
    /// Total generation time (ms)
    pub total_ms: f64,
}

impl TimingStats {
    /// Create new timing stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Set evaluation time
    pub fn with_evaluation(mut self, duration: Duration) -> Self {
        self.evaluation_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Set variation time
    pub fn with_variation(mut self, duration: Duration) -> Self {
        self.variation_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Set replacement time
    pub fn with_replacement(mut self, duration: Duration) -> Self {
        self.replacement_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Set total time
    pub fn with_total(mut self, duration: Duration) -> Self {
        self.total_ms = duration.as_secs_f64() * 1000.0;
        self
    }
}

impl GenerationStats {
    /// Compute statistics from an evaluated population
    pub fn from_population(
        population: &Population,
        comparator: &Comparator,
        iteration: usize,
        evaluations: usize,
    ) -> Self {
        if population.is_empty() {
            return Self {
                iteration,
                evaluations,
                best_evaluation: f64::NAN,
                worst_evaluation: f64::NAN,
                mean_evaluation: 0.0,
                evaluation_std: 0.0,
                mutations: 0,
                timing: TimingStats::default(),
            };
        }

        let values = population.evaluations();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = if values.len() > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        let best = comparator.best_index(population);
        let worst = comparator.worst_index(population);

        Self {
            iteration,
            evaluations,
            best_evaluation: values[best],
            worst_evaluation: values[worst],
            mean_evaluation: mean,
            evaluation_std: variance.sqrt(),
            mutations: 0,
            timing: TimingStats::default(),
        }
    }

    /// Set the mutation count
    pub fn with_mutations(mut self, mutations: usize) -> Self {
        self.mutations = mutations;
        self
    }

    /// Set timing information
    pub fn with_timing(mut self, timing: TimingStats) -> Self {
        self.timing = timing;
        self
    }
}

/// Statistics collector for an entire run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Statistics per generation
    pub generations: Vec<GenerationStats>,
    /// Total runtime in milliseconds
    pub total_runtime_ms: f64,
    /// Reason for termination
    pub termination_reason: Option<String>,
}

impl EvolutionStats {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation's statistics
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    /// Get the number of generations recorded
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Get the final best evaluation
    pub fn final_best_evaluation(&self) -> Option<f64> {
        self.generations.last().map(|g| g.best_evaluation)
    }

    /// Get the history of best evaluations
    pub fn best_evaluation_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.best_evaluation).collect()
    }

    /// Get the history of mean evaluations
    pub fn mean_evaluation_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.mean_evaluation).collect()
    }

    /// Set the termination reason
    pub fn set_termination_reason(&mut self, reason: &str) {
        self.termination_reason = Some(reason.to_string());
    }

    /// Set the total runtime
    pub fn set_runtime(&mut self, duration: Duration) {
        self.total_runtime_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Get a summary of the run
    pub fn summary(&self) -> String {
        let final_best = self.final_best_evaluation().unwrap_or(f64::NAN);
        format!(
            "Run Summary:\n\
             - Generations: {}\n\
             - Final best: {:.6}\n\
             - Runtime: {:.2}ms\n\
             - Termination: {}",
            self.num_generations(),
            final_best,
            self.total_runtime_ms,
            self.termination_reason.as_deref().unwrap_or("unknown")
        )
    }
}

/// Result of a completed run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Generations performed
    pub iterations: usize,
    /// Evaluations performed
    pub evaluations: usize,
    /// Index of the best individual in the final old population
    pub best_index: usize,
    /// Evaluations of the best individual, primary first
    pub best_evaluations: Vec<f64>,
    /// Why the run stopped
    pub stop_reason: String,
    /// Statistics for the run
    pub stats: EvolutionStats,
}

impl RunSummary {
    /// Primary evaluation of the best individual
    pub fn best_evaluation(&self) -> f64 {
        self.best_evaluations.first().copied().unwrap_or(f64::NAN)
    }
}

pub mod prelude {
    pub use super::{EvolutionStats, GenerationStats, RunSummary, TimingStats};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use crate::genome::chromosome::GeneType;
    use crate::population::individual::Individual;

    fn create_test_population() -> Population {
        let individuals = (1..=5)
            .map(|i| {
                let mut ind = Individual::blank(GeneType::Real, 2, 1);
                ind.set_evaluations(vec![i as f64 * 10.0]).unwrap();
                ind
            })
            .collect();
        Population::from_individuals(individuals)
    }

    fn comparator(direction: Direction) -> Comparator {
        Comparator {
            direction,
            num_constraint: 0,
            multi_objective: false,
        }
    }

    #[test]
    fn test_generation_stats_from_population() {
        let pop = create_test_population();
        let stats = GenerationStats::from_population(&pop, &comparator(Direction::Maximize), 5, 100);

        assert_eq!(stats.iteration, 5);
        assert_eq!(stats.evaluations, 100);
        assert_eq!(stats.best_evaluation, 50.0);
        assert_eq!(stats.worst_evaluation, 10.0);
        assert_eq!(stats.mean_evaluation, 30.0);
    }

    #[test]
    fn test_generation_stats_minimize() {
        let pop = create_test_population();
        let stats = GenerationStats::from_population(&pop, &comparator(Direction::Minimize), 0, 0);
        assert_eq!(stats.best_evaluation, 10.0);
        assert_eq!(stats.worst_evaluation, 50.0);
    }

    #[test]
    fn test_evolution_stats_history() {
        let pop = create_test_population();
        let mut stats = EvolutionStats::new();
        for i in 0..3 {
            stats.record(GenerationStats::from_population(
                &pop,
                &comparator(Direction::Maximize),
                i,
                i * 10,
            ));
        }
        assert_eq!(stats.num_generations(), 3);
        assert_eq!(stats.best_evaluation_history(), vec![50.0; 3]);
        assert_eq!(stats.final_best_evaluation(), Some(50.0));
    }

    #[test]
    fn test_evolution_stats_summary() {
        let mut stats = EvolutionStats::new();
        stats.set_termination_reason("Maximum iterations reached");
        stats.set_runtime(Duration::from_millis(12));
        let summary = stats.summary();
        assert!(summary.contains("Generations: 0"));
        assert!(summary.contains("Maximum iterations reached"));
    }

    #[test]
    fn test_timing_stats() {
        let timing = TimingStats::new()
            .with_evaluation(Duration::from_millis(100))
            .with_variation(Duration::from_millis(50))
            .with_total(Duration::from_millis(200));

        assert!((timing.evaluation_ms - 100.0).abs() < 1.0);
        assert!((timing.variation_ms - 50.0).abs() < 1.0);
        assert!((timing.total_ms - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_run_summary_serializes() {
        let summary = RunSummary {
            iterations: 3,
            evaluations: 30,
            best_index: 1,
            best_evaluations: vec![2.5],
            stop_reason: "Maximum iterations reached".into(),
            stats: EvolutionStats::new(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert_eq!(back.best_evaluation(), 2.5);
    }
}
