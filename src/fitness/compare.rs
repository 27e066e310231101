//! Ordering of individuals
//!
//! Every "is this individual better" decision in the engine goes through
//! [`Comparator`]: feasibility first, then the multi-objective rank, then the
//! primary evaluation in the run's direction.

use std::cmp::Ordering;

use crate::config::{Direction, EngineConfig};
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Constraint-aware total preorder over individuals
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparator {
    pub direction: Direction,
    pub num_constraint: usize,
    /// Order by non-dominated front and crowding before the primary evaluation
    pub multi_objective: bool,
}

impl Comparator {
    /// Create the comparator described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            direction: config.direction,
            num_constraint: config.num_constraint,
            multi_objective: config.replacement.is_multi_objective(),
        }
    }

    /// `Less` means `a` is better than `b`
    pub fn compare(&self, a: &Individual, b: &Individual) -> Ordering {
        if self.num_constraint > 0 {
            let va = a.constraint_violation(self.num_constraint);
            let vb = b.constraint_violation(self.num_constraint);
            match va.partial_cmp(&vb) {
                Some(Ordering::Equal) | None => {}
                Some(order) => return order,
            }
        }
        if self.multi_objective {
            match a.front.cmp(&b.front) {
                Ordering::Equal => {}
                order => return order,
            }
            match b.crowding.partial_cmp(&a.crowding) {
                Some(Ordering::Equal) | None => {}
                Some(order) => return order,
            }
        }
        let oa = self.direction.oriented(a.evaluation());
        let ob = self.direction.oriented(b.evaluation());
        ob.partial_cmp(&oa).unwrap_or(Ordering::Equal)
    }

    /// True if `a` is strictly better than `b`
    pub fn is_better(&self, a: &Individual, b: &Individual) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Indices sorted best first; equal individuals keep index order
    pub fn ranked(&self, individuals: &[Individual]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..individuals.len()).collect();
        order.sort_by(|&a, &b| self.compare(&individuals[a], &individuals[b]));
        order
    }

    /// Index of the best individual, the lowest index among equals
    pub fn best_index(&self, population: &Population) -> usize {
        let individuals = population.individuals();
        let mut best = 0;
        for i in 1..individuals.len() {
            if self.is_better(&individuals[i], &individuals[best]) {
                best = i;
            }
        }
        best
    }

    /// Index of the worst individual, the highest index among equals
    pub fn worst_index(&self, population: &Population) -> usize {
        let individuals = population.individuals();
        let mut worst = 0;
        for i in 1..individuals.len() {
            if !self.is_better(&individuals[i], &individuals[worst]) {
                worst = i;
            }
        }
        worst
    }
}
