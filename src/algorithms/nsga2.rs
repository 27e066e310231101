//! NSGA-II survivor selection
//!
//! Non-dominated sorting with constraint-dominance and crowding distance.
//!
//! Reference: Deb, K., Pratap, A., Agarwal, S., & Meyarivan, T. (2002).
//! A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II.
//! IEEE Transactions on Evolutionary Computation, 6(2).

use std::cmp::Ordering;

use crate::config::Direction;
use crate::population::individual::Individual;

/// How objectives and constraints are read from an individual's evaluations
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Objectives {
    pub direction: Direction,
    pub num_constraint: usize,
}

impl Objectives {
    /// Objective `k` mapped so that smaller is better
    pub fn minimized(&self, individual: &Individual, k: usize) -> f64 {
        -self
            .direction
            .oriented(individual.objectives(self.num_constraint)[k])
    }

    /// Number of objectives
    pub fn count(&self, individual: &Individual) -> usize {
        individual.objectives(self.num_constraint).len()
    }

    /// Check if `a` constraint-dominates `b`
    ///
    /// A feasible individual dominates any infeasible one, a smaller total
    /// violation dominates a larger one, and otherwise Pareto dominance over
    /// the objectives decides.
    pub fn dominates(&self, a: &Individual, b: &Individual) -> bool {
        if self.num_constraint > 0 {
            let va = a.constraint_violation(self.num_constraint);
            let vb = b.constraint_violation(self.num_constraint);
            if va < vb {
                return true;
            }
            if vb < va {
                return false;
            }
        }
        let n = self.count(a);
        let mut strictly_better = false;
        for k in 0..n {
            let fa = self.minimized(a, k);
            let fb = self.minimized(b, k);
            if fa > fb {
                return false;
            }
            if fa < fb {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

/// Fast non-dominated sort
///
/// Sets each individual's front and returns the fronts, `fronts[0]` being
/// the non-dominated one. Indices within a front are ascending.
pub fn fast_non_dominated_sort(individuals: &mut [Individual], objectives: &Objectives) -> Vec<Vec<usize>> {
    let n = individuals.len();
    if n == 0 {
        return vec![];
    }

    // domination_count[i] = number of individuals that dominate i
    let mut domination_count = vec![0usize; n];
    // dominated_set[i] = set of individuals that i dominates
    let mut dominated_set: Vec<Vec<usize>> = vec![vec![]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if objectives.dominates(&individuals[i], &individuals[j]) {
                dominated_set[i].push(j);
                domination_count[j] += 1;
            } else if objectives.dominates(&individuals[j], &individuals[i]) {
                dominated_set[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = vec![];
    let mut current_front: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();

    let mut rank = 0;
    while !current_front.is_empty() {
        for &i in &current_front {
            individuals[i].front = rank;
        }

        let mut next_front = vec![];
        for &i in &current_front {
            for &j in &dominated_set[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        next_front.sort_unstable();

        fronts.push(current_front);
        current_front = next_front;
        rank += 1;
    }

    fronts
}

/// Calculate crowding distance for a front
pub fn calculate_crowding_distance(individuals: &mut [Individual], front: &[usize], objectives: &Objectives) {
    let n = front.len();
    if n <= 2 {
        for &i in front {
            individuals[i].crowding = f64::INFINITY;
        }
        return;
    }

    for &i in front {
        individuals[i].crowding = 0.0;
    }

    let num_objectives = objectives.count(&individuals[front[0]]);

    for obj in 0..num_objectives {
        let value = |i: usize| objectives.minimized(&individuals[i], obj);
        let mut sorted: Vec<usize> = front.to_vec();
        sorted.sort_by(|&a, &b| value(a).partial_cmp(&value(b)).unwrap_or(Ordering::Equal));

        let obj_min = value(sorted[0]);
        let obj_max = value(sorted[n - 1]);
        let obj_range = obj_max - obj_min;

        let mut increments = vec![0.0; n];
        if obj_range > 0.0 {
            for k in 1..(n - 1) {
                increments[k] = (value(sorted[k + 1]) - value(sorted[k - 1])) / obj_range;
            }
        }

        // Boundary individuals get infinite distance
        individuals[sorted[0]].crowding = f64::INFINITY;
        individuals[sorted[n - 1]].crowding = f64::INFINITY;
        for k in 1..(n - 1) {
            individuals[sorted[k]].crowding += increments[k];
        }
    }
}

/// Assign fronts and crowding distances to every individual
pub fn assign_ranks(individuals: &mut [Individual], objectives: &Objectives) -> Vec<Vec<usize>> {
    let fronts = fast_non_dominated_sort(individuals, objectives);
    for front in &fronts {
        calculate_crowding_distance(individuals, front, objectives);
    }
    fronts
}

/// Crowded comparison: lower front, then larger crowding distance
pub fn crowded_comparison(a: &Individual, b: &Individual) -> bool {
    a.front < b.front || (a.front == b.front && a.crowding > b.crowding)
}

/// Choose `target` survivors front by front
///
/// The last, partially included front is cut by descending crowding
/// distance, equal distances keeping the lower index.
pub fn select(individuals: &mut [Individual], target: usize, objectives: &Objectives) -> Vec<usize> {
    let fronts = assign_ranks(individuals, objectives);
    let mut chosen = Vec::with_capacity(target);

    for front in fronts {
        if chosen.len() + front.len() <= target {
            chosen.extend(front);
            if chosen.len() == target {
                break;
            }
        } else {
            let mut last = front;
            last.sort_by(|&a, &b| {
                individuals[b]
                    .crowding
                    .partial_cmp(&individuals[a].crowding)
                    .unwrap_or(Ordering::Equal)
            });
            let remaining = target - chosen.len();
            chosen.extend(last.into_iter().take(remaining));
            break;
        }
    }

    chosen
}
