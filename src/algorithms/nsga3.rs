//! NSGA-III survivor selection
//!
//! Whole fronts are taken as in NSGA-II. The last, partially included front
//! is cut by associating every candidate with its nearest reference
//! direction in normalised objective space and repeatedly filling the least
//! crowded niche.
//!
//! Reference: Deb, K., & Jain, H. (2014). An Evolutionary Many-Objective
//! Optimization Algorithm Using Reference-Point-Based Nondominated Sorting
//! Approach, Part I. IEEE Transactions on Evolutionary Computation, 18(4).

use std::cmp::Ordering;

use crate::algorithms::nsga2::{assign_ranks, Objectives};
use crate::population::individual::Individual;
use crate::random::RandomSource;

/// Perpendicular distance from `point` to the line through the origin along `direction`
pub fn perpendicular_distance(point: &[f64], direction: &[f64]) -> f64 {
    let norm_sq: f64 = direction.iter().map(|w| w * w).sum();
    if norm_sq <= 0.0 {
        return point.iter().map(|x| x * x).sum::<f64>().sqrt();
    }
    let projection = point.iter().zip(direction).map(|(x, w)| x * w).sum::<f64>() / norm_sq;
    point
        .iter()
        .zip(direction)
        .map(|(x, w)| (x - projection * w).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Objectives of `members` translated by the ideal point and scaled by the
/// ideal-to-nadir range, so every coordinate lies in `[0, 1]`
fn normalize(individuals: &[Individual], members: &[usize], objectives: &Objectives) -> Vec<Vec<f64>> {
    let Some(&first) = members.first() else {
        return Vec::new();
    };
    let m = objectives.count(&individuals[first]);
    let raw: Vec<Vec<f64>> = members
        .iter()
        .map(|&i| (0..m).map(|k| objectives.minimized(&individuals[i], k)).collect())
        .collect();

    let mut ideal = vec![f64::INFINITY; m];
    let mut nadir = vec![f64::NEG_INFINITY; m];
    for row in &raw {
        for k in 0..m {
            ideal[k] = ideal[k].min(row[k]);
            nadir[k] = nadir[k].max(row[k]);
        }
    }

    raw.into_iter()
        .map(|row| {
            (0..m)
                .map(|k| {
                    let range = nadir[k] - ideal[k];
                    if range > 0.0 && range.is_finite() {
                        (row[k] - ideal[k]) / range
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Index of the nearest reference direction and the distance to it
fn associate(point: &[f64], reference_points: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, w) in reference_points.iter().enumerate() {
        let d = perpendicular_distance(point, w);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Choose `target` survivors front by front with reference-point niching
pub fn select(
    individuals: &mut [Individual],
    target: usize,
    objectives: &Objectives,
    reference_points: &[Vec<f64>],
    rng: &mut dyn RandomSource,
) -> Vec<usize> {
    let fronts = assign_ranks(individuals, objectives);
    let mut chosen: Vec<usize> = Vec::with_capacity(target);
    let mut last: Vec<usize> = Vec::new();

    for front in fronts {
        if chosen.len() + front.len() <= target {
            chosen.extend(front);
            if chosen.len() == target {
                return chosen;
            }
        } else {
            last = front;
            break;
        }
    }
    if last.is_empty() || reference_points.is_empty() {
        return chosen;
    }

    let members: Vec<usize> = chosen.iter().chain(&last).copied().collect();
    let normalized = normalize(individuals, &members, objectives);
    let associations: Vec<(usize, f64)> = normalized
        .iter()
        .map(|p| associate(p, reference_points))
        .collect();

    let mut niche_count = vec![0usize; reference_points.len()];
    for &(j, _) in &associations[..chosen.len()] {
        niche_count[j] += 1;
    }

    // Candidates of the last front: (individual index, niche, distance)
    let mut candidates: Vec<(usize, usize, f64)> = last
        .iter()
        .zip(&associations[chosen.len()..])
        .map(|(&i, &(j, d))| (i, j, d))
        .collect();
    let mut open = vec![true; reference_points.len()];

    while chosen.len() < target && !candidates.is_empty() {
        // Least crowded open niche, lowest index on ties
        let Some(niche) = (0..reference_points.len())
            .filter(|&j| open[j])
            .min_by_key(|&j| (niche_count[j], j))
        else {
            break;
        };

        let in_niche: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.1 == niche)
            .map(|(pos, _)| pos)
            .collect();
        if in_niche.is_empty() {
            open[niche] = false;
            continue;
        }

        let pick = if niche_count[niche] == 0 {
            // Closest to the reference line, lower index on ties
            in_niche
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    candidates[a]
                        .2
                        .partial_cmp(&candidates[b].2)
                        .unwrap_or(Ordering::Equal)
                        .then(candidates[a].0.cmp(&candidates[b].0))
                })
                .unwrap_or(in_niche[0])
        } else {
            in_niche[rng.index(in_niche.len())]
        };

        let (index, _, _) = candidates.remove(pick);
        chosen.push(index);
        niche_count[niche] += 1;
    }

    chosen
}
