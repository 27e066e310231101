//! Default crossover operators
//!
//! Every operator writes two children into existing chromosomes of the same
//! gene type and length as the parents.

use std::collections::HashMap;

use crate::config::{CrossoverType, EngineConfig};
use crate::genome::bounds::Bounds;
use crate::genome::chromosome::Chromosome;
use crate::random::RandomSource;

/// Built-in crossover
#[derive(Clone, Debug)]
pub struct Crossover {
    kind: CrossoverType,
    /// Per-allele swap probability for uniform crossover and SBX
    uniform_prob: f64,
    /// SBX distribution index
    eta: f64,
    /// Clamp real and integer children to these ranges
    bounds: Option<Vec<Bounds>>,
}

impl Crossover {
    /// Create the crossover described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            kind: config.crossover_type,
            uniform_prob: config.uniform_crossover_prob,
            eta: config.crossover_sbx_eta,
            bounds: config.crossover_bounded.then(|| config.init_bounds()),
        }
    }

    /// The operator kind
    pub fn kind(&self) -> CrossoverType {
        self.kind
    }

    /// Produce two children from two parents
    pub fn apply(
        &self,
        p1: &Chromosome,
        p2: &Chromosome,
        c1: &mut Chromosome,
        c2: &mut Chromosome,
        rng: &mut dyn RandomSource,
    ) {
        match (p1, p2, c1, c2) {
            (Chromosome::Binary(a), Chromosome::Binary(b), Chromosome::Binary(x), Chromosome::Binary(y)) => {
                self.exchange(a, b, x, y, rng);
            }
            (
                Chromosome::Integer(a),
                Chromosome::Integer(b),
                Chromosome::Integer(x),
                Chromosome::Integer(y),
            ) => {
                if self.kind == CrossoverType::Edge {
                    edge_recombination(a, b, x, rng);
                    edge_recombination(b, a, y, rng);
                } else {
                    self.exchange(a, b, x, y, rng);
                }
                if let Some(bounds) = &self.bounds {
                    for (v, bound) in x.iter_mut().chain(y.iter_mut()).zip(bounds.iter().cycle()) {
                        *v = bound.clamp_int(*v);
                    }
                }
            }
            (Chromosome::Real(a), Chromosome::Real(b), Chromosome::Real(x), Chromosome::Real(y)) => {
                if self.kind == CrossoverType::Sbx {
                    self.sbx(a, b, x, y, rng);
                } else {
                    self.exchange(a, b, x, y, rng);
                }
                if let Some(bounds) = &self.bounds {
                    for (v, bound) in x.iter_mut().chain(y.iter_mut()).zip(bounds.iter().cycle()) {
                        *v = bound.clamp(*v);
                    }
                }
            }
            (
                Chromosome::Character(a),
                Chromosome::Character(b),
                Chromosome::Character(x),
                Chromosome::Character(y),
            ) => {
                self.exchange(a, b, x, y, rng);
            }
            // Opaque genes always go through the user hook
            _ => {}
        }
    }

    /// Positional crossover shared by every allele type
    fn exchange<T: Copy>(
        &self,
        a: &[T],
        b: &[T],
        x: &mut [T],
        y: &mut [T],
        rng: &mut dyn RandomSource,
    ) {
        match self.kind {
            CrossoverType::OnePoint => one_point(a, b, x, y, rng),
            CrossoverType::Uniform => uniform(a, b, x, y, self.uniform_prob, rng),
            _ => two_point(a, b, x, y, rng),
        }
    }

    /// Compute the spread factor β from a uniform random value
    fn spread_factor(&self, u: f64) -> f64 {
        if u <= 0.5 {
            (2.0 * u).powf(1.0 / (self.eta + 1.0))
        } else {
            (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (self.eta + 1.0))
        }
    }

    /// Simulated binary crossover, applied per allele with `uniform_prob`
    fn sbx(&self, a: &[f64], b: &[f64], x: &mut [f64], y: &mut [f64], rng: &mut dyn RandomSource) {
        x.copy_from_slice(a);
        y.copy_from_slice(b);
        for i in 0..a.len() {
            if !rng.flip(self.uniform_prob) {
                continue;
            }
            let (x1, x2) = (a[i], b[i]);
            if (x1 - x2).abs() <= 1e-14 {
                continue;
            }
            let beta = self.spread_factor(rng.uniform01());
            x[i] = 0.5 * ((1.0 + beta) * x1 + (1.0 - beta) * x2);
            y[i] = 0.5 * ((1.0 - beta) * x1 + (1.0 + beta) * x2);
        }
    }
}

/// Swap the tails after one random cut point
pub fn one_point<T: Copy>(a: &[T], b: &[T], x: &mut [T], y: &mut [T], rng: &mut dyn RandomSource) {
    x.copy_from_slice(a);
    y.copy_from_slice(b);
    let len = a.len();
    if len < 2 {
        return;
    }
    let cut = rng.uniform_int(1, len as i64 - 1) as usize;
    x[cut..].copy_from_slice(&b[cut..]);
    y[cut..].copy_from_slice(&a[cut..]);
}

/// Swap the segment between two random cut points
pub fn two_point<T: Copy>(a: &[T], b: &[T], x: &mut [T], y: &mut [T], rng: &mut dyn RandomSource) {
    x.copy_from_slice(a);
    y.copy_from_slice(b);
    let len = a.len();
    if len < 2 {
        return;
    }
    let mut first = rng.uniform_int(1, len as i64 - 1) as usize;
    let mut second = rng.uniform_int(1, len as i64 - 1) as usize;
    if first > second {
        std::mem::swap(&mut first, &mut second);
    }
    if first == second {
        second = len;
    }
    x[first..second].copy_from_slice(&b[first..second]);
    y[first..second].copy_from_slice(&a[first..second]);
}

/// Swap each allele independently with probability `p`
pub fn uniform<T: Copy>(
    a: &[T],
    b: &[T],
    x: &mut [T],
    y: &mut [T],
    p: f64,
    rng: &mut dyn RandomSource,
) {
    for i in 0..a.len() {
        if rng.flip(p) {
            x[i] = b[i];
            y[i] = a[i];
        } else {
            x[i] = a[i];
            y[i] = b[i];
        }
    }
}

/// Edge recombination of two permutations, starting from `first[0]`
///
/// Parents that are not permutations of the same values are copied unchanged.
pub fn edge_recombination(first: &[i64], second: &[i64], child: &mut [i64], rng: &mut dyn RandomSource) {
    child.copy_from_slice(first);
    let len = first.len();
    if len < 2 || !same_values(first, second) {
        return;
    }

    let mut adjacency: HashMap<i64, Vec<i64>> = HashMap::with_capacity(len);
    for parent in [first, second] {
        for i in 0..len {
            let entry = adjacency.entry(parent[i]).or_default();
            for neighbour in [parent[(i + len - 1) % len], parent[(i + 1) % len]] {
                if !entry.contains(&neighbour) {
                    entry.push(neighbour);
                }
            }
        }
    }

    let mut used: HashMap<i64, bool> = first.iter().map(|&v| (v, false)).collect();
    let mut current = first[0];
    for slot in child.iter_mut() {
        *slot = current;
        used.insert(current, true);
        for list in adjacency.values_mut() {
            list.retain(|&v| v != current);
        }

        let candidates = adjacency.get(&current).cloned().unwrap_or_default();
        let next = if candidates.is_empty() {
            let remaining: Vec<i64> = first
                .iter()
                .copied()
                .filter(|v| !used.get(v).copied().unwrap_or(true))
                .collect();
            if remaining.is_empty() {
                break;
            }
            remaining[rng.index(remaining.len())]
        } else {
            let degree = |v: &i64| adjacency.get(v).map_or(0, Vec::len);
            let fewest = candidates.iter().map(degree).min().unwrap_or(0);
            let ties: Vec<i64> = candidates
                .iter()
                .copied()
                .filter(|v| degree(v) == fewest)
                .collect();
            ties[rng.index(ties.len())]
        };
        current = next;
    }
}

fn same_values(a: &[i64], b: &[i64]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b && a.windows(2).all(|w| w[0] != w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::chromosome::GeneType;
    use crate::random::StdRandom;

    fn config(gene_type: GeneType, kind: CrossoverType) -> EngineConfig {
        let mut config = EngineConfig::new(gene_type, 8);
        config.crossover_type = kind;
        config
    }

    #[test]
    fn test_one_point_crossover() {
        let mut rng = StdRandom::new(42);
        let a = [0u8; 8];
        let b = [1u8; 8];
        let mut x = [9u8; 8];
        let mut y = [9u8; 8];
        one_point(&a, &b, &mut x, &mut y, &mut rng);
        let cut = x.iter().position(|&v| v == 1).unwrap();
        assert!(cut >= 1);
        assert!(x[..cut].iter().all(|&v| v == 0) && x[cut..].iter().all(|&v| v == 1));
        assert!(y[..cut].iter().all(|&v| v == 1) && y[cut..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_two_point_children_are_complementary() {
        let mut rng = StdRandom::new(42);
        for _ in 0..20 {
            let a = [false; 8];
            let b = [true; 8];
            let mut x = [false; 8];
            let mut y = [false; 8];
            two_point(&a, &b, &mut x, &mut y, &mut rng);
            for i in 0..8 {
                assert_ne!(x[i], y[i]);
            }
            assert!(!x[0]);
            assert!(x.iter().any(|&v| v));
        }
    }

    #[test]
    fn test_uniform_crossover_complementary() {
        let mut rng = StdRandom::new(1);
        let a = [1i64, 2, 3, 4];
        let b = [5i64, 6, 7, 8];
        let mut x = [0i64; 4];
        let mut y = [0i64; 4];
        uniform(&a, &b, &mut x, &mut y, 0.5, &mut rng);
        for i in 0..4 {
            assert_eq!(x[i] + y[i], a[i] + b[i]);
        }
    }

    #[test]
    fn test_sbx_identical_parents() {
        let crossover = Crossover::from_config(&config(GeneType::Real, CrossoverType::Sbx));
        let mut rng = StdRandom::new(42);
        let p = Chromosome::Real(vec![0.5; 8]);
        let mut x = Chromosome::new(GeneType::Real, 8);
        let mut y = Chromosome::new(GeneType::Real, 8);
        crossover.apply(&p, &p, &mut x, &mut y, &mut rng);
        assert_eq!(x, p);
        assert_eq!(y, p);
    }

    #[test]
    fn test_sbx_preserves_midpoint() {
        let crossover = Crossover::from_config(&config(GeneType::Real, CrossoverType::Sbx));
        let mut rng = StdRandom::new(9);
        let a = Chromosome::Real(vec![0.0; 8]);
        let b = Chromosome::Real(vec![1.0; 8]);
        let mut x = Chromosome::new(GeneType::Real, 8);
        let mut y = Chromosome::new(GeneType::Real, 8);
        crossover.apply(&a, &b, &mut x, &mut y, &mut rng);
        let (x, y) = (x.as_real().unwrap(), y.as_real().unwrap());
        for i in 0..8 {
            approx::assert_relative_eq!(x[i] + y[i], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sbx_spread_factor() {
        let crossover = Crossover::from_config(&config(GeneType::Real, CrossoverType::Sbx));
        approx::assert_relative_eq!(crossover.spread_factor(0.5), 1.0);
        assert!(crossover.spread_factor(0.1) < 1.0);
        assert!(crossover.spread_factor(0.9) > 1.0);
    }

    #[test]
    fn test_bounded_crossover_clamps() {
        let mut cfg = config(GeneType::Real, CrossoverType::Sbx);
        cfg.crossover_bounded = true;
        cfg.uniform_crossover_prob = 1.0;
        cfg.crossover_sbx_eta = 0.0;
        let crossover = Crossover::from_config(&cfg);
        let mut rng = StdRandom::new(4);
        let a = Chromosome::Real(vec![0.0; 8]);
        let b = Chromosome::Real(vec![1.0; 8]);
        let mut x = Chromosome::new(GeneType::Real, 8);
        let mut y = Chromosome::new(GeneType::Real, 8);
        for _ in 0..20 {
            crossover.apply(&a, &b, &mut x, &mut y, &mut rng);
            for v in x.as_real().unwrap().iter().chain(y.as_real().unwrap()) {
                assert!((0.0..=1.0).contains(v));
            }
        }
    }

    #[test]
    fn test_edge_recombination_yields_permutation() {
        let mut rng = StdRandom::new(42);
        let a = [0i64, 1, 2, 3, 4, 5, 6, 7];
        let b = [3i64, 7, 0, 5, 1, 6, 2, 4];
        let mut child = [0i64; 8];
        for _ in 0..20 {
            edge_recombination(&a, &b, &mut child, &mut rng);
            assert_eq!(child[0], 0);
            let mut sorted = child.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, a.to_vec());
        }
    }

    #[test]
    fn test_edge_recombination_rejects_non_permutations() {
        let mut rng = StdRandom::new(42);
        let a = [0i64, 1, 2, 3];
        let b = [0i64, 0, 1, 1];
        let mut child = [9i64; 4];
        edge_recombination(&a, &b, &mut child, &mut rng);
        assert_eq!(child, a);
    }
}
