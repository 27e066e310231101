//! Default mutation operators
//!
//! Each operator visits every allele, mutates it with the per-allele rate
//! and reports how many alleles actually changed.

use crate::config::{EngineConfig, MutationType};
use crate::genome::bounds::Bounds;
use crate::genome::chromosome::Chromosome;
use crate::random::RandomSource;

/// Built-in mutation
#[derive(Clone, Debug)]
pub struct Mutator {
    kind: Option<MutationType>,
    /// Step size of constant, uniform and gaussian mutation
    value: f64,
    /// Polynomial distribution index
    poly_eta: f64,
    /// Init range, used by range and polynomial mutation and for clamping
    bounds: Vec<Bounds>,
    bounded: bool,
    alphabet: &'static [u8],
}

impl Mutator {
    /// Create the mutation described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            kind: config.mutation_type(),
            value: config.mutation_value(),
            poly_eta: config.mutation_poly_eta,
            bounds: config.init_bounds(),
            bounded: config.mutation_bounded,
            alphabet: config.character_init.alphabet(),
        }
    }

    /// Mutate in place; returns the number of changed alleles
    pub fn mutate(&self, chromosome: &mut Chromosome, rate: f64, rng: &mut dyn RandomSource) -> usize {
        match chromosome {
            Chromosome::Binary(bits) => {
                let mut count = 0;
                for bit in bits.iter_mut() {
                    if rng.flip(rate) {
                        *bit = !*bit;
                        count += 1;
                    }
                }
                count
            }
            Chromosome::Integer(values) => self.mutate_integer(values, rate, rng),
            Chromosome::Real(values) => self.mutate_real(values, rate, rng),
            Chromosome::Character(chars) => {
                let mut count = 0;
                for c in chars.iter_mut() {
                    if rng.flip(rate) {
                        let new = self.alphabet[rng.index(self.alphabet.len())];
                        if new != *c {
                            *c = new;
                            count += 1;
                        }
                    }
                }
                count
            }
            Chromosome::Opaque(_) => 0,
        }
    }

    fn mutate_integer(&self, values: &mut [i64], rate: f64, rng: &mut dyn RandomSource) -> usize {
        let len = values.len();
        let step = (self.value.round() as i64).max(1);
        let mut count = 0;
        for i in 0..len {
            if !rng.flip(rate) {
                continue;
            }
            let old = values[i];
            match self.kind {
                Some(MutationType::Permute) => {
                    let j = rng.index(len);
                    values.swap(i, j);
                }
                Some(MutationType::Range) => {
                    if let Some(b) = self.bounds.get(i) {
                        let (lo, hi) = b.int_range();
                        values[i] = rng.uniform_int(lo, hi);
                    }
                }
                _ => {
                    values[i] = if rng.flip(0.5) {
                        old.saturating_add(step)
                    } else {
                        old.saturating_sub(step)
                    };
                }
            }
            if self.bounded && self.kind != Some(MutationType::Permute) {
                if let Some(b) = self.bounds.get(i) {
                    values[i] = b.clamp_int(values[i]);
                }
            }
            if values[i] != old {
                count += 1;
            }
        }
        count
    }

    fn mutate_real(&self, values: &mut [f64], rate: f64, rng: &mut dyn RandomSource) -> usize {
        let mut count = 0;
        for (i, value) in values.iter_mut().enumerate() {
            if !rng.flip(rate) {
                continue;
            }
            let old = *value;
            let bound = self.bounds.get(i).copied();
            *value = match (self.kind, bound) {
                (Some(MutationType::Range), Some(b)) => rng.uniform_real(b.min, b.max),
                (Some(MutationType::Polynomial), Some(b)) => {
                    polynomial(old, b.min, b.max, self.poly_eta, rng)
                }
                (Some(MutationType::Uniform), _) => old + rng.uniform_real(-self.value, self.value),
                _ => old + rng.gaussian(0.0, self.value),
            };
            if self.bounded {
                if let Some(b) = bound {
                    *value = b.clamp(*value);
                }
            }
            if *value != old {
                count += 1;
            }
        }
        count
    }
}

/// Polynomial mutation of one allele inside `[min, max]`
pub fn polynomial(gene: f64, min: f64, max: f64, eta: f64, rng: &mut dyn RandomSource) -> f64 {
    let range = max - min;
    if range <= 0.0 {
        return gene;
    }

    let delta1 = ((gene - min) / range).clamp(0.0, 1.0);
    let delta2 = ((max - gene) / range).clamp(0.0, 1.0);

    let u = rng.uniform01();
    let delta_q = if u <= 0.5 {
        let val = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - delta1).powf(eta + 1.0);
        val.powf(1.0 / (eta + 1.0)) - 1.0
    } else {
        let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - delta2).powf(eta + 1.0);
        1.0 - val.powf(1.0 / (eta + 1.0))
    };

    (gene + delta_q * range).clamp(min, max)
}
