//! Default initialization
//!
//! Fills fresh chromosomes according to the run's initialization policy.

use crate::config::{CharacterInit, EngineConfig, IntegerInit};
use crate::genome::bounds::Bounds;
use crate::genome::chromosome::Chromosome;
use crate::random::{shuffle, RandomSource};

/// Built-in initializer
#[derive(Clone, Debug)]
pub struct Initializer {
    bounds: Vec<Bounds>,
    integer_init: IntegerInit,
    binary_init_prob: f64,
    character_init: CharacterInit,
}

impl Initializer {
    /// Create the initializer described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            bounds: config.init_bounds(),
            integer_init: config.integer_init,
            binary_init_prob: config.binary_init_prob,
            character_init: config.character_init,
        }
    }

    /// Per-allele init range
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    /// Fill `chromosome` with random alleles; opaque chromosomes are left untouched
    pub fn initialize(&self, chromosome: &mut Chromosome, rng: &mut dyn RandomSource) {
        match chromosome {
            Chromosome::Binary(bits) => {
                for bit in bits.iter_mut() {
                    *bit = rng.flip(self.binary_init_prob);
                }
            }
            Chromosome::Integer(values) => match self.integer_init {
                IntegerInit::Permute { start } => {
                    for (value, offset) in values.iter_mut().zip(0i64..) {
                        *value = start + offset;
                    }
                    shuffle(rng, values);
                }
                IntegerInit::Range => {
                    for (value, b) in values.iter_mut().zip(&self.bounds) {
                        let (lo, hi) = b.int_range();
                        *value = rng.uniform_int(lo, hi);
                    }
                }
            },
            Chromosome::Real(values) => {
                for (value, b) in values.iter_mut().zip(&self.bounds) {
                    *value = rng.uniform_real(b.min, b.max);
                }
            }
            Chromosome::Character(chars) => {
                let alphabet = self.character_init.alphabet();
                for c in chars.iter_mut() {
                    *c = alphabet[rng.index(alphabet.len())];
                }
            }
            Chromosome::Opaque(_) => {}
        }
    }
}
