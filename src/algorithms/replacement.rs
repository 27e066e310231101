//! Survivor replacement
//!
//! After the offspring in `new[0..n]` are evaluated, [`ReplacementEngine`]
//! decides which individuals make up the complete new population. The
//! engine then swaps the buffers. Scratch slots never take part.

use tracing::trace;

use crate::algorithms::nsga2::{self, Objectives};
use crate::algorithms::nsga3;
use crate::config::{EngineConfig, ReplacementType};
use crate::error::{EngineError, GaResult, SetupError};
use crate::fitness::compare::Comparator;
use crate::operators::set::OperatorSet;
use crate::population::individual::Individual;
use crate::population::population::Generations;
use crate::random::{sample_distinct, RandomSource};

/// Replacement policy of a run
#[derive(Clone, Debug)]
pub struct ReplacementEngine {
    kind: ReplacementType,
    pop_size: usize,
    num_replace: usize,
    rtr_window_size: usize,
    comparator: Comparator,
    objectives: Objectives,
    reference_points: Vec<Vec<f64>>,
}

impl ReplacementEngine {
    /// Create the replacement described by a configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, SetupError> {
        let reference_points = match config.replacement {
            ReplacementType::Nsga3 => config
                .reference_points
                .clone()
                .filter(|points| !points.is_empty())
                .ok_or_else(|| SetupError::ReferencePoints("NSGA-III needs reference points".into()))?,
            _ => Vec::new(),
        };
        Ok(Self {
            kind: config.replacement,
            pop_size: config.pop_size,
            num_replace: config.num_replace(),
            rtr_window_size: config.rtr_window_size,
            comparator: Comparator::from_config(config),
            objectives: Objectives {
                direction: config.direction,
                num_constraint: config.num_constraint,
            },
            reference_points,
        })
    }

    /// The replacement policy
    pub fn kind(&self) -> ReplacementType {
        self.kind
    }

    /// Number of offspring produced per generation
    pub fn offspring_count(&self) -> usize {
        self.num_replace
    }

    /// How objectives are read for multi-objective ranking
    pub fn objectives(&self) -> &Objectives {
        &self.objectives
    }

    /// Complete the new population from the evaluated offspring and the old population
    pub fn replace(
        &self,
        generations: &mut Generations,
        operators: &OperatorSet,
        rng: &mut dyn RandomSource,
    ) -> GaResult<()> {
        let n = self.num_replace;
        let (old, new) = generations.split_mut();
        match self.kind {
            ReplacementType::Best => {
                let ranked = self.comparator.ranked(old.individuals());
                let survivors = &mut new.individuals_mut()[n..];
                for (slot, &index) in survivors.iter_mut().zip(&ranked) {
                    *slot = old.get(index)?.clone();
                }
            }
            ReplacementType::RandomRep => {
                let mut next = old.individuals().to_vec();
                for child in &new.individuals()[..n] {
                    next[rng.index(self.pop_size)] = child.clone();
                }
                new.install(next);
            }
            ReplacementType::RandomNoRep => {
                let mut next = old.individuals().to_vec();
                let victims = sample_distinct(rng, self.pop_size, n);
                for (child, victim) in new.individuals()[..n].iter().zip(victims) {
                    next[victim] = child.clone();
                }
                new.install(next);
            }
            ReplacementType::Rtr => {
                let mut next = old.individuals().to_vec();
                for child in &new.individuals()[..n] {
                    let window = sample_distinct(rng, self.pop_size, self.rtr_window_size);
                    let nearest = window
                        .into_iter()
                        .map(|j| (operators.distance(child.chromosome(), next[j].chromosome()), j))
                        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    if let Some((_, j)) = nearest {
                        if self.comparator.is_better(child, &next[j]) {
                            trace!(replaced = j, "restricted tournament replacement");
                            next[j] = child.clone();
                        }
                    }
                }
                new.install(next);
            }
            ReplacementType::PairwiseBest => {
                for (child, parent) in new.individuals_mut().iter_mut().zip(old.individuals()) {
                    if !self.comparator.is_better(child, parent) {
                        *child = parent.clone();
                    }
                }
            }
            ReplacementType::Nsga2 | ReplacementType::Nsga3 => {
                let mut combined: Vec<Individual> = Vec::new();
                combined
                    .try_reserve_exact(2 * self.pop_size)
                    .map_err(|e| EngineError::ResourceExhaustion(e.to_string()))?;
                combined.extend(old.iter().cloned());
                combined.extend(new.iter().cloned());

                let chosen = if self.kind == ReplacementType::Nsga2 {
                    nsga2::select(&mut combined, self.pop_size, &self.objectives)
                } else {
                    nsga3::select(
                        &mut combined,
                        self.pop_size,
                        &self.objectives,
                        &self.reference_points,
                        rng,
                    )
                };
                let mut next: Vec<Individual> = chosen.iter().map(|&i| combined[i].clone()).collect();
                // Crowding is recomputed over the survivors, which the
                // fitness ranking of the next generation reads
                nsga2::assign_ranks(&mut next, &self.objectives);
                new.install(next);
            }
        }
        Ok(())
    }
}
