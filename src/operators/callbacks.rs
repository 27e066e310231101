//! User-supplied operator hooks
//!
//! [`UserCallbacks`] is a record of optional hooks. Whichever hooks are
//! present when the engine is built replace the library default for that
//! slot as a whole; presence is captured once in [`Capabilities`] and never
//! re-examined during a run.

use std::fmt;

use crate::error::CallbackResult;
use crate::genome::chromosome::Chromosome;
use crate::population::population::{PopId, Population};
use crate::random::RandomSource;
use crate::termination::StopContext;

/// Computes `1 + num_aux_eval` evaluations of a chromosome
pub type EvaluateFn = dyn Fn(&Chromosome) -> CallbackResult<Vec<f64>> + Send + Sync;
/// Fills a fresh chromosome
pub type InitializeFn =
    dyn FnMut(&mut Chromosome, &mut dyn RandomSource) -> CallbackResult<()> + Send;
/// Writes two children from two parents
pub type CrossoverFn = dyn FnMut(
        &Chromosome,
        &Chromosome,
        &mut Chromosome,
        &mut Chromosome,
        &mut dyn RandomSource,
    ) -> CallbackResult<()>
    + Send;
/// Mutates in place with a per-allele rate, returning the number of changed alleles
pub type MutateFn =
    dyn FnMut(&mut Chromosome, f64, &mut dyn RandomSource) -> CallbackResult<usize> + Send;
/// Decides whether two chromosomes are duplicates
pub type CheckDuplicateFn =
    dyn Fn(&Chromosome, &Chromosome) -> CallbackResult<bool> + Send + Sync;
/// 64-bit hash consistent with the duplicate check
pub type HashFn = dyn Fn(&Chromosome) -> CallbackResult<u64> + Send + Sync;
/// Non-negative symmetric distance
pub type GeneDistanceFn = dyn Fn(&Chromosome, &Chromosome) -> CallbackResult<f64> + Send + Sync;
/// Runs after every generation with the iteration count and the new old population
pub type EndOfGenerationFn = dyn FnMut(usize, &Population) -> CallbackResult<()> + Send;
/// Decides whether the run stops; sees the built-in verdict
pub type StopConditionFn = dyn FnMut(&StopContext<'_>) -> CallbackResult<bool> + Send;
/// Runs before a population is evaluated
pub type PreEvaluateFn = dyn FnMut(PopId, &mut Population) -> CallbackResult<()> + Send;

/// Optional user hooks
#[derive(Default)]
pub struct UserCallbacks {
    pub(crate) evaluate: Option<Box<EvaluateFn>>,
    pub(crate) initialize: Option<Box<InitializeFn>>,
    pub(crate) crossover: Option<Box<CrossoverFn>>,
    pub(crate) mutate: Option<Box<MutateFn>>,
    pub(crate) check_duplicate: Option<Box<CheckDuplicateFn>>,
    pub(crate) hash: Option<Box<HashFn>>,
    pub(crate) gene_distance: Option<Box<GeneDistanceFn>>,
    pub(crate) end_of_generation: Option<Box<EndOfGenerationFn>>,
    pub(crate) stop_condition: Option<Box<StopConditionFn>>,
    pub(crate) pre_evaluate: Option<Box<PreEvaluateFn>>,
}

impl UserCallbacks {
    /// An empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the evaluation hook
    pub fn with_evaluate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome) -> CallbackResult<Vec<f64>> + Send + Sync + 'static,
    {
        self.evaluate = Some(Box::new(f));
        self
    }

    /// Set an evaluation hook with a single infallible objective
    pub fn with_objective<F>(self, f: F) -> Self
    where
        F: Fn(&Chromosome) -> f64 + Send + Sync + 'static,
    {
        self.with_evaluate(move |c| Ok(vec![f(c)]))
    }

    /// Set the initialization hook
    pub fn with_initialize<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Chromosome, &mut dyn RandomSource) -> CallbackResult<()> + Send + 'static,
    {
        self.initialize = Some(Box::new(f));
        self
    }

    /// Set the crossover hook
    pub fn with_crossover<F>(mut self, f: F) -> Self
    where
        F: FnMut(
                &Chromosome,
                &Chromosome,
                &mut Chromosome,
                &mut Chromosome,
                &mut dyn RandomSource,
            ) -> CallbackResult<()>
            + Send
            + 'static,
    {
        self.crossover = Some(Box::new(f));
        self
    }

    /// Set the mutation hook
    pub fn with_mutate<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Chromosome, f64, &mut dyn RandomSource) -> CallbackResult<usize>
            + Send
            + 'static,
    {
        self.mutate = Some(Box::new(f));
        self
    }

    /// Set the duplicate check hook
    pub fn with_check_duplicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome, &Chromosome) -> CallbackResult<bool> + Send + Sync + 'static,
    {
        self.check_duplicate = Some(Box::new(f));
        self
    }

    /// Set the hash hook
    pub fn with_hash<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome) -> CallbackResult<u64> + Send + Sync + 'static,
    {
        self.hash = Some(Box::new(f));
        self
    }

    /// Set the gene distance hook
    pub fn with_gene_distance<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome, &Chromosome) -> CallbackResult<f64> + Send + Sync + 'static,
    {
        self.gene_distance = Some(Box::new(f));
        self
    }

    /// Set the end-of-generation hook
    pub fn with_end_of_generation<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, &Population) -> CallbackResult<()> + Send + 'static,
    {
        self.end_of_generation = Some(Box::new(f));
        self
    }

    /// Set the stop condition hook
    pub fn with_stop_condition<F>(mut self, f: F) -> Self
    where
        F: FnMut(&StopContext<'_>) -> CallbackResult<bool> + Send + 'static,
    {
        self.stop_condition = Some(Box::new(f));
        self
    }

    /// Set the pre-evaluation hook
    pub fn with_pre_evaluate<F>(mut self, f: F) -> Self
    where
        F: FnMut(PopId, &mut Population) -> CallbackResult<()> + Send + 'static,
    {
        self.pre_evaluate = Some(Box::new(f));
        self
    }

    /// Snapshot of which hooks are installed
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            evaluate: self.evaluate.is_some(),
            initialize: self.initialize.is_some(),
            crossover: self.crossover.is_some(),
            mutate: self.mutate.is_some(),
            check_duplicate: self.check_duplicate.is_some(),
            hash: self.hash.is_some(),
            gene_distance: self.gene_distance.is_some(),
            end_of_generation: self.end_of_generation.is_some(),
            stop_condition: self.stop_condition.is_some(),
            pre_evaluate: self.pre_evaluate.is_some(),
        }
    }
}

impl fmt::Debug for UserCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCallbacks")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Which user hooks are installed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub evaluate: bool,
    pub initialize: bool,
    pub crossover: bool,
    pub mutate: bool,
    pub check_duplicate: bool,
    pub hash: bool,
    pub gene_distance: bool,
    pub end_of_generation: bool,
    pub stop_condition: bool,
    pub pre_evaluate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_snapshot() {
        let callbacks = UserCallbacks::new()
            .with_objective(|_| 1.0)
            .with_hash(|_| Ok(7));
        let caps = callbacks.capabilities();
        assert!(caps.evaluate);
        assert!(caps.hash);
        assert!(!caps.mutate);
        assert!(!caps.stop_condition);
        assert_eq!(UserCallbacks::new().capabilities(), Capabilities::default());
    }

    #[test]
    fn test_objective_wraps_single_value() {
        let callbacks = UserCallbacks::new().with_objective(|c| c.len() as f64);
        let evaluate = callbacks.evaluate.as_ref().unwrap();
        let values = evaluate(&Chromosome::Binary(vec![true; 4])).unwrap();
        assert_eq!(values, vec![4.0]);
    }
}
