//! The operator set of a run
//!
//! [`OperatorSet`] pairs every operator slot with either the user hook or
//! the built-in default, decided once at construction. All invocations go
//! through the run's [`RunControl`]: once its flag is set each call returns a
//! neutral value without running anything, and a failing hook sets the flag
//! with the hook's error.

use std::sync::Arc;

use tracing::debug;

use crate::config::{EngineConfig, MixingPolicy};
use crate::error::{CallbackResult, ContractViolation, EngineError, SetupError};
use crate::genome::chromosome::{Chromosome, GeneType};
use crate::operators::callbacks::{Capabilities, EvaluateFn, UserCallbacks};
use crate::operators::crossover::Crossover;
use crate::operators::distance::default_distance;
use crate::operators::init::Initializer;
use crate::operators::mutation::Mutator;
use crate::population::individual::Individual;
use crate::population::population::{PopId, Population};
use crate::random::RandomSource;
use crate::registry::RunControl;
use crate::termination::StopContext;

/// Operators of one run, each either user-supplied or built in
pub struct OperatorSet {
    initializer: Initializer,
    crossover: Crossover,
    mutator: Mutator,
    callbacks: UserCallbacks,
    capabilities: Capabilities,
    control: Arc<RunControl>,
    num_evaluations: usize,
    mutation_rate: f64,
}

impl OperatorSet {
    /// Check that every hook the configuration depends on is installed
    pub fn check_hooks(config: &EngineConfig, caps: &Capabilities) -> Result<(), SetupError> {
        if !caps.evaluate {
            return Err(SetupError::MissingHook {
                hook: "evaluate",
                reason: "every run needs an evaluation function",
            });
        }
        if config.gene_type == GeneType::Opaque {
            if !caps.initialize {
                return Err(SetupError::MissingHook {
                    hook: "initialize",
                    reason: "opaque genes have no built-in initialization",
                });
            }
            if !caps.mutate {
                return Err(SetupError::MissingHook {
                    hook: "mutate",
                    reason: "opaque genes have no built-in mutation",
                });
            }
            if !caps.crossover && config.mixing != MixingPolicy::MutationOnly {
                return Err(SetupError::MissingHook {
                    hook: "crossover",
                    reason: "opaque genes have no built-in crossover",
                });
            }
            if config.no_duplicates && !caps.hash {
                return Err(SetupError::MissingHook {
                    hook: "hash",
                    reason: "duplicate checking of opaque genes needs a hash",
                });
            }
        }
        if config.stopping_rules.is_empty() && !caps.stop_condition {
            return Err(SetupError::Configuration(
                "no stopping rule and no stop condition hook".into(),
            ));
        }
        Ok(())
    }

    /// Build the operator set, validating hook requirements
    pub fn new(
        config: &EngineConfig,
        callbacks: UserCallbacks,
        control: Arc<RunControl>,
    ) -> Result<Self, SetupError> {
        let capabilities = callbacks.capabilities();
        Self::check_hooks(config, &capabilities)?;
        debug!(?capabilities, "operator hooks installed");
        Ok(Self {
            initializer: Initializer::from_config(config),
            crossover: Crossover::from_config(config),
            mutator: Mutator::from_config(config),
            callbacks,
            capabilities,
            control,
            num_evaluations: config.num_evaluations(),
            mutation_rate: config.mutation_prob(),
        })
    }

    /// Which hooks are installed
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The run's control handle
    pub fn control(&self) -> &Arc<RunControl> {
        &self.control
    }

    /// Per-allele mutation rate
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub(crate) fn set_mutation_rate(&mut self, rate: f64) {
        self.mutation_rate = rate;
    }

    fn record<T>(&self, operator: &'static str, result: CallbackResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(source) => {
                self.control.fail(EngineError::callback(operator, source));
                None
            }
        }
    }

    /// Fill an individual's alleles; the individual is left unevaluated
    pub fn initialize(&mut self, individual: &mut Individual, rng: &mut dyn RandomSource) {
        individual.invalidate();
        if self.control.is_failed() {
            return;
        }
        match self.callbacks.initialize.as_mut() {
            Some(hook) => {
                let result = hook(individual.chromosome_mut(), rng);
                self.record("initialize", result);
            }
            None => self.initializer.initialize(individual.chromosome_mut(), rng),
        }
    }

    /// Evaluate one chromosome; `None` once the run has failed
    pub fn evaluate(&self, chromosome: &Chromosome) -> Option<Vec<f64>> {
        let hook = self.callbacks.evaluate.as_deref()?;
        evaluate_with(hook, &self.control, self.num_evaluations, chromosome)
    }

    /// Evaluate every pending individual among the first `limit`
    ///
    /// Returns the number of evaluations performed. With `parallel` the
    /// pending individuals are sharded over the rayon pool and the call
    /// returns only after every shard has finished.
    pub fn evaluate_population(&self, population: &mut Population, limit: usize, parallel: bool) -> usize {
        let Some(hook) = self.callbacks.evaluate.as_deref() else {
            return 0;
        };
        if self.control.is_failed() {
            return 0;
        }
        let control = self.control.as_ref();
        let expected = self.num_evaluations;
        let evaluate = |ind: &Individual| evaluate_with(hook, control, expected, ind.chromosome());

        #[cfg(feature = "parallel")]
        let results = if parallel {
            population.par_map_pending(limit, evaluate)
        } else {
            population.map_pending(limit, evaluate)
        };
        #[cfg(not(feature = "parallel"))]
        let results = {
            let _ = parallel;
            population.map_pending(limit, evaluate)
        };

        let mut count = 0;
        for (index, values) in results {
            let Some(values) = values else { continue };
            let stored = population
                .get_mut(index)
                .and_then(|ind| ind.set_evaluations(values));
            match stored {
                Ok(()) => count += 1,
                Err(violation) => self.control.fail(violation.into()),
            }
        }
        count
    }

    /// Write two children from two parents
    pub fn crossover(
        &mut self,
        p1: &Chromosome,
        p2: &Chromosome,
        c1: &mut Chromosome,
        c2: &mut Chromosome,
        rng: &mut dyn RandomSource,
    ) {
        if self.control.is_failed() {
            return;
        }
        match self.callbacks.crossover.as_mut() {
            Some(hook) => {
                let result = hook(p1, p2, c1, c2, rng);
                self.record("crossover", result);
            }
            None => self.crossover.apply(p1, p2, c1, c2, rng),
        }
    }

    /// Mutate in place at the current rate; returns the changed allele count
    pub fn mutate(&mut self, chromosome: &mut Chromosome, rng: &mut dyn RandomSource) -> usize {
        self.mutate_with_rate(chromosome, self.mutation_rate, rng)
    }

    /// Mutate in place at an explicit rate
    pub fn mutate_with_rate(
        &mut self,
        chromosome: &mut Chromosome,
        rate: f64,
        rng: &mut dyn RandomSource,
    ) -> usize {
        if self.control.is_failed() {
            return 0;
        }
        match self.callbacks.mutate.as_mut() {
            Some(hook) => {
                let result = hook(chromosome, rate, rng);
                self.record("mutate", result).unwrap_or(0)
            }
            None => self.mutator.mutate(chromosome, rate, rng),
        }
    }

    /// Whether two chromosomes are duplicates
    pub fn is_duplicate(&self, a: &Chromosome, b: &Chromosome) -> bool {
        if self.control.is_failed() {
            return false;
        }
        match self.callbacks.check_duplicate.as_deref() {
            Some(hook) => self.record("check_duplicate", hook(a, b)).unwrap_or(false),
            None => a == b,
        }
    }

    /// 64-bit hash consistent with [`OperatorSet::is_duplicate`]
    pub fn hash(&self, chromosome: &Chromosome) -> u64 {
        if self.control.is_failed() {
            return 0;
        }
        match self.callbacks.hash.as_deref() {
            Some(hook) => self.record("hash", hook(chromosome)).unwrap_or(0),
            // A user duplicate check may equate chromosomes with different
            // alleles, so without a user hash everything shares one bucket.
            None if self.capabilities.check_duplicate => 0,
            None => chromosome.default_hash().unwrap_or(0),
        }
    }

    /// Non-negative distance between two chromosomes
    pub fn distance(&self, a: &Chromosome, b: &Chromosome) -> f64 {
        if self.control.is_failed() {
            return 0.0;
        }
        match self.callbacks.gene_distance.as_deref() {
            Some(hook) => match self.record("gene_distance", hook(a, b)) {
                Some(d) if d >= 0.0 => d,
                Some(d) => {
                    self.control.fail(EngineError::Contract(ContractViolation::InvalidParameter {
                        parameter: "gene_distance",
                        value: d.to_string(),
                    }));
                    0.0
                }
                None => 0.0,
            },
            None => default_distance(a, b),
        }
    }

    /// Run the pre-evaluation hook, if any
    pub fn pre_evaluate(&mut self, pop: PopId, population: &mut Population) {
        if self.control.is_failed() {
            return;
        }
        if let Some(hook) = self.callbacks.pre_evaluate.as_mut() {
            let result = hook(pop, population);
            self.record("pre_evaluate", result);
        }
    }

    /// Run the end-of-generation hook, if any
    pub fn end_of_generation(&mut self, iteration: usize, population: &Population) {
        if self.control.is_failed() {
            return;
        }
        if let Some(hook) = self.callbacks.end_of_generation.as_mut() {
            let result = hook(iteration, population);
            self.record("end_of_generation", result);
        }
    }

    /// Ask the stop condition hook; `None` when no hook is installed
    pub fn stop_condition(&mut self, context: &StopContext<'_>) -> Option<bool> {
        if self.control.is_failed() {
            return Some(true);
        }
        let hook = self.callbacks.stop_condition.as_mut()?;
        let result = hook(context);
        Some(self.record("stop_condition", result).unwrap_or(true))
    }
}

fn evaluate_with(
    hook: &EvaluateFn,
    control: &RunControl,
    expected: usize,
    chromosome: &Chromosome,
) -> Option<Vec<f64>> {
    if control.is_failed() {
        return None;
    }
    match hook(chromosome) {
        Ok(values) if values.len() == expected => Some(values),
        Ok(values) => {
            control.fail(EngineError::Contract(ContractViolation::EvaluationArity {
                expected,
                actual: values.len(),
            }));
            None
        }
        Err(source) => {
            control.fail(EngineError::callback("evaluate", source));
            None
        }
    }
}
