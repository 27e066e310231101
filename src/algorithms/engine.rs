//! The generational engine
//!
//! [`GaEngine`] owns the two population buffers, one instance of every
//! operator, the run's random source and its [`RunControl`]. Each generation
//! selects parents from the old population, writes offspring into the new
//! one, evaluates them, lets the replacement policy complete the new
//! population and swaps the buffers.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::algorithms::nsga2;
use crate::algorithms::replacement::ReplacementEngine;
use crate::config::{
    CrossoverType, Direction, EngineConfig, FitnessType, MixingPolicy, MutationType,
    ReplacementType, SelectType, StopRule,
};
use crate::diagnostics::{EvolutionStats, GenerationStats, RunSummary, TimingStats};
use crate::error::{CallbackResult, ContractViolation, EngineError, GaResult};
use crate::fitness::compare::Comparator;
use crate::fitness::transform::FitnessTransform;
use crate::genome::bounds::Bounds;
use crate::genome::chromosome::{Allele, Chromosome, GeneType};
use crate::genome::encoding;
use crate::operators::callbacks::UserCallbacks;
use crate::operators::duplicate::DuplicateIndex;
use crate::operators::selection::SelectionEngine;
use crate::operators::set::OperatorSet;
use crate::population::individual::Individual;
use crate::population::population::{Generations, PopId, Population};
use crate::random::{RandomSource, StdRandom};
use crate::registry::{Registration, RunControl, RunId};
use crate::termination::{EvolutionState, StopContext, StoppingPolicy, USER_STOP_REASON};

/// Upper bound on repeated mutation of a child that must change
const MAX_MUTATION_ATTEMPTS: usize = 100;

/// Builder for [`GaEngine`]
pub struct GaEngineBuilder {
    config: EngineConfig,
    callbacks: UserCallbacks,
    rng: Option<Box<dyn RandomSource + Send>>,
}

impl GaEngineBuilder {
    /// Start from the library defaults for a gene type and string length
    pub fn new(gene_type: GeneType, string_length: usize) -> Self {
        Self {
            config: EngineConfig::new(gene_type, string_length),
            callbacks: UserCallbacks::new(),
            rng: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the population size
    pub fn population_size(mut self, size: usize) -> Self {
        self.config.pop_size = size;
        self
    }

    /// Set the iteration limit of the `MaxIter` stopping rule
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.max_ga_iter = iterations;
        self
    }

    /// Set the optimization direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.config.direction = direction;
        self
    }

    /// Set the number of auxiliary evaluations
    pub fn num_aux_eval(mut self, count: usize) -> Self {
        self.config.num_aux_eval = count;
        self
    }

    /// Set how many of the auxiliary evaluations are constraints
    pub fn num_constraint(mut self, count: usize) -> Self {
        self.config.num_constraint = count;
        self
    }

    /// Set the number of offspring per generation
    pub fn num_replace(mut self, count: usize) -> Self {
        self.config.num_replace = Some(count);
        self
    }

    /// Set the crossover operator
    pub fn crossover(mut self, crossover: CrossoverType) -> Self {
        self.config.crossover_type = crossover;
        self
    }

    /// Set the crossover probability
    pub fn crossover_probability(mut self, probability: f64) -> Self {
        self.config.crossover_prob = probability;
        self
    }

    /// Set the mutation operator
    pub fn mutation(mut self, mutation: MutationType) -> Self {
        self.config.mutation_type = Some(mutation);
        self
    }

    /// Set the per-allele mutation probability
    pub fn mutation_probability(mut self, probability: f64) -> Self {
        self.config.mutation_prob = Some(probability);
        self
    }

    /// Set how crossover and mutation are combined
    pub fn mixing(mut self, mixing: MixingPolicy) -> Self {
        self.config.mixing = mixing;
        self
    }

    /// Set the selection scheme
    pub fn selection(mut self, select_type: SelectType) -> Self {
        self.config.select_type = select_type;
        self
    }

    /// Shuffle the parents drawn each generation
    pub fn randomize_select(mut self, randomize: bool) -> Self {
        self.config.randomize_select = randomize;
        self
    }

    /// Set the replacement policy
    pub fn replacement(mut self, replacement: ReplacementType) -> Self {
        self.config.replacement = replacement;
        self
    }

    /// Set the fitness transform
    pub fn fitness_type(mut self, fitness_type: FitnessType) -> Self {
        self.config.fitness_type = fitness_type;
        self
    }

    /// Set the built-in stopping rules
    pub fn stopping_rules(mut self, rules: Vec<StopRule>) -> Self {
        self.config.stopping_rules = rules;
        self
    }

    /// Reject duplicate offspring
    pub fn no_duplicates(mut self, enabled: bool) -> Self {
        self.config.no_duplicates = enabled;
        self
    }

    /// Set per-allele initialization ranges
    pub fn init_range(mut self, range: Vec<Bounds>) -> Self {
        self.config.init_range = Some(range);
        self
    }

    /// Set the NSGA-III reference points
    pub fn reference_points(mut self, points: Vec<Vec<f64>>) -> Self {
        self.config.reference_points = Some(points);
        self
    }

    /// Seed the default random source
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    /// Evaluate offspring in parallel
    pub fn parallel_evaluation(mut self, enabled: bool) -> Self {
        self.config.parallel_evaluation = enabled;
        self
    }

    /// Install a complete set of user hooks
    pub fn callbacks(mut self, callbacks: UserCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Set the evaluation hook
    pub fn evaluate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome) -> CallbackResult<Vec<f64>> + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_evaluate(f);
        self
    }

    /// Set a single infallible objective as the evaluation hook
    pub fn objective<F>(mut self, f: F) -> Self
    where
        F: Fn(&Chromosome) -> f64 + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_objective(f);
        self
    }

    /// Use a custom random source
    pub fn rng<R: RandomSource + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Validate the setup and build the engine
    pub fn build(self) -> GaResult<GaEngine> {
        let config = self.config;
        config.validate()?;

        let control = Arc::new(RunControl::new());
        let operators = OperatorSet::new(&config, self.callbacks, Arc::clone(&control))?;
        let replacement = ReplacementEngine::from_config(&config)?;
        let rng: Box<dyn RandomSource + Send> = match self.rng {
            Some(rng) => rng,
            None => Box::new(config.random_seed.map_or_else(StdRandom::from_entropy, StdRandom::new)),
        };
        let registration = Registration::new(&control);

        debug!(
            run = %registration.id(),
            gene_type = %config.gene_type,
            string_length = config.string_length,
            pop_size = config.pop_size,
            num_replace = config.num_replace(),
            seed = rng.seed(),
            "engine set up"
        );

        Ok(GaEngine {
            generations: Generations::new(
                config.pop_size,
                config.gene_type,
                config.effective_length(),
                config.num_evaluations(),
            ),
            selection: SelectionEngine::from_config(&config),
            comparator: Comparator::from_config(&config),
            fitness: FitnessTransform::from_config(&config),
            stopping: StoppingPolicy::from_config(&config),
            operators,
            replacement,
            rng,
            control,
            registration,
            iteration: 0,
            evaluations: 0,
            no_change_count: 0,
            best_evaluation: None,
            initialized: false,
            stats: EvolutionStats::new(),
            config,
        })
    }
}

/// Callback-driven generational GA engine
pub struct GaEngine {
    config: EngineConfig,
    generations: Generations,
    operators: OperatorSet,
    selection: SelectionEngine,
    replacement: ReplacementEngine,
    comparator: Comparator,
    fitness: FitnessTransform,
    stopping: StoppingPolicy,
    rng: Box<dyn RandomSource + Send>,
    control: Arc<RunControl>,
    registration: Registration,
    iteration: usize,
    evaluations: usize,
    no_change_count: usize,
    best_evaluation: Option<f64>,
    initialized: bool,
    stats: EvolutionStats,
}

impl GaEngine {
    /// Create a builder
    pub fn builder(gene_type: GeneType, string_length: usize) -> GaEngineBuilder {
        GaEngineBuilder::new(gene_type, string_length)
    }

    /// Fill the old population with the initialization operator
    ///
    /// Every individual is left unevaluated; evaluation happens when the run
    /// starts. [`GaEngine::run`] calls this on its first invocation.
    pub fn initialize(&mut self) {
        debug!(run = %self.run_id(), "initializing population");
        for individual in self.generations.get_mut(PopId::Old).iter_mut() {
            self.operators.initialize(individual, self.rng.as_mut());
            individual.birth_generation = 0;
        }
        self.initialized = true;
    }

    /// Run generations until a stopping rule fires or the run fails
    ///
    /// A failure recorded by any operator, including cancellation, is
    /// returned once the loop has unwound. Otherwise the best individual is
    /// available through [`GaEngine::best_index`].
    pub fn run(&mut self) -> GaResult<RunSummary> {
        let start = Instant::now();
        if self.control.is_failed() {
            return Err(self.control.take_failure().unwrap_or(EngineError::Cancelled));
        }
        info!(run = %self.run_id(), "starting run");

        if !self.initialized {
            self.initialize();
        }
        self.prepare_old();

        let mut stop_reason = None;
        while !self.control.is_failed() {
            if let Some(reason) = self.check_stop() {
                stop_reason = Some(reason);
                break;
            }
            self.generation()?;
        }

        if let Some(error) = self.control.take_failure() {
            return Err(error);
        }

        let reason = stop_reason.unwrap_or_else(|| USER_STOP_REASON.to_string());
        self.stats.set_termination_reason(&reason);
        self.stats.set_runtime(start.elapsed());

        let best_index = self.best_index(PopId::Old);
        let best_evaluations = self.generations.old().individuals()[best_index]
            .evaluations()
            .to_vec();
        info!(
            run = %self.run_id(),
            iterations = self.iteration,
            evaluations = self.evaluations,
            best = best_evaluations.first().copied().unwrap_or(f64::NAN),
            reason = %reason,
            "run finished"
        );

        Ok(RunSummary {
            iterations: self.iteration,
            evaluations: self.evaluations,
            best_index,
            best_evaluations,
            stop_reason: reason,
            stats: self.stats.clone(),
        })
    }

    /// Evaluate whatever is pending in the old population and refresh fitness
    fn prepare_old(&mut self) {
        let pop_size = self.config.pop_size;
        let parallel = self.config.parallel_evaluation;
        let old = self.generations.get_mut(PopId::Old);
        if !old.pending(pop_size).is_empty() {
            self.operators.pre_evaluate(PopId::Old, old);
            self.evaluations += self.operators.evaluate_population(old, pop_size, parallel);
        }
        if self.control.is_failed() {
            return;
        }
        self.refresh_fitness();
        if self.best_evaluation.is_none() {
            self.track_best();
            let stats = GenerationStats::from_population(
                self.generations.old(),
                &self.comparator,
                self.iteration,
                self.evaluations,
            );
            self.stats.record(stats);
        }
    }

    fn refresh_fitness(&mut self) {
        let old = self.generations.get_mut(PopId::Old);
        if self.comparator.multi_objective {
            nsga2::assign_ranks(old.individuals_mut(), self.replacement.objectives());
        }
        self.fitness.apply(old);
    }

    fn track_best(&mut self) {
        let old = self.generations.old();
        let best = old.individuals()[self.comparator.best_index(old)].evaluation();
        if self.best_evaluation == Some(best) {
            self.no_change_count += 1;
        } else {
            self.no_change_count = 0;
            self.best_evaluation = Some(best);
        }
    }

    /// Percentage of the old population within the similarity tolerance of the best
    fn similarity(&self) -> f64 {
        let old = self.generations.old();
        if old.is_empty() {
            return 0.0;
        }
        let best = old.individuals()[self.comparator.best_index(old)].chromosome();
        let similar = old
            .iter()
            .filter(|ind| self.operators.distance(best, ind.chromosome()) <= self.config.similarity_tolerance)
            .count();
        100.0 * similar as f64 / old.len() as f64
    }

    fn check_stop(&mut self) -> Option<String> {
        let similarity = if self.stopping.needs_similarity() {
            self.similarity()
        } else {
            0.0
        };
        let old = self.generations.old();
        let best = self.comparator.best_index(old);
        let state = EvolutionState {
            iteration: self.iteration,
            evaluations: self.evaluations,
            best_evaluation: old.individuals()[best].evaluation(),
            no_change_count: self.no_change_count,
            similarity,
            population: old,
        };
        let builtin = self.stopping.check(&state);
        let context = StopContext {
            state: &state,
            builtin_should_stop: builtin.is_some(),
        };
        match self.operators.stop_condition(&context) {
            Some(true) => Some(builtin.unwrap_or(USER_STOP_REASON).to_string()),
            Some(false) => None,
            None => builtin.map(str::to_string),
        }
    }

    /// Run one generation
    fn generation(&mut self) -> GaResult<()> {
        let generation_start = Instant::now();
        let n = self.replacement.offspring_count();
        let parallel = self.config.parallel_evaluation;
        let birth = self.iteration + 1;

        let variation_start = Instant::now();
        let fitness = self.generations.old().fitness_values();
        self.selection.reset(&fitness, self.rng.as_mut());

        let mut duplicates = if self.config.no_duplicates {
            let mut index = DuplicateIndex::new();
            for ind in self.generations.old().iter() {
                index.insert(self.operators.hash(ind.chromosome()), ind.chromosome().clone());
            }
            Some(index)
        } else {
            None
        };

        let mut mutations = 0;
        let (old, new) = self.generations.split_mut();
        for i in (0..n).step_by(2) {
            let a = self.selection.select_next()?;
            let b = self.selection.select_next()?;
            let (c1, c2) = new.pair_mut(i, n)?;
            mutations += breed(
                &mut self.operators,
                &self.config,
                [old.get(a)?, old.get(b)?],
                [&mut *c1, &mut *c2],
                self.rng.as_mut(),
            );
            c1.birth_generation = birth;
            c2.birth_generation = birth;

            if let Some(index) = duplicates.as_mut() {
                let retries = self.config.max_duplicate_retries;
                mutations += make_unique(&mut self.operators, index, c1, retries, self.rng.as_mut());
                if i + 1 < n {
                    mutations += make_unique(&mut self.operators, index, c2, retries, self.rng.as_mut());
                }
            }
        }
        let variation_time = variation_start.elapsed();

        let evaluation_start = Instant::now();
        let new = self.generations.get_mut(PopId::New);
        self.operators.pre_evaluate(PopId::New, new);
        self.evaluations += self.operators.evaluate_population(new, n, parallel);
        let evaluation_time = evaluation_start.elapsed();
        if self.control.is_failed() {
            return Ok(());
        }

        let replacement_start = Instant::now();
        self.replacement
            .replace(&mut self.generations, &self.operators, self.rng.as_mut())?;
        let replacement_time = replacement_start.elapsed();
        if self.control.is_failed() {
            return Ok(());
        }

        self.generations.swap();
        self.iteration += 1;

        if self.config.restart && self.iteration % self.config.restart_frequency == 0 {
            self.restart();
            if self.control.is_failed() {
                return Ok(());
            }
        }

        self.refresh_fitness();
        self.track_best();

        let timing = TimingStats::new()
            .with_variation(variation_time)
            .with_evaluation(evaluation_time)
            .with_replacement(replacement_time)
            .with_total(generation_start.elapsed());
        let stats = GenerationStats::from_population(
            self.generations.old(),
            &self.comparator,
            self.iteration,
            self.evaluations,
        )
        .with_mutations(mutations)
        .with_timing(timing);

        if self.config.report_frequency > 0 && self.iteration % self.config.report_frequency == 0 {
            info!(
                run = %self.run_id(),
                iteration = self.iteration,
                evaluations = self.evaluations,
                best = stats.best_evaluation,
                mean = stats.mean_evaluation,
                "generation report"
            );
        }
        self.stats.record(stats);

        self.operators
            .end_of_generation(self.iteration, self.generations.old());
        Ok(())
    }

    /// Re-seed the old population with mutated copies of its best individual
    fn restart(&mut self) {
        let pop_size = self.config.pop_size;
        let parallel = self.config.parallel_evaluation;
        let rate = self.config.restart_allele_change_prob;
        let best = self.comparator.best_index(self.generations.old());
        debug!(run = %self.run_id(), iteration = self.iteration, best, "restarting population");

        let old = self.generations.get_mut(PopId::Old);
        let template = old.individuals()[best].clone();
        for (i, ind) in old.iter_mut().enumerate() {
            if i == best {
                continue;
            }
            ind.clone_from(&template);
            if self.operators.mutate_with_rate(ind.chromosome_mut(), rate, self.rng.as_mut()) > 0 {
                ind.invalidate();
            }
        }
        self.operators.pre_evaluate(PopId::Old, old);
        self.evaluations += self.operators.evaluate_population(old, pop_size, parallel);
    }

    /// Identifier under which this run is registered
    pub fn run_id(&self) -> RunId {
        self.registration.id()
    }

    /// The run's control handle, for cancellation
    pub fn control(&self) -> &Arc<RunControl> {
        &self.control
    }

    /// The configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generations completed
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Evaluations performed
    pub fn eval_count(&self) -> usize {
        self.evaluations
    }

    /// Statistics collected so far
    pub fn stats(&self) -> &EvolutionStats {
        &self.stats
    }

    /// One of the two populations
    pub fn population(&self, pop: PopId) -> &Population {
        self.generations.get(pop)
    }

    /// One individual
    pub fn individual(&self, p: usize, pop: PopId) -> Result<&Individual, ContractViolation> {
        self.generations.get(pop).get(p)
    }

    fn individual_mut(&mut self, p: usize, pop: PopId) -> Result<&mut Individual, ContractViolation> {
        self.generations.get_mut(pop).get_mut(p)
    }

    /// Index of the best individual, the lowest index among equals
    pub fn best_index(&self, pop: PopId) -> usize {
        self.comparator.best_index(self.generations.get(pop))
    }

    /// Read one allele
    pub fn get_allele(&self, p: usize, pop: PopId, i: usize) -> Result<Allele, ContractViolation> {
        self.individual(p, pop)?.chromosome().get(i)
    }

    /// Write one allele; the up-to-date flag is left alone
    pub fn set_allele(
        &mut self,
        p: usize,
        pop: PopId,
        i: usize,
        allele: Allele,
    ) -> Result<(), ContractViolation> {
        self.individual_mut(p, pop)?.chromosome_mut().set(i, allele)
    }

    /// Primary evaluation
    pub fn evaluation(&self, p: usize, pop: PopId) -> Result<f64, ContractViolation> {
        Ok(self.individual(p, pop)?.evaluation())
    }

    /// Primary and auxiliary evaluations
    pub fn evaluations(&self, p: usize, pop: PopId) -> Result<&[f64], ContractViolation> {
        Ok(self.individual(p, pop)?.evaluations())
    }

    /// Auxiliary evaluations
    pub fn aux_evaluations(&self, p: usize, pop: PopId) -> Result<&[f64], ContractViolation> {
        Ok(self.individual(p, pop)?.aux_evaluations())
    }

    /// Store evaluations and mark them up to date
    ///
    /// A wrong number of values is reported to the caller and does not
    /// touch the run's error flag.
    pub fn set_evaluation(
        &mut self,
        p: usize,
        pop: PopId,
        values: Vec<f64>,
    ) -> Result<(), ContractViolation> {
        self.individual_mut(p, pop)?.set_evaluations(values)
    }

    /// Set the up-to-date flag of an individual's evaluations
    pub fn set_evaluation_up_to_date(
        &mut self,
        p: usize,
        pop: PopId,
        up_to_date: bool,
    ) -> Result<(), ContractViolation> {
        self.individual_mut(p, pop)?.set_up_to_date(up_to_date);
        Ok(())
    }

    /// Check the up-to-date flag of an individual's evaluations
    pub fn evaluation_up_to_date(&self, p: usize, pop: PopId) -> Result<bool, ContractViolation> {
        Ok(self.individual(p, pop)?.is_evaluated())
    }

    /// Fitness from the last fitness computation
    pub fn fitness(&self, p: usize, pop: PopId) -> Result<f64, ContractViolation> {
        Ok(self.individual(p, pop)?.fitness())
    }

    /// Change the iteration limit between runs
    pub fn set_max_ga_iter(&mut self, iterations: usize) -> Result<(), ContractViolation> {
        if iterations == 0 {
            return Err(ContractViolation::InvalidParameter {
                parameter: "max_ga_iter",
                value: "0".into(),
            });
        }
        self.config.max_ga_iter = iterations;
        self.stopping = StoppingPolicy::from_config(&self.config);
        Ok(())
    }

    /// Change the crossover probability between runs
    pub fn set_crossover_prob(&mut self, probability: f64) -> Result<(), ContractViolation> {
        check_probability("crossover_prob", probability)?;
        self.config.crossover_prob = probability;
        Ok(())
    }

    /// Change the per-allele mutation probability between runs
    pub fn set_mutation_prob(&mut self, probability: f64) -> Result<(), ContractViolation> {
        check_probability("mutation_prob", probability)?;
        self.config.mutation_prob = Some(probability);
        self.operators.set_mutation_rate(probability);
        Ok(())
    }

    fn bits(&self, p: usize, pop: PopId) -> Result<&[bool], ContractViolation> {
        let chromosome = self.individual(p, pop)?.chromosome();
        chromosome.as_binary().ok_or(ContractViolation::AlleleType {
            expected: GeneType::Binary.name(),
            actual: chromosome.gene_type().name(),
        })
    }

    fn bits_mut(&mut self, p: usize, pop: PopId) -> Result<&mut [bool], ContractViolation> {
        let chromosome = self.individual_mut(p, pop)?.chromosome_mut();
        let actual = chromosome.gene_type().name();
        chromosome.as_binary_mut().ok_or(ContractViolation::AlleleType {
            expected: GeneType::Binary.name(),
            actual,
        })
    }

    /// Encode an integer as plain binary into an inclusive bit range
    pub fn encode_int_as_binary(
        &mut self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        value: u64,
    ) -> Result<(), ContractViolation> {
        let (start, end) = bits.into_inner();
        encoding::encode_int_as_binary(self.bits_mut(p, pop)?, start, end, value)
    }

    /// Decode a plain binary integer from an inclusive bit range
    pub fn get_int_from_binary(
        &self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
    ) -> Result<u64, ContractViolation> {
        let (start, end) = bits.into_inner();
        encoding::int_from_binary(self.bits(p, pop)?, start, end)
    }

    /// Encode an integer as Gray code into an inclusive bit range
    pub fn encode_int_as_gray_code(
        &mut self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        value: u64,
    ) -> Result<(), ContractViolation> {
        let (start, end) = bits.into_inner();
        encoding::encode_int_as_gray_code(self.bits_mut(p, pop)?, start, end, value)
    }

    /// Decode a Gray-coded integer from an inclusive bit range
    pub fn get_int_from_gray_code(
        &self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
    ) -> Result<u64, ContractViolation> {
        let (start, end) = bits.into_inner();
        encoding::int_from_gray_code(self.bits(p, pop)?, start, end)
    }

    /// Encode a real from `interval` as plain binary
    pub fn encode_real_as_binary(
        &mut self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        interval: (f64, f64),
        value: f64,
    ) -> Result<(), ContractViolation> {
        let (start, end) = bits.into_inner();
        let (low, high) = interval;
        encoding::encode_real_as_binary(self.bits_mut(p, pop)?, start, end, low, high, value)
    }

    /// Decode a plain binary bit range into `interval`
    pub fn get_real_from_binary(
        &self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        interval: (f64, f64),
    ) -> Result<f64, ContractViolation> {
        let (start, end) = bits.into_inner();
        let (low, high) = interval;
        encoding::real_from_binary(self.bits(p, pop)?, start, end, low, high)
    }

    /// Encode a real from `interval` as Gray code
    pub fn encode_real_as_gray_code(
        &mut self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        interval: (f64, f64),
        value: f64,
    ) -> Result<(), ContractViolation> {
        let (start, end) = bits.into_inner();
        let (low, high) = interval;
        encoding::encode_real_as_gray_code(self.bits_mut(p, pop)?, start, end, low, high, value)
    }

    /// Decode a Gray-coded bit range into `interval`
    pub fn get_real_from_gray_code(
        &self,
        p: usize,
        pop: PopId,
        bits: RangeInclusive<usize>,
        interval: (f64, f64),
    ) -> Result<f64, ContractViolation> {
        let (start, end) = bits.into_inner();
        let (low, high) = interval;
        encoding::real_from_gray_code(self.bits(p, pop)?, start, end, low, high)
    }
}

impl fmt::Debug for GaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaEngine")
            .field("run_id", &self.run_id())
            .field("iteration", &self.iteration)
            .field("evaluations", &self.evaluations)
            .field("config", &self.config)
            .field("capabilities", &self.operators.capabilities())
            .finish()
    }
}

fn check_probability(parameter: &'static str, value: f64) -> Result<(), ContractViolation> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ContractViolation::InvalidParameter {
            parameter,
            value: value.to_string(),
        })
    }
}

/// Produce two children from two parents under the mixing policy
///
/// Children start as copies of their parents, evaluations included, and
/// are only invalidated when crossover ran or mutation changed an allele.
fn breed(
    operators: &mut OperatorSet,
    config: &EngineConfig,
    parents: [&Individual; 2],
    children: [&mut Individual; 2],
    rng: &mut dyn RandomSource,
) -> usize {
    let [p1, p2] = parents;
    let [c1, c2] = children;
    c1.clone_from(p1);
    c2.clone_from(p2);

    let crossed = config.mixing != MixingPolicy::MutationOnly && rng.flip(config.crossover_prob);
    if crossed {
        operators.crossover(
            p1.chromosome(),
            p2.chromosome(),
            c1.chromosome_mut(),
            c2.chromosome_mut(),
            rng,
        );
        c1.invalidate();
        c2.invalidate();
    }

    let mut mutations = 0;
    for child in [c1, c2] {
        let changed = match config.mixing {
            MixingPolicy::Traditional => operators.mutate(child.chromosome_mut(), rng),
            MixingPolicy::MutationOrCrossover if crossed => 0,
            _ => mutate_until_changed(operators, child.chromosome_mut(), rng),
        };
        if changed > 0 {
            child.invalidate();
        }
        mutations += changed;
    }
    mutations
}

/// Mutate until at least one allele changes, within a fixed number of attempts
fn mutate_until_changed(
    operators: &mut OperatorSet,
    chromosome: &mut Chromosome,
    rng: &mut dyn RandomSource,
) -> usize {
    for _ in 0..MAX_MUTATION_ATTEMPTS {
        let changed = operators.mutate(chromosome, rng);
        if changed > 0 || operators.control().is_failed() {
            return changed;
        }
    }
    0
}

/// Mutate a child until it duplicates nothing in the index, then add it
fn make_unique(
    operators: &mut OperatorSet,
    index: &mut DuplicateIndex,
    child: &mut Individual,
    retries: usize,
    rng: &mut dyn RandomSource,
) -> usize {
    let mut mutations = 0;
    for attempt in 0..=retries {
        let hash = operators.hash(child.chromosome());
        let duplicate = index.contains(hash, child.chromosome(), |a, b| operators.is_duplicate(a, b));
        if !duplicate || attempt == retries {
            if duplicate {
                debug!(retries, "accepting duplicate offspring");
            }
            index.insert(hash, child.chromosome().clone());
            break;
        }
        mutations += mutate_until_changed(operators, child.chromosome_mut(), rng);
        child.invalidate();
    }
    mutations
}
