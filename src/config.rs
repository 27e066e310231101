//! Run configuration
//!
//! [`EngineConfig`] carries every run-wide parameter. It is fixed at setup
//! and only changes through the validated setters on the engine between runs.

use serde::{Deserialize, Serialize};

use crate::error::{ContractViolation, SetupError};
use crate::genome::bounds::Bounds;
use crate::genome::chromosome::GeneType;

/// Optimization direction of the primary evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

impl Direction {
    /// True if `a` is strictly better than `b`
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }

    /// Map a value so that larger is always better
    pub fn oriented(self, value: f64) -> f64 {
        match self {
            Self::Maximize => value,
            Self::Minimize => -value,
        }
    }
}

/// How raw evaluations become fitness values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessType {
    #[default]
    Raw,
    Ranking,
    Normal,
}

/// Remap of minimization evaluations for [`FitnessType::Raw`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMinType {
    Reciprocal,
    #[default]
    Cmax,
}

/// Parent selection scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectType {
    Proportional,
    Sus,
    #[default]
    Tournament,
    PTournament,
    Truncation,
    Linear,
}

/// Survivor replacement scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementType {
    #[default]
    Best,
    RandomRep,
    RandomNoRep,
    Rtr,
    PairwiseBest,
    Nsga2,
    Nsga3,
}

impl ReplacementType {
    /// Replacement schemes that rank a combined old+new population
    pub fn is_multi_objective(self) -> bool {
        matches!(self, Self::Nsga2 | Self::Nsga3)
    }

    /// Whether a full population of children is produced every generation
    pub fn replaces_whole_population(self) -> bool {
        matches!(self, Self::PairwiseBest | Self::Nsga2 | Self::Nsga3)
    }
}

/// Built-in crossover operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    OnePoint,
    #[default]
    TwoPoint,
    Uniform,
    Sbx,
    Edge,
}

/// Built-in mutation operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// Add or subtract `mutation_value` (integer)
    Constant,
    /// Redraw from the init range
    Range,
    /// Add a uniform offset in `[-mutation_value, mutation_value)` (real)
    Uniform,
    /// Add Gaussian noise with deviation `mutation_value` (real)
    Gaussian,
    /// Swap two alleles (integer)
    Permute,
    /// Polynomial mutation inside the init range (real)
    Polynomial,
}

/// Whether mutation, crossover or both produce each offspring pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixingPolicy {
    /// Crossover with `crossover_prob`, then mutate every child
    Traditional,
    /// Crossover with `crossover_prob`, otherwise mutate until something changes
    #[default]
    MutationOrCrossover,
    /// Crossover with `crossover_prob`, then mutate; unchanged copies are re-mutated
    MutationAndCrossover,
    /// Never cross over
    MutationOnly,
}

/// Built-in stopping predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    MaxIter,
    NoChange,
    TooSimilar,
}

/// Integer initialization policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerInit {
    /// Uniform in the per-allele range
    #[default]
    Range,
    /// A random permutation of `start..start + string_length`
    Permute { start: i64 },
}

/// Character initialization alphabet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterInit {
    #[default]
    Lower,
    Upper,
    Mixed,
}

impl CharacterInit {
    /// The alphabet drawn from
    pub fn alphabet(self) -> &'static [u8] {
        match self {
            Self::Lower => b"abcdefghijklmnopqrstuvwxyz",
            Self::Upper => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::Mixed => b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
        }
    }
}

/// Every parameter of one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allele type shared by the whole population
    pub gene_type: GeneType,
    /// Number of alleles (ignored for opaque genes)
    pub string_length: usize,
    /// Direction of the primary evaluation and of every objective
    pub direction: Direction,
    /// Auxiliary evaluations after the primary one
    pub num_aux_eval: usize,
    /// Trailing auxiliary evaluations that are constraints (`> 0` violated)
    pub num_constraint: usize,
    /// Population size (even, at least 2)
    pub pop_size: usize,
    /// Individuals replaced per generation; 10% of `pop_size` when unset
    pub num_replace: Option<usize>,
    /// Generation limit for [`StopRule::MaxIter`]
    pub max_ga_iter: usize,
    /// Window for [`StopRule::NoChange`]
    pub max_no_change: usize,
    /// Percentage for [`StopRule::TooSimilar`]
    pub max_similarity: u32,
    /// Distance at or below which an individual counts as similar to the best
    pub similarity_tolerance: f64,
    /// Built-in stopping predicates that are ORed together
    pub stopping_rules: Vec<StopRule>,
    pub crossover_type: CrossoverType,
    pub crossover_prob: f64,
    /// Per-allele swap probability of uniform crossover
    pub uniform_crossover_prob: f64,
    pub crossover_sbx_eta: f64,
    /// Clamp crossover children to the init range
    pub crossover_bounded: bool,
    /// Mutation operator; the gene type's default when unset
    pub mutation_type: Option<MutationType>,
    /// Per-allele mutation rate; `1 / string_length` when unset
    pub mutation_prob: Option<f64>,
    /// Step size of the numeric mutations; 1 for integers and 0.1 for reals when unset
    pub mutation_value: Option<f64>,
    pub mutation_poly_eta: f64,
    /// Clamp mutated alleles to the init range
    pub mutation_bounded: bool,
    pub mixing: MixingPolicy,
    pub fitness_type: FitnessType,
    pub fitness_min_type: FitnessMinType,
    pub fitness_cmax: f64,
    pub max_fitness_rank: f64,
    pub select_type: SelectType,
    /// May be fractional; rounded probabilistically per tournament
    pub tournament_size: f64,
    pub tournament_with_replacement: bool,
    pub p_tournament_prob: f64,
    pub truncation_proportion: f64,
    /// Shuffle the parents drawn each generation
    pub randomize_select: bool,
    pub replacement: ReplacementType,
    pub rtr_window_size: usize,
    /// Regenerate children that duplicate an existing individual
    pub no_duplicates: bool,
    /// Regeneration attempts before a duplicate is accepted
    pub max_duplicate_retries: usize,
    /// Per-allele init range for integer and real genes
    pub init_range: Option<Vec<Bounds>>,
    /// Per-allele `(center, fraction)` init range for real genes
    pub init_percent: Option<Vec<(f64, f64)>>,
    pub integer_init: IntegerInit,
    /// Probability that an initial bit is set
    pub binary_init_prob: f64,
    pub character_init: CharacterInit,
    /// Periodically reseed the population around the best individual
    pub restart: bool,
    pub restart_frequency: usize,
    pub restart_allele_change_prob: f64,
    /// Generations between progress lines; 0 disables them
    pub report_frequency: usize,
    /// Seed of the run's random source; drawn from the OS when unset
    pub random_seed: Option<u64>,
    /// Reference points for NSGA-III, one per row
    pub reference_points: Option<Vec<Vec<f64>>>,
    /// Evaluate pending individuals on the rayon pool
    pub parallel_evaluation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gene_type: GeneType::Binary,
            string_length: 10,
            direction: Direction::Maximize,
            num_aux_eval: 0,
            num_constraint: 0,
            pop_size: 100,
            num_replace: None,
            max_ga_iter: 1000,
            max_no_change: 100,
            max_similarity: 95,
            similarity_tolerance: 0.0,
            stopping_rules: vec![StopRule::MaxIter],
            crossover_type: CrossoverType::TwoPoint,
            crossover_prob: 0.85,
            uniform_crossover_prob: 0.6,
            crossover_sbx_eta: 2.0,
            crossover_bounded: false,
            mutation_type: None,
            mutation_prob: None,
            mutation_value: None,
            mutation_poly_eta: 100.0,
            mutation_bounded: false,
            mixing: MixingPolicy::MutationOrCrossover,
            fitness_type: FitnessType::Raw,
            fitness_min_type: FitnessMinType::Cmax,
            fitness_cmax: 1.01,
            max_fitness_rank: 1.2,
            select_type: SelectType::Tournament,
            tournament_size: 2.0,
            tournament_with_replacement: true,
            p_tournament_prob: 0.6,
            truncation_proportion: 0.5,
            randomize_select: false,
            replacement: ReplacementType::Best,
            rtr_window_size: 5,
            no_duplicates: false,
            max_duplicate_retries: 10,
            init_range: None,
            init_percent: None,
            integer_init: IntegerInit::Range,
            binary_init_prob: 0.5,
            character_init: CharacterInit::Lower,
            restart: false,
            restart_frequency: 50,
            restart_allele_change_prob: 0.5,
            report_frequency: 10,
            random_seed: None,
            reference_points: None,
            parallel_evaluation: cfg!(feature = "parallel"),
        }
    }
}

fn invalid(parameter: &'static str, value: impl ToString) -> ContractViolation {
    ContractViolation::InvalidParameter {
        parameter,
        value: value.to_string(),
    }
}

fn check_probability(parameter: &'static str, p: f64) -> Result<(), ContractViolation> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(invalid(parameter, p))
    }
}

impl EngineConfig {
    /// Default configuration for a gene type and string length
    pub fn new(gene_type: GeneType, string_length: usize) -> Self {
        Self {
            gene_type,
            string_length,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON
    ///
    /// Unknown enum constants and malformed values are reported as
    /// [`ContractViolation::InvalidParameter`].
    pub fn from_json(json: &str) -> Result<Self, ContractViolation> {
        serde_json::from_str(json).map_err(|e| invalid("config", e))
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, ContractViolation> {
        serde_json::to_string_pretty(self).map_err(|e| invalid("config", e))
    }

    /// Length of the evaluation tuple
    pub fn num_evaluations(&self) -> usize {
        1 + self.num_aux_eval
    }

    /// Number of objectives (evaluations that are not constraints)
    pub fn num_objectives(&self) -> usize {
        self.num_evaluations().saturating_sub(self.num_constraint)
    }

    /// Effective alleles per chromosome
    pub fn effective_length(&self) -> usize {
        if self.gene_type == GeneType::Opaque {
            0
        } else {
            self.string_length
        }
    }

    /// Children produced per generation
    pub fn num_replace(&self) -> usize {
        if self.replacement.replaces_whole_population() {
            return self.pop_size;
        }
        self.num_replace
            .unwrap_or_else(|| (self.pop_size / 10).max(1))
            .min(self.pop_size)
    }

    /// Per-allele mutation rate
    pub fn mutation_prob(&self) -> f64 {
        self.mutation_prob
            .unwrap_or_else(|| 1.0 / self.string_length.max(1) as f64)
    }

    /// Step size of the numeric mutations
    pub fn mutation_value(&self) -> f64 {
        self.mutation_value.unwrap_or(match self.gene_type {
            GeneType::Integer => 1.0,
            _ => 0.1,
        })
    }

    /// Mutation operator for the gene type
    pub fn mutation_type(&self) -> Option<MutationType> {
        self.mutation_type.or(match self.gene_type {
            GeneType::Integer => Some(match self.integer_init {
                IntegerInit::Permute { .. } => MutationType::Permute,
                IntegerInit::Range => MutationType::Constant,
            }),
            GeneType::Real => Some(MutationType::Gaussian),
            GeneType::Character => Some(MutationType::Range),
            GeneType::Binary | GeneType::Opaque => None,
        })
    }

    /// Resolved per-allele init range for integer and real genes
    pub fn init_bounds(&self) -> Vec<Bounds> {
        let length = self.effective_length();
        if let Some(range) = &self.init_range {
            return range.clone();
        }
        if let Some(percent) = &self.init_percent {
            return percent
                .iter()
                .map(|&(center, fraction)| Bounds::from_percent(center, fraction))
                .collect();
        }
        match self.gene_type {
            GeneType::Integer => {
                let hi = length.saturating_sub(1) as f64;
                vec![Bounds::new(0.0, hi); length]
            }
            _ => vec![Bounds::new(0.0, 1.0); length],
        }
    }

    /// Check every invariant that does not depend on the user hooks
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.pop_size < 2 || self.pop_size % 2 != 0 {
            return Err(SetupError::PopulationSize(self.pop_size));
        }
        if self.gene_type != GeneType::Opaque && self.string_length < 2 {
            return Err(SetupError::StringLength(self.string_length));
        }
        if self.init_range.is_some() && self.init_percent.is_some() {
            return Err(SetupError::ConflictingInit);
        }
        self.validate_parameters()
            .map_err(|e| SetupError::Configuration(e.to_string()))?;
        self.validate_init()?;
        self.validate_operators()?;
        if self.replacement == ReplacementType::Nsga3 {
            self.validate_reference_points()?;
        }
        Ok(())
    }

    fn validate_parameters(&self) -> Result<(), ContractViolation> {
        check_probability("crossover_prob", self.crossover_prob)?;
        check_probability("uniform_crossover_prob", self.uniform_crossover_prob)?;
        check_probability("p_tournament_prob", self.p_tournament_prob)?;
        check_probability("binary_init_prob", self.binary_init_prob)?;
        check_probability("restart_allele_change_prob", self.restart_allele_change_prob)?;
        if let Some(p) = self.mutation_prob {
            check_probability("mutation_prob", p)?;
        }
        if self.num_constraint > self.num_aux_eval {
            return Err(invalid("num_constraint", self.num_constraint));
        }
        if let Some(n) = self.num_replace {
            if n > self.pop_size {
                return Err(invalid("num_replace", n));
            }
        }
        if self.truncation_proportion.is_nan()
            || self.truncation_proportion <= 0.0
            || self.truncation_proportion > 1.0
        {
            return Err(invalid("truncation_proportion", self.truncation_proportion));
        }
        if !self.tournament_size.is_finite() || self.tournament_size < 1.0 {
            return Err(invalid("tournament_size", self.tournament_size));
        }
        if !(1.0..=2.0).contains(&self.max_fitness_rank) {
            return Err(invalid("max_fitness_rank", self.max_fitness_rank));
        }
        if !self.fitness_cmax.is_finite() || self.fitness_cmax < 1.0 {
            return Err(invalid("fitness_cmax", self.fitness_cmax));
        }
        if self.max_similarity > 100 {
            return Err(invalid("max_similarity", self.max_similarity));
        }
        if self.similarity_tolerance.is_nan() || self.similarity_tolerance < 0.0 {
            return Err(invalid("similarity_tolerance", self.similarity_tolerance));
        }
        if self.crossover_sbx_eta.is_nan() || self.crossover_sbx_eta < 0.0 {
            return Err(invalid("crossover_sbx_eta", self.crossover_sbx_eta));
        }
        if self.mutation_poly_eta.is_nan() || self.mutation_poly_eta < 0.0 {
            return Err(invalid("mutation_poly_eta", self.mutation_poly_eta));
        }
        if let Some(v) = self.mutation_value {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid("mutation_value", v));
            }
        }
        if self.rtr_window_size == 0 {
            return Err(invalid("rtr_window_size", 0));
        }
        if self.restart && self.restart_frequency == 0 {
            return Err(invalid("restart_frequency", 0));
        }
        Ok(())
    }

    fn validate_init(&self) -> Result<(), SetupError> {
        let length = self.effective_length();
        if let Some(range) = &self.init_range {
            if !matches!(self.gene_type, GeneType::Integer | GeneType::Real) {
                return Err(SetupError::Configuration(format!(
                    "init_range is not supported for {} genes",
                    self.gene_type
                )));
            }
            if range.len() != length {
                return Err(SetupError::Configuration(format!(
                    "init_range has {} entries for string length {length}",
                    range.len()
                )));
            }
            if let Some(i) = range.iter().position(|b| !b.is_valid()) {
                return Err(SetupError::Configuration(format!(
                    "init_range entry {i} is not an ordered finite range"
                )));
            }
            if self.gene_type == GeneType::Integer {
                if let Some(i) = range.iter().position(|b| {
                    let (lo, hi) = b.int_range();
                    lo > hi
                }) {
                    return Err(SetupError::Configuration(format!(
                        "init_range entry {i} contains no integer"
                    )));
                }
            }
        }
        if let Some(percent) = &self.init_percent {
            if self.gene_type != GeneType::Real {
                return Err(SetupError::Configuration(
                    "init_percent is only supported for real genes".into(),
                ));
            }
            if percent.len() != length {
                return Err(SetupError::Configuration(format!(
                    "init_percent has {} entries for string length {length}",
                    percent.len()
                )));
            }
        }
        if let IntegerInit::Permute { .. } = self.integer_init {
            if self.gene_type != GeneType::Integer {
                return Err(SetupError::Configuration(
                    "permutation init needs integer genes".into(),
                ));
            }
            if self.init_range.is_some() {
                return Err(SetupError::ConflictingInit);
            }
        }
        Ok(())
    }

    fn validate_operators(&self) -> Result<(), SetupError> {
        let gene_type = self.gene_type;
        match self.crossover_type {
            CrossoverType::Sbx if gene_type != GeneType::Real => {
                return Err(SetupError::Configuration(format!(
                    "SBX crossover needs real genes, not {gene_type}"
                )));
            }
            CrossoverType::Edge if gene_type != GeneType::Integer => {
                return Err(SetupError::Configuration(format!(
                    "edge crossover needs integer genes, not {gene_type}"
                )));
            }
            CrossoverType::Edge if !matches!(self.integer_init, IntegerInit::Permute { .. }) => {
                return Err(SetupError::Configuration(
                    "edge crossover needs permutation init".into(),
                ));
            }
            _ => {}
        }
        let Some(mutation) = self.mutation_type else {
            return Ok(());
        };
        let supported = match gene_type {
            GeneType::Binary | GeneType::Opaque => false,
            GeneType::Integer => matches!(
                mutation,
                MutationType::Constant | MutationType::Range | MutationType::Permute
            ),
            GeneType::Real => matches!(
                mutation,
                MutationType::Range
                    | MutationType::Uniform
                    | MutationType::Gaussian
                    | MutationType::Polynomial
            ),
            GeneType::Character => mutation == MutationType::Range,
        };
        if supported {
            Ok(())
        } else {
            Err(SetupError::Configuration(format!(
                "mutation {mutation:?} is not available for {gene_type} genes"
            )))
        }
    }

    fn validate_reference_points(&self) -> Result<(), SetupError> {
        let points = match &self.reference_points {
            Some(points) if !points.is_empty() => points,
            _ => {
                return Err(SetupError::ReferencePoints(
                    "NSGA-III replacement needs reference points".into(),
                ))
            }
        };
        let dim = self.num_objectives();
        if let Some(i) = points.iter().position(|p| p.len() != dim) {
            return Err(SetupError::ReferencePoints(format!(
                "point {i} has dimension {}, expected {dim}",
                points[i].len()
            )));
        }
        if let Some(i) = points
            .iter()
            .position(|p| p.iter().any(|x| !x.is_finite()))
        {
            return Err(SetupError::ReferencePoints(format!(
                "point {i} has a non-finite coordinate"
            )));
        }
        Ok(())
    }
}
