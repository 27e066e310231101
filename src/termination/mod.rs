//! Termination criteria
//!
//! This module provides the built-in stopping predicates and the policy that
//! ORs them together. The engine's error flag is checked by the engine before
//! any of these and always stops the run.

use crate::config::{EngineConfig, StopRule};
use crate::population::population::Population;

/// Run state seen by termination criteria
#[derive(Clone, Debug)]
pub struct EvolutionState<'a> {
    /// Completed generations
    pub iteration: usize,
    /// Evaluations performed so far
    pub evaluations: usize,
    /// Primary evaluation of the current best individual
    pub best_evaluation: f64,
    /// Consecutive generations without a change of the best evaluation
    pub no_change_count: usize,
    /// Percentage of the population within the similarity tolerance of the best
    pub similarity: f64,
    /// The current (old) population
    pub population: &'a Population,
}

/// What a user stop condition gets to see
#[derive(Clone, Debug)]
pub struct StopContext<'a> {
    pub state: &'a EvolutionState<'a>,
    /// Verdict of the built-in criteria, for conditions that augment them
    pub builtin_should_stop: bool,
}

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync {
    /// Check if evolution should terminate
    fn should_terminate(&self, state: &EvolutionState) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Stop after a number of generations
#[derive(Clone, Debug)]
pub struct MaxIterations(pub usize);

impl TerminationCriterion for MaxIterations {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        state.iteration >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum iterations reached"
    }
}

/// Stop when the best evaluation has not changed for a window of generations
#[derive(Clone, Debug)]
pub struct NoChange(pub usize);

impl TerminationCriterion for NoChange {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        state.no_change_count >= self.0
    }

    fn reason(&self) -> &'static str {
        "No change in best evaluation"
    }
}

/// Stop when a percentage of the population is similar to the best
#[derive(Clone, Debug)]
pub struct TooSimilar(pub u32);

impl TerminationCriterion for TooSimilar {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        state.similarity >= f64::from(self.0)
    }

    fn reason(&self) -> &'static str {
        "Population too similar"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }

    /// The first criterion that fires
    pub fn first_met(&self, state: &EvolutionState) -> Option<&'static str> {
        self.criteria
            .iter()
            .find(|c| c.should_terminate(state))
            .map(|c| c.reason())
    }

    /// Check if there are no criteria
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl TerminationCriterion for AnyOf {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        self.criteria.iter().any(|c| c.should_terminate(state))
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// Reason reported when a user stop condition ends the run
pub const USER_STOP_REASON: &str = "User stop condition";

/// The built-in stopping rules of a run
pub struct StoppingPolicy {
    builtin: AnyOf,
    needs_similarity: bool,
}

impl StoppingPolicy {
    /// Create the policy described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut criteria: Vec<Box<dyn TerminationCriterion>> = Vec::new();
        let mut needs_similarity = false;
        for rule in &config.stopping_rules {
            match rule {
                StopRule::MaxIter => criteria.push(Box::new(MaxIterations(config.max_ga_iter))),
                StopRule::NoChange => criteria.push(Box::new(NoChange(config.max_no_change))),
                StopRule::TooSimilar => {
                    needs_similarity = true;
                    criteria.push(Box::new(TooSimilar(config.max_similarity)));
                }
            }
        }
        Self {
            builtin: AnyOf::new(criteria),
            needs_similarity,
        }
    }

    /// Whether the similarity percentage must be computed
    pub fn needs_similarity(&self) -> bool {
        self.needs_similarity
    }

    /// Check if no built-in rule is active
    pub fn is_empty(&self) -> bool {
        self.builtin.is_empty()
    }

    /// Reason of the first built-in rule that fires
    pub fn check(&self, state: &EvolutionState) -> Option<&'static str> {
        self.builtin.first_met(state)
    }
}

pub mod prelude {
    pub use super::{
        AnyOf, EvolutionState, MaxIterations, NoChange, StopContext, StoppingPolicy,
        TerminationCriterion, TooSimilar, USER_STOP_REASON,
    };
}
