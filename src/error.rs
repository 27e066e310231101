//! Error types for pgaevo
//!
//! This module defines the error taxonomy used throughout the engine:
//! contract violations reported at the call boundary, setup failures,
//! callback failures that abort a run, and resource exhaustion.

use thiserror::Error;

/// Boxed error returned by user-supplied callbacks
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for user-supplied callbacks
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Caller bugs detected at the call boundary
///
/// These never set the engine error flag when raised by a direct API call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContractViolation {
    /// An evaluation did not have exactly `1 + num_aux_eval` values
    #[error("Evaluation arity mismatch: expected {expected} values, got {actual}")]
    EvaluationArity { expected: usize, actual: usize },

    /// Individual index outside the addressable population
    #[error("Individual index {index} out of range (population size {size})")]
    IndividualIndex { index: usize, size: usize },

    /// Allele index outside the string
    #[error("Allele index {index} out of range (string length {length})")]
    AlleleIndex { index: usize, length: usize },

    /// Allele value of the wrong type for the gene type of the run
    #[error("Allele type mismatch: gene type is {expected}, got {actual}")]
    AlleleType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Bit range for a binary codec is empty, reversed, too wide or out of range
    #[error("Invalid bit range {start}..={end} for string length {length}")]
    BitRange {
        start: usize,
        end: usize,
        length: usize,
    },

    /// Value does not fit into the bit range or the real interval
    #[error("Value {value} cannot be encoded: {reason}")]
    Unencodable { value: String, reason: String },

    /// Invalid policy parameter or enum constant
    #[error("Invalid value for {parameter}: {value}")]
    InvalidParameter { parameter: &'static str, value: String },

    /// Selection was asked for more parents than the population holds
    #[error("Selection called {calls} times in a generation of {pop_size}")]
    SelectionOverrun { calls: usize, pop_size: usize },
}

/// Setup-time invariant violations
///
/// These are always fatal and never deferred to run time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    /// Population size must be even and at least 2
    #[error("Population size must be even and >= 2, got {0}")]
    PopulationSize(usize),

    /// String length must be at least 2
    #[error("String length must be >= 2, got {0}")]
    StringLength(usize),

    /// Both `init_range` and `init_percent` were given
    #[error("init_range and init_percent are mutually exclusive")]
    ConflictingInit,

    /// A required user hook is missing
    #[error("Missing required hook `{hook}`: {reason}")]
    MissingHook {
        hook: &'static str,
        reason: &'static str,
    },

    /// Reference points are required but absent or malformed
    #[error("Invalid reference points: {0}")]
    ReferencePoints(String),

    /// Any other inconsistent configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller bug detected at a call boundary
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Invalid setup
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    /// A user-supplied operator failed during a run
    #[error("Callback `{operator}` failed: {source}")]
    Callback {
        operator: &'static str,
        #[source]
        source: CallbackError,
    },

    /// Allocation of a scratch buffer failed
    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// The run was cancelled through its control handle
    #[error("Run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Wrap a callback failure
    pub fn callback(operator: &'static str, source: CallbackError) -> Self {
        Self::Callback { operator, source }
    }

    /// Returns true if this error was raised by a user callback
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }
}

/// Result type alias for engine operations
pub type GaResult<T> = Result<T, EngineError>;
