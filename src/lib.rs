//! # pgaevo
//!
//! A callback-driven generational genetic algorithm engine.
//!
//! A run is configured once, validated at build time and then driven by
//! [`GaEngine::run`](algorithms::engine::GaEngine::run). Every operator slot
//! (initialization, crossover, mutation, duplicate checking, distance,
//! evaluation, stopping) has a built-in default for the built-in gene types
//! and can be replaced by a user hook.
//!
//! ## Core Concepts
//!
//! - **Two populations**: offspring are written into a "new" buffer while
//!   parents are read from the "old" one, and the two are swapped each
//!   generation
//! - **Lazy evaluation**: an individual is only evaluated when its
//!   chromosome changed since the last evaluation
//! - **Run-wide error flag**: a failing user hook records the error, every
//!   later operator call short-circuits, and `run` returns the error
//! - **Multi-objective replacement**: NSGA-II crowding and NSGA-III
//!   reference-point niching over the same population buffers
//!
//! ## Quick Start
//!
//! ```rust
//! use pgaevo::prelude::*;
//!
//! let mut engine = GaEngine::builder(GeneType::Binary, 32)
//!     .population_size(40)
//!     .max_iterations(50)
//!     .random_seed(42)
//!     .objective(|c| c.as_binary().map_or(0.0, |b| b.iter().filter(|&&x| x).count() as f64))
//!     .build()?;
//!
//! let summary = engine.run()?;
//! assert_eq!(summary.iterations, 50);
//! # Ok::<(), pgaevo::error::EngineError>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;
pub mod random;
pub mod registry;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::{
        CharacterInit, CrossoverType, Direction, EngineConfig, FitnessMinType, FitnessType,
        IntegerInit, MixingPolicy, MutationType, ReplacementType, SelectType, StopRule,
    };
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::random::prelude::*;
    pub use crate::registry::prelude::*;
    pub use crate::termination::prelude::*;
}
