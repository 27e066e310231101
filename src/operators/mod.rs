//! Genetic operators
//!
//! This module provides the built-in initialization, crossover, mutation,
//! distance and selection operators, the user hook record, and the
//! [`set::OperatorSet`] that dispatches between them.

pub mod callbacks;
pub mod crossover;
pub mod distance;
pub mod duplicate;
pub mod init;
pub mod mutation;
pub mod selection;
pub mod set;

pub mod prelude {
    pub use super::callbacks::*;
    pub use super::crossover::Crossover;
    pub use super::distance::*;
    pub use super::duplicate::DuplicateIndex;
    pub use super::init::Initializer;
    pub use super::mutation::Mutator;
    pub use super::selection::SelectionEngine;
    pub use super::set::OperatorSet;
}
