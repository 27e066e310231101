//! The engine and its survivor-selection algorithms
//!
//! [`engine`] drives the generational loop. [`replacement`] completes each
//! new population, delegating to [`nsga2`] and [`nsga3`] for the
//! multi-objective policies, which in turn use [`reference_points`].

pub mod engine;
pub mod nsga2;
pub mod nsga3;
pub mod reference_points;
pub mod replacement;

pub mod prelude {
    pub use super::engine::{GaEngine, GaEngineBuilder};
    pub use super::nsga2::Objectives;
    pub use super::reference_points::{das_dennis, das_dennis_count, das_dennis_scaled};
    pub use super::replacement::ReplacementEngine;
}
