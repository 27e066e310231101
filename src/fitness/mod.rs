//! Fitness computation
//!
//! This module provides the individual ordering and the evaluation to
//! fitness transforms used by selection.

pub mod compare;
pub mod transform;

pub mod prelude {
    pub use super::compare::*;
    pub use super::transform::*;
}
