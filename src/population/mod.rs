//! Population management
//!
//! This module provides the Individual type and the double-buffered populations.

pub mod individual;
#[allow(clippy::module_inception)]
pub mod population;

pub mod prelude {
    pub use super::individual::*;
    pub use super::population::*;
}
