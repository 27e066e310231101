//! Chromosome representations
//!
//! This module provides the typed allele strings, allele ranges and the
//! binary/Gray-code codecs.

pub mod bounds;
pub mod chromosome;
pub mod encoding;

pub mod prelude {
    pub use super::bounds::*;
    pub use super::chromosome::*;
    pub use super::encoding::*;
}
