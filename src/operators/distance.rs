//! Default gene distance
//!
//! Normalized Hamming distance for binary and character strings, normalized
//! Euclidean distance for integer and real strings, equality for opaque values.
//! Both normalizations divide by the string length, so distances do not grow
//! with the number of alleles.

use crate::genome::chromosome::Chromosome;

/// Fraction of positions at which two strings differ
pub fn hamming<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 0.0;
    }
    let differing = a.iter().zip(b).filter(|(x, y)| x != y).count() + a.len().abs_diff(b.len());
    differing as f64 / len as f64
}

/// Euclidean distance between two numeric strings divided by `sqrt(len)`
///
/// This is the root mean square of the per-allele differences.
pub fn euclidean<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, len) = pairs
        .into_iter()
        .fold((0.0, 0usize), |(sum, len), (x, y)| (sum + (x - y) * (x - y), len + 1));
    if len == 0 {
        return 0.0;
    }
    (sum / len as f64).sqrt()
}

/// Library default distance between two chromosomes
///
/// Chromosomes of different gene types are at distance `f64::INFINITY`.
pub fn default_distance(a: &Chromosome, b: &Chromosome) -> f64 {
    match (a, b) {
        (Chromosome::Binary(x), Chromosome::Binary(y)) => hamming(x, y),
        (Chromosome::Character(x), Chromosome::Character(y)) => hamming(x, y),
        (Chromosome::Integer(x), Chromosome::Integer(y)) => {
            euclidean(x.iter().zip(y).map(|(&p, &q)| (p as f64, q as f64)))
        }
        (Chromosome::Real(x), Chromosome::Real(y)) => {
            euclidean(x.iter().copied().zip(y.iter().copied()))
        }
        (Chromosome::Opaque(_), Chromosome::Opaque(_)) => {
            if a == b {
                0.0
            } else {
                1.0
            }
        }
        _ => f64::INFINITY,
    }
}
