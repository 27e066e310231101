//! Duplicate detection
//!
//! Chromosomes are bucketed by their 64-bit hash, so a lookup only runs the
//! duplicate predicate against chromosomes sharing a bucket.

use std::collections::HashMap;

use crate::genome::chromosome::Chromosome;

/// Hash-bucketed set of chromosomes
#[derive(Clone, Debug, Default)]
pub struct DuplicateIndex {
    buckets: HashMap<u64, Vec<Chromosome>>,
    len: usize,
}

impl DuplicateIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chromosomes in the index
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a chromosome under its hash
    pub fn insert(&mut self, hash: u64, chromosome: Chromosome) {
        self.buckets.entry(hash).or_default().push(chromosome);
        self.len += 1;
    }

    /// Check whether a duplicate of `chromosome` is present
    ///
    /// `is_duplicate` is only consulted for chromosomes with the same hash.
    pub fn contains<F>(&self, hash: u64, chromosome: &Chromosome, mut is_duplicate: F) -> bool
    where
        F: FnMut(&Chromosome, &Chromosome) -> bool,
    {
        self.buckets
            .get(&hash)
            .is_some_and(|bucket| bucket.iter().any(|other| is_duplicate(chromosome, other)))
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}
