//! Population buffers
//!
//! A run owns exactly two populations of `pop_size` slots, "old" and "new".
//! Selection and replacement read from one and write into the other, and the
//! two are swapped, never merged, at the end of every generation. Each
//! population also carries two scratch slots outside the addressable range.

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::ContractViolation;
use crate::genome::chromosome::GeneType;
use crate::population::individual::Individual;

/// Which of the two live populations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PopId {
    Old,
    New,
}

/// Address of a slot inside one population
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Addressable member `0..pop_size`
    Member(usize),
    /// First scratch slot
    Temp1,
    /// Second scratch slot
    Temp2,
}

impl From<usize> for Slot {
    fn from(index: usize) -> Self {
        Self::Member(index)
    }
}

/// A fixed-size population
#[derive(Clone, Debug)]
pub struct Population {
    /// The addressable individuals
    individuals: Vec<Individual>,
    /// Scratch slots, never part of replacement
    temp: [Individual; 2],
}

impl Population {
    /// Create a population of blank individuals
    pub fn new(size: usize, gene_type: GeneType, length: usize, num_evaluations: usize) -> Self {
        let blank = Individual::blank(gene_type, length, num_evaluations);
        Self {
            individuals: vec![blank.clone(); size],
            temp: [blank.clone(), blank],
        }
    }

    /// Create a population from existing individuals
    pub fn from_individuals(individuals: Vec<Individual>) -> Self {
        let scratch = individuals
            .first()
            .cloned()
            .unwrap_or_else(|| Individual::blank(GeneType::Binary, 0, 1));
        Self {
            individuals,
            temp: [scratch.clone(), scratch],
        }
    }

    /// Get the population size
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Get a member, rejecting out-of-range indices
    pub fn get(&self, index: usize) -> Result<&Individual, ContractViolation> {
        let size = self.len();
        self.individuals
            .get(index)
            .ok_or(ContractViolation::IndividualIndex { index, size })
    }

    /// Get a mutable member, rejecting out-of-range indices
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Individual, ContractViolation> {
        let size = self.len();
        self.individuals
            .get_mut(index)
            .ok_or(ContractViolation::IndividualIndex { index, size })
    }

    /// Get any slot, including the scratch slots
    pub fn slot(&self, slot: Slot) -> Result<&Individual, ContractViolation> {
        match slot {
            Slot::Member(index) => self.get(index),
            Slot::Temp1 => Ok(&self.temp[0]),
            Slot::Temp2 => Ok(&self.temp[1]),
        }
    }

    /// Get any slot mutably, including the scratch slots
    pub fn slot_mut(&mut self, slot: Slot) -> Result<&mut Individual, ContractViolation> {
        match slot {
            Slot::Member(index) => self.get_mut(index),
            Slot::Temp1 => Ok(&mut self.temp[0]),
            Slot::Temp2 => Ok(&mut self.temp[1]),
        }
    }

    /// Both scratch slots at once
    pub fn temps_mut(&mut self) -> (&mut Individual, &mut Individual) {
        let [a, b] = &mut self.temp;
        (a, b)
    }

    /// Slots `index` and `index + 1` for a pair of children
    ///
    /// When `index + 1` is not below `limit` the second child goes to the
    /// first scratch slot and is discarded by the caller.
    pub fn pair_mut(
        &mut self,
        index: usize,
        limit: usize,
    ) -> Result<(&mut Individual, &mut Individual), ContractViolation> {
        let size = self.individuals.len();
        if index >= size {
            return Err(ContractViolation::IndividualIndex { index, size });
        }
        if index + 1 < limit.min(size) {
            let (head, tail) = self.individuals.split_at_mut(index + 1);
            Ok((&mut head[index], &mut tail[0]))
        } else {
            Ok((&mut self.individuals[index], &mut self.temp[0]))
        }
    }

    /// Get an iterator over the members
    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Get a mutable iterator over the members
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Individual> {
        self.individuals.iter_mut()
    }

    /// Members as a slice
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Members as a mutable slice; the size cannot change
    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Replace every member at once; the size must not change
    pub fn install(&mut self, individuals: Vec<Individual>) {
        debug_assert_eq!(individuals.len(), self.individuals.len());
        self.individuals = individuals;
    }

    /// Primary evaluations of all members
    pub fn evaluations(&self) -> Vec<f64> {
        self.individuals.iter().map(Individual::evaluation).collect()
    }

    /// Fitness values of all members
    pub fn fitness_values(&self) -> Vec<f64> {
        self.individuals.iter().map(Individual::fitness).collect()
    }

    /// Indices among the first `limit` members that need evaluation
    pub fn pending(&self, limit: usize) -> Vec<usize> {
        self.individuals
            .iter()
            .take(limit)
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply `f` to every pending member among the first `limit`
    pub fn map_pending<R, F>(&self, limit: usize, f: F) -> Vec<(usize, R)>
    where
        F: Fn(&Individual) -> R,
    {
        self.pending(limit)
            .into_iter()
            .map(|i| (i, f(&self.individuals[i])))
            .collect()
    }

    /// Apply `f` to every pending member among the first `limit` in parallel
    ///
    /// Returning from this call is the barrier: every shard has finished.
    #[cfg(feature = "parallel")]
    pub fn par_map_pending<R, F>(&self, limit: usize, f: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(&Individual) -> R + Sync,
    {
        self.pending(limit)
            .into_par_iter()
            .map(|i| (i, f(&self.individuals[i])))
            .collect()
    }
}

/// The old/new pair of population buffers
#[derive(Clone, Debug)]
pub struct Generations {
    buffers: [Population; 2],
    old: usize,
}

impl Generations {
    /// Create both buffers with blank individuals
    pub fn new(size: usize, gene_type: GeneType, length: usize, num_evaluations: usize) -> Self {
        let pop = Population::new(size, gene_type, length, num_evaluations);
        Self {
            buffers: [pop.clone(), pop],
            old: 0,
        }
    }

    /// Get one population
    pub fn get(&self, pop: PopId) -> &Population {
        match pop {
            PopId::Old => &self.buffers[self.old],
            PopId::New => &self.buffers[1 - self.old],
        }
    }

    /// Get one population mutably
    pub fn get_mut(&mut self, pop: PopId) -> &mut Population {
        match pop {
            PopId::Old => &mut self.buffers[self.old],
            PopId::New => &mut self.buffers[1 - self.old],
        }
    }

    /// The old population
    pub fn old(&self) -> &Population {
        self.get(PopId::Old)
    }

    /// The new population
    pub fn new_pop(&self) -> &Population {
        self.get(PopId::New)
    }

    /// Read the old population while writing the new one
    pub fn split_mut(&mut self) -> (&Population, &mut Population) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.old == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// The new population becomes the old one
    pub fn swap(&mut self) {
        self.old = 1 - self.old;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::chromosome::{Allele, Chromosome};

    #[test]
    fn test_population_new() {
        let pop = Population::new(10, GeneType::Real, 4, 2);
        assert_eq!(pop.len(), 10);
        assert!(pop.iter().all(|i| !i.is_evaluated()));
        assert!(pop.iter().all(|i| i.evaluations().len() == 2));
    }

    #[test]
    fn test_get_out_of_range() {
        let pop = Population::new(4, GeneType::Integer, 3, 1);
        assert!(pop.get(3).is_ok());
        assert_eq!(
            pop.get(4).unwrap_err(),
            ContractViolation::IndividualIndex { index: 4, size: 4 }
        );
    }

    #[test]
    fn test_temp_slots_are_outside_members() {
        let mut pop = Population::new(2, GeneType::Integer, 3, 1);
        pop.slot_mut(Slot::Temp1)
            .unwrap()
            .chromosome_mut()
            .set(0, Allele::Integer(9))
            .unwrap();
        assert!(pop
            .iter()
            .all(|i| i.chromosome().get(0).unwrap() == Allele::Integer(0)));
        assert_eq!(
            pop.slot(Slot::Temp1).unwrap().chromosome().get(0).unwrap(),
            Allele::Integer(9)
        );
        assert_eq!(pop.individuals().len(), 2);
    }

    #[test]
    fn test_pending() {
        let mut pop = Population::new(4, GeneType::Real, 2, 1);
        pop.get_mut(1).unwrap().set_evaluations(vec![1.0]).unwrap();
        assert_eq!(pop.pending(4), vec![0, 2, 3]);
        assert_eq!(pop.pending(2), vec![0]);

        let results = pop.map_pending(4, |ind| ind.chromosome().len());
        assert_eq!(results, vec![(0, 2), (2, 2), (3, 2)]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_par_map_pending_matches_serial() {
        let pop = Population::new(16, GeneType::Real, 2, 1);
        let serial = pop.map_pending(16, |ind| ind.chromosome().len() * 2);
        let parallel = pop.par_map_pending(16, |ind| ind.chromosome().len() * 2);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_generations_swap() {
        let mut gens = Generations::new(2, GeneType::Integer, 2, 1);
        {
            let (_old, new) = gens.split_mut();
            new.get_mut(0)
                .unwrap()
                .chromosome_mut()
                .set(0, Allele::Integer(5))
                .unwrap();
        }
        assert_eq!(
            gens.get(PopId::New).get(0).unwrap().chromosome(),
            &Chromosome::Integer(vec![5, 0])
        );
        gens.swap();
        assert_eq!(
            gens.old().get(0).unwrap().chromosome(),
            &Chromosome::Integer(vec![5, 0])
        );
        assert_eq!(
            gens.new_pop().get(0).unwrap().chromosome(),
            &Chromosome::Integer(vec![0, 0])
        );
    }

    #[test]
    fn test_pair_mut() {
        let mut pop = Population::new(4, GeneType::Integer, 2, 1);
        {
            let (a, b) = pop.pair_mut(2, 4).unwrap();
            a.chromosome_mut().set(0, Allele::Integer(1)).unwrap();
            b.chromosome_mut().set(0, Allele::Integer(2)).unwrap();
        }
        assert_eq!(pop.get(3).unwrap().chromosome(), &Chromosome::Integer(vec![2, 0]));

        // An odd limit sends the second child to scratch
        {
            let (_, b) = pop.pair_mut(2, 3).unwrap();
            b.chromosome_mut().set(0, Allele::Integer(9)).unwrap();
        }
        assert_eq!(pop.get(3).unwrap().chromosome(), &Chromosome::Integer(vec![2, 0]));
        assert_eq!(
            pop.slot(Slot::Temp1).unwrap().chromosome(),
            &Chromosome::Integer(vec![9, 0])
        );
        assert!(pop.pair_mut(4, 4).is_err());
    }
}
