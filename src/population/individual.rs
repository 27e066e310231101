//! Individual type
//!
//! An individual is one population slot: a chromosome together with its
//! evaluations, derived fitness and bookkeeping flags.

use crate::error::ContractViolation;
use crate::genome::chromosome::{Chromosome, GeneType};

/// One member of a population
#[derive(Clone, Debug)]
pub struct Individual {
    /// The allele string
    chromosome: Chromosome,
    /// Primary evaluation followed by the auxiliary evaluations
    evaluations: Vec<f64>,
    /// Fitness derived from the evaluations by the fitness transform
    fitness: f64,
    /// Whether `evaluations` reflects the current chromosome
    up_to_date: bool,
    /// Generation in which this individual was produced
    pub birth_generation: usize,
    /// Non-dominated front (0 = best) from the last multi-objective replacement
    pub(crate) front: usize,
    /// Crowding distance from the last multi-objective replacement
    pub(crate) crowding: f64,
}

impl Individual {
    /// Create an unevaluated individual expecting `num_evaluations` values
    pub fn new(chromosome: Chromosome, num_evaluations: usize) -> Self {
        Self {
            chromosome,
            evaluations: vec![0.0; num_evaluations.max(1)],
            fitness: 0.0,
            up_to_date: false,
            birth_generation: 0,
            front: usize::MAX,
            crowding: 0.0,
        }
    }

    /// Create a zeroed individual for a gene type
    pub fn blank(gene_type: GeneType, length: usize, num_evaluations: usize) -> Self {
        Self::new(Chromosome::new(gene_type, length), num_evaluations)
    }

    /// Get a reference to the chromosome
    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    /// Get a mutable reference to the chromosome
    ///
    /// Does not touch the up-to-date flag; operators call [`Individual::invalidate`].
    pub fn chromosome_mut(&mut self) -> &mut Chromosome {
        &mut self.chromosome
    }

    /// Check if this individual has current evaluations
    pub fn is_evaluated(&self) -> bool {
        self.up_to_date
    }

    /// Mark the evaluations stale
    pub fn invalidate(&mut self) {
        self.up_to_date = false;
    }

    /// Set the up-to-date flag directly
    pub fn set_up_to_date(&mut self, up_to_date: bool) {
        self.up_to_date = up_to_date;
    }

    /// Primary evaluation
    pub fn evaluation(&self) -> f64 {
        self.evaluations[0]
    }

    /// All evaluations, primary first
    pub fn evaluations(&self) -> &[f64] {
        &self.evaluations
    }

    /// Auxiliary evaluations (objectives and constraints)
    pub fn aux_evaluations(&self) -> &[f64] {
        &self.evaluations[1..]
    }

    /// Store a full evaluation tuple and mark the individual up to date
    pub fn set_evaluations(&mut self, values: Vec<f64>) -> Result<(), ContractViolation> {
        if values.len() != self.evaluations.len() {
            return Err(ContractViolation::EvaluationArity {
                expected: self.evaluations.len(),
                actual: values.len(),
            });
        }
        self.evaluations = values;
        self.up_to_date = true;
        Ok(())
    }

    /// Current fitness value
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Set the fitness value
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Objective values: everything except the trailing constraints
    pub fn objectives(&self, num_constraint: usize) -> &[f64] {
        let end = self.evaluations.len().saturating_sub(num_constraint).max(1);
        &self.evaluations[..end]
    }

    /// Constraint values: the trailing `num_constraint` evaluations
    pub fn constraints(&self, num_constraint: usize) -> &[f64] {
        let start = self.evaluations.len().saturating_sub(num_constraint).max(1);
        &self.evaluations[start..]
    }

    /// Total constraint violation (sum of the positive constraint values)
    pub fn constraint_violation(&self, num_constraint: usize) -> f64 {
        self.constraints(num_constraint)
            .iter()
            .filter(|&&c| c > 0.0)
            .sum()
    }

    /// Non-dominated front from the last multi-objective replacement
    pub fn front(&self) -> Option<usize> {
        (self.front != usize::MAX).then_some(self.front)
    }

    /// Crowding distance from the last multi-objective replacement
    pub fn crowding_distance(&self) -> f64 {
        self.crowding
    }

    /// Age of this individual (generations since birth)
    pub fn age(&self, current_generation: usize) -> usize {
        current_generation.saturating_sub(self.birth_generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_individual_new() {
        let individual = Individual::blank(GeneType::Real, 3, 1);
        assert!(!individual.is_evaluated());
        assert_eq!(individual.birth_generation, 0);
        assert_eq!(individual.evaluations().len(), 1);
        assert_eq!(individual.front(), None);
    }

    #[test]
    fn test_set_evaluations() {
        let mut individual = Individual::blank(GeneType::Real, 3, 3);
        individual.set_evaluations(vec![1.0, 2.0, 3.0]).unwrap();
        assert!(individual.is_evaluated());
        assert_eq!(individual.evaluation(), 1.0);
        assert_eq!(individual.aux_evaluations(), &[2.0, 3.0]);

        individual.invalidate();
        assert!(!individual.is_evaluated());
    }

    #[test]
    fn test_set_evaluations_arity() {
        let mut individual = Individual::blank(GeneType::Integer, 3, 3);
        let err = individual.set_evaluations(vec![2.0]).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::EvaluationArity {
                expected: 3,
                actual: 1
            }
        );
        assert!(individual.set_evaluations(vec![1.0, 2.0, 3.0, 4.0]).is_err());
        assert!(!individual.is_evaluated());
    }

    #[test]
    fn test_objectives_and_constraints() {
        let mut individual = Individual::blank(GeneType::Real, 2, 4);
        individual
            .set_evaluations(vec![1.0, 2.0, 0.5, -1.0])
            .unwrap();
        assert_eq!(individual.objectives(2), &[1.0, 2.0]);
        assert_eq!(individual.constraints(2), &[0.5, -1.0]);
        assert_eq!(individual.constraint_violation(2), 0.5);
        assert_eq!(individual.constraint_violation(0), 0.0);
    }

    #[test]
    fn test_individual_age() {
        let mut individual = Individual::blank(GeneType::Binary, 4, 1);
        individual.birth_generation = 10;
        assert_eq!(individual.age(10), 0);
        assert_eq!(individual.age(15), 5);
        assert_eq!(individual.age(5), 0);
    }
}
