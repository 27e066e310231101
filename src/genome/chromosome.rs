//! Typed chromosomes
//!
//! A [`Chromosome`] is the fixed-length allele string of one individual. The
//! allele type is uniform across a run and is one of binary, integer, real,
//! character, or an opaque user value the engine never looks inside.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ContractViolation;

/// The allele type of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneType {
    /// Bit alleles
    Binary,
    /// Signed integer alleles
    Integer,
    /// Floating point alleles
    Real,
    /// Byte-sized character alleles
    Character,
    /// A single user-managed value per individual
    Opaque,
}

impl GeneType {
    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Character => "character",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for GeneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single allele value
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Allele {
    Binary(bool),
    Integer(i64),
    Real(f64),
    Character(u8),
}

impl Allele {
    /// The gene type this allele belongs to
    pub fn gene_type(&self) -> GeneType {
        match self {
            Self::Binary(_) => GeneType::Binary,
            Self::Integer(_) => GeneType::Integer,
            Self::Real(_) => GeneType::Real,
            Self::Character(_) => GeneType::Character,
        }
    }
}

/// User-defined value stored in an opaque chromosome
///
/// The value is owned by its chromosome; copying an individual clones it via
/// [`GeneValue::clone_box`] and dropping the individual drops it.
pub trait GeneValue: fmt::Debug + Send + Sync + 'static {
    /// Clone into a new box
    fn clone_box(&self) -> Box<dyn GeneValue>;

    /// Equality against another user value (false if the types differ)
    fn eq_value(&self, other: &dyn GeneValue) -> bool;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn GeneValue> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Fixed-length allele string
#[derive(Clone, Debug)]
pub enum Chromosome {
    Binary(Vec<bool>),
    Integer(Vec<i64>),
    Real(Vec<f64>),
    Character(Vec<u8>),
    /// `None` until the user initializer installs a value
    Opaque(Option<Box<dyn GeneValue>>),
}

impl Chromosome {
    /// Create a zeroed chromosome of the given type and length
    pub fn new(gene_type: GeneType, length: usize) -> Self {
        match gene_type {
            GeneType::Binary => Self::Binary(vec![false; length]),
            GeneType::Integer => Self::Integer(vec![0; length]),
            GeneType::Real => Self::Real(vec![0.0; length]),
            GeneType::Character => Self::Character(vec![b' '; length]),
            GeneType::Opaque => Self::Opaque(None),
        }
    }

    /// The gene type of this chromosome
    pub fn gene_type(&self) -> GeneType {
        match self {
            Self::Binary(_) => GeneType::Binary,
            Self::Integer(_) => GeneType::Integer,
            Self::Real(_) => GeneType::Real,
            Self::Character(_) => GeneType::Character,
            Self::Opaque(_) => GeneType::Opaque,
        }
    }

    /// Number of alleles (0 for opaque chromosomes)
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Real(v) => v.len(),
            Self::Character(v) => v.len(),
            Self::Opaque(_) => 0,
        }
    }

    /// Check if the chromosome has no alleles
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one allele
    pub fn get(&self, index: usize) -> Result<Allele, ContractViolation> {
        let length = self.len();
        let out_of_range = || ContractViolation::AlleleIndex { index, length };
        match self {
            Self::Binary(v) => v.get(index).map(|&b| Allele::Binary(b)).ok_or_else(out_of_range),
            Self::Integer(v) => v.get(index).map(|&i| Allele::Integer(i)).ok_or_else(out_of_range),
            Self::Real(v) => v.get(index).map(|&r| Allele::Real(r)).ok_or_else(out_of_range),
            Self::Character(v) => v
                .get(index)
                .map(|&c| Allele::Character(c))
                .ok_or_else(out_of_range),
            Self::Opaque(_) => Err(ContractViolation::AlleleType {
                expected: "opaque",
                actual: "allele access",
            }),
        }
    }

    /// Write one allele
    pub fn set(&mut self, index: usize, allele: Allele) -> Result<(), ContractViolation> {
        let length = self.len();
        let expected = self.gene_type().name();
        if let Self::Opaque(_) = self {
            return Err(ContractViolation::AlleleType {
                expected,
                actual: "allele access",
            });
        }
        if index >= length {
            return Err(ContractViolation::AlleleIndex { index, length });
        }
        match (self, allele) {
            (Self::Binary(v), Allele::Binary(b)) => v[index] = b,
            (Self::Integer(v), Allele::Integer(i)) => v[index] = i,
            (Self::Real(v), Allele::Real(r)) => v[index] = r,
            (Self::Character(v), Allele::Character(c)) => v[index] = c,
            (_, other) => {
                return Err(ContractViolation::AlleleType {
                    expected,
                    actual: other.gene_type().name(),
                })
            }
        }
        Ok(())
    }

    /// Bits of a binary chromosome
    pub fn as_binary(&self) -> Option<&[bool]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable bits of a binary chromosome
    pub fn as_binary_mut(&mut self) -> Option<&mut [bool]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Alleles of an integer chromosome
    pub fn as_integer(&self) -> Option<&[i64]> {
        match self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable alleles of an integer chromosome
    pub fn as_integer_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Alleles of a real chromosome
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable alleles of a real chromosome
    pub fn as_real_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Alleles of a character chromosome
    pub fn as_character(&self) -> Option<&[u8]> {
        match self {
            Self::Character(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable alleles of a character chromosome
    pub fn as_character_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Character(v) => Some(v),
            _ => None,
        }
    }

    /// The user value of an opaque chromosome
    pub fn opaque(&self) -> Option<&dyn GeneValue> {
        match self {
            Self::Opaque(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Downcast the user value of an opaque chromosome
    pub fn opaque_as<T: 'static>(&self) -> Option<&T> {
        self.opaque().and_then(|v| v.as_any().downcast_ref::<T>())
    }

    /// Mutably downcast the user value of an opaque chromosome
    pub fn opaque_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        match self {
            Self::Opaque(Some(v)) => v.as_any_mut().downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Install a user value into an opaque chromosome, dropping the previous one
    pub fn set_opaque(&mut self, value: Box<dyn GeneValue>) -> Result<(), ContractViolation> {
        match self {
            Self::Opaque(slot) => {
                *slot = Some(value);
                Ok(())
            }
            other => Err(ContractViolation::AlleleType {
                expected: other.gene_type().name(),
                actual: "opaque",
            }),
        }
    }

    /// Built-in 64-bit hash of the alleles; `None` for opaque chromosomes
    pub fn default_hash(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        match self {
            Self::Binary(v) => v.hash(&mut hasher),
            Self::Integer(v) => v.hash(&mut hasher),
            Self::Real(v) => {
                for r in v {
                    // +0.0 and -0.0 compare equal, so they must hash equal
                    let r = if *r == 0.0 { 0.0f64 } else { *r };
                    r.to_bits().hash(&mut hasher);
                }
            }
            Self::Character(v) => v.hash(&mut hasher),
            Self::Opaque(_) => return None,
        }
        Some(hasher.finish())
    }
}

impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Character(a), Self::Character(b)) => a == b,
            (Self::Opaque(Some(a)), Self::Opaque(Some(b))) => a.eq_value(b.as_ref()),
            (Self::Opaque(None), Self::Opaque(None)) => true,
            _ => false,
        }
    }
}
