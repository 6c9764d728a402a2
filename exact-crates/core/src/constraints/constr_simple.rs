use std::fmt::Display;
use std::fmt::Formatter;

use num::BigInt;

use crate::arithmetic::Coefficient;
use crate::basic_types::Lit;

/// A single term `coefficient * lit` of a [`ConstrSimple`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term<C> {
    pub coefficient: C,
    pub lit: Lit,
}

/// A linear constraint `Σ c_i * l_i >= rhs` as a plain list of terms. Coefficients may have any
/// sign and literals may repeat; the solver normalises the constraint when it is added.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstrSimple<C> {
    pub terms: Vec<Term<C>>,
    pub rhs: C,
}

impl<C: Coefficient> ConstrSimple<C> {
    pub fn new(terms: impl IntoIterator<Item = (C, Lit)>, rhs: C) -> ConstrSimple<C> {
        ConstrSimple {
            terms: terms
                .into_iter()
                .map(|(coefficient, lit)| Term { coefficient, lit })
                .collect(),
            rhs,
        }
    }

    /// The constraint `Σ c_i * l_i <= rhs`, expressed as `Σ -c_i * l_i >= -rhs`.
    pub fn at_most(terms: impl IntoIterator<Item = (C, Lit)>, rhs: C) -> ConstrSimple<C> {
        ConstrSimple::new(
            terms
                .into_iter()
                .map(|(coefficient, lit)| (-coefficient, lit)),
            -rhs,
        )
    }

    /// The clause `l_1 ∨ ... ∨ l_n`.
    pub fn clause(lits: impl IntoIterator<Item = Lit>) -> ConstrSimple<C> {
        ConstrSimple::at_least(lits, C::one())
    }

    /// The cardinality constraint `l_1 + ... + l_n >= k`.
    pub fn at_least(lits: impl IntoIterator<Item = Lit>, k: C) -> ConstrSimple<C> {
        ConstrSimple::new(lits.into_iter().map(|lit| (C::one(), lit)), k)
    }

    pub fn to_big(&self) -> ConstrSimple<BigInt> {
        ConstrSimple {
            terms: self
                .terms
                .iter()
                .map(|term| Term {
                    coefficient: term.coefficient.to_big(),
                    lit: term.lit,
                })
                .collect(),
            rhs: self.rhs.to_big(),
        }
    }

    /// Evaluates the left-hand side under an assignment given as a predicate on literals.
    pub fn lhs_value(&self, is_true: impl Fn(Lit) -> bool) -> C {
        self.terms
            .iter()
            .filter(|term| is_true(term.lit))
            .fold(C::zero(), |sum, term| sum + term.coefficient.clone())
    }

    pub fn is_satisfied_by(&self, is_true: impl Fn(Lit) -> bool) -> bool {
        self.lhs_value(is_true) >= self.rhs
    }
}

impl<C: Coefficient> Display for ConstrSimple<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for term in &self.terms {
            if term.coefficient.is_negative() {
                write!(f, "{} {} ", term.coefficient, term.lit)?;
            } else {
                write!(f, "+{} {} ", term.coefficient, term.lit)?;
            }
        }
        write!(f, ">= {} ;", self.rhs)
    }
}
