use num::BigInt;
use num::Signed;
use num::Zero;

use crate::arithmetic::Coefficient;
use crate::basic_types::Lit;
use crate::basic_types::Solution;
use crate::basic_types::Var;
use crate::constraints::ConstrSimple;
use crate::constraints::Term;
use crate::containers::HashMap;

/// A linear objective `Σ c_i * l_i + constant` which is to be minimised.
///
/// The objective is kept in normal form: every coefficient is positive and every variable
/// occurs at most once. Negative coefficients are folded into the constant by negating their
/// literal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Objective {
    terms: Vec<Term<BigInt>>,
    constant: BigInt,
}

impl Objective {
    pub fn new<C: Coefficient>(terms: impl IntoIterator<Item = (C, Lit)>, constant: C) -> Objective {
        let mut constant = constant.to_big();
        // the coefficient of the positive literal of every variable
        let mut coefficients: HashMap<Var, BigInt> = HashMap::default();
        for (coefficient, lit) in terms {
            let coefficient = coefficient.to_big();
            let entry = coefficients.entry(lit.var()).or_default();
            if lit.is_positive() {
                *entry += coefficient;
            } else {
                constant += &coefficient;
                *entry -= coefficient;
            }
        }

        let mut vars = coefficients.keys().copied().collect::<Vec<_>>();
        vars.sort();
        let terms = vars
            .into_iter()
            .filter_map(|var| {
                let coefficient = &coefficients[&var];
                if coefficient.is_zero() {
                    None
                } else if coefficient.is_positive() {
                    Some(Term {
                        coefficient: coefficient.clone(),
                        lit: var.positive(),
                    })
                } else {
                    constant += coefficient;
                    Some(Term {
                        coefficient: -coefficient,
                        lit: var.negative(),
                    })
                }
            })
            .collect();

        Objective { terms, constant }
    }

    pub fn terms(&self) -> &[Term<BigInt>] {
        &self.terms
    }

    pub fn constant(&self) -> &BigInt {
        &self.constant
    }

    pub fn value(&self, solution: &Solution) -> BigInt {
        self.terms
            .iter()
            .filter(|term| solution.is_true(term.lit))
            .fold(self.constant.clone(), |sum, term| sum + &term.coefficient)
    }

    /// The smallest value the objective can take.
    pub fn trivial_lower_bound(&self) -> BigInt {
        self.constant.clone()
    }

    /// The constraint `objective <= bound`.
    pub(crate) fn at_most(&self, bound: &BigInt) -> ConstrSimple<BigInt> {
        ConstrSimple::at_most(self.weighted_lits(), bound - &self.constant)
    }

    /// The constraint `objective >= bound`.
    pub(crate) fn at_least(&self, bound: &BigInt) -> ConstrSimple<BigInt> {
        ConstrSimple::new(self.weighted_lits(), bound - &self.constant)
    }

    fn weighted_lits(&self) -> impl Iterator<Item = (BigInt, Lit)> + '_ {
        self.terms
            .iter()
            .map(|term| (term.coefficient.clone(), term.lit))
    }
}
