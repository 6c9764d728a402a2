use super::Lit;
use super::Var;
use crate::containers::KeyedVec;

/// A complete assignment to the variables of a solver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    values: KeyedVec<Var, bool>,
}

impl Solution {
    pub(crate) fn new(values: KeyedVec<Var, bool>) -> Solution {
        Solution { values }
    }

    pub fn num_variables(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    pub fn value(&self, var: Var) -> bool {
        self.values[var]
    }

    pub fn is_true(&self, lit: Lit) -> bool {
        self.values[lit.var()] == lit.is_positive()
    }

    /// Makes `lit` true in the solution.
    pub fn set(&mut self, lit: Lit) {
        self.values[lit.var()] = lit.is_positive();
    }

    /// The literals which are true in this solution, in variable order.
    pub fn true_literals(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values
            .keys()
            .skip(1)
            .map(|var| Lit::new(var, self.values[var]))
    }
}
