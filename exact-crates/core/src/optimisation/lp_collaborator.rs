use num::BigInt;

use super::Objective;
use crate::basic_types::Lit;
use crate::constraints::ConstrSimple;
use crate::engine::Solver;
#[cfg(doc)]
use crate::optimisation::OptimisationDriver;

/// A relaxation solver which the [`OptimisationDriver`] consults between searches. It may
/// contribute a cutting plane and a lower bound on the objective.
pub trait LpCollaborator {
    fn run(&mut self, view: &LpView<'_>) -> LpOutcome;
}

impl<T: FnMut(&LpView<'_>) -> LpOutcome> LpCollaborator for T {
    fn run(&mut self, view: &LpView<'_>) -> LpOutcome {
        (self)(view)
    }
}

/// The part of the solver state which an [`LpCollaborator`] can see.
#[derive(Clone, Copy, Debug)]
pub struct LpView<'a> {
    pub(crate) solver: &'a Solver,
    pub(crate) objective: &'a Objective,
    pub(crate) lower_bound: &'a BigInt,
    pub(crate) upper_bound: Option<&'a BigInt>,
}

impl LpView<'_> {
    pub fn objective(&self) -> &Objective {
        self.objective
    }

    pub fn lower_bound(&self) -> &BigInt {
        self.lower_bound
    }

    /// The value of the best solution found so far, if any.
    pub fn upper_bound(&self) -> Option<&BigInt> {
        self.upper_bound
    }

    pub fn num_variables(&self) -> usize {
        self.solver.num_variables()
    }

    /// The value of `lit` at the root, if it is fixed there.
    pub fn root_value(&self, lit: Lit) -> Option<bool> {
        self.solver.root_value(lit)
    }
}

/// What an [`LpCollaborator`] derived.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LpOutcome {
    /// A constraint implied by the formula which is added to the solver.
    pub cut: Option<ConstrSimple<BigInt>>,
    /// A lower bound on the objective.
    pub lower_bound: Option<BigInt>,
}
