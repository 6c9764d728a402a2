use super::Objective;
use crate::basic_types::Solution;
#[cfg(doc)]
use crate::optimisation::OptimisationDriver;

/// A local search procedure which tries to improve the solutions found by the solver.
///
/// The [`OptimisationDriver`] only accepts a returned solution if it satisfies the formula and
/// has a strictly better objective value.
pub trait SolutionImprover {
    fn improve(&mut self, solution: &Solution, objective: &Objective) -> Option<Solution>;
}

impl<T: FnMut(&Solution, &Objective) -> Option<Solution>> SolutionImprover for T {
    fn improve(&mut self, solution: &Solution, objective: &Objective) -> Option<Solution> {
        (self)(solution, objective)
    }
}
