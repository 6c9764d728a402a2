//! Contains structures related to optimisation.
//!
//! The [`OptimisationDriver`] minimises an [`Objective`] over the constraints of a
//! [`Solver`](crate::Solver). Depending on the [`OptimisationMode`] it raises the lower bound
//! through cores, lowers the upper bound through solutions, or alternates between the two. Two
//! collaborators can be plugged in: an [`LpCollaborator`] which contributes cuts and bounds, and
//! a [`SolutionImprover`] which polishes solutions.
mod lp_collaborator;
mod objective;
mod optimisation_driver;
mod optimisation_options;
mod reformulation;
mod solution_improver;

pub use lp_collaborator::LpCollaborator;
pub use lp_collaborator::LpOutcome;
pub use lp_collaborator::LpView;
pub use objective::Objective;
pub use optimisation_driver::OptimisationDriver;
pub use optimisation_options::CoreEncoding;
pub use optimisation_options::OptimisationMode;
pub use optimisation_options::OptimisationOptions;
pub(crate) use reformulation::Reformulation;
pub use solution_improver::SolutionImprover;

use crate::basic_types::Solution;

/// The outcome of [`OptimisationDriver::optimise`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptimisationResult {
    /// The solution is proven to be optimal.
    Optimal(Solution),
    /// The search was interrupted; this is the best solution found.
    Satisfiable(Solution),
    /// The constraints have no solution.
    Unsatisfiable,
    /// The search was interrupted before any solution was found.
    Unknown,
}
