/// The outcome of a single [`Solver::solve`](crate::Solver::solve) call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveState {
    /// A solution was found; it is available through
    /// [`Solver::last_solution`](crate::Solver::last_solution).
    Sat,
    /// The constraint database is infeasible. This is final.
    Unsat,
    /// The database is infeasible under the current assumptions; the core is available through
    /// [`Solver::last_core`](crate::Solver::last_core).
    Inconsistent,
    /// The solver restarted and ran inprocessing; the caller may add constraints before calling
    /// [`Solver::solve`](crate::Solver::solve) again.
    Inprocessing,
    /// The termination condition triggered.
    Interrupted,
}
