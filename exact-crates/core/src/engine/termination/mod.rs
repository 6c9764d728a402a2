//! Conditions under which a call to the solver gives up before reaching a conclusion.
//!
//! The solver polls its condition between conflicts and decisions, and reports
//! [`SolveState::Interrupted`](crate::SolveState::Interrupted) when it says to stop. The solver
//! state stays valid, so the search can be resumed with a fresh condition.
mod combinator;
mod conflict_budget;
mod indefinite;
mod interrupt;
mod time_budget;

pub use combinator::Combinator;
pub use conflict_budget::ConflictBudget;
pub use indefinite::Indefinite;
pub use interrupt::Interrupt;
pub use time_budget::TimeBudget;

pub trait TerminationCondition {
    fn should_stop(&mut self) -> bool;

    /// Notifies the condition that the search derived a conflict.
    fn conflict_has_been_found(&mut self) {}
}

impl<T: TerminationCondition + ?Sized> TerminationCondition for &mut T {
    fn should_stop(&mut self) -> bool {
        (**self).should_stop()
    }

    fn conflict_has_been_found(&mut self) {
        (**self).conflict_has_been_found()
    }
}
