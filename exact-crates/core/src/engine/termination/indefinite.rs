use super::TerminationCondition;

/// Never stops the search: the solver runs until it reaches SAT, UNSAT or an inconsistent set of
/// assumptions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Indefinite;

impl TerminationCondition for Indefinite {
    fn should_stop(&mut self) -> bool {
        false
    }
}
