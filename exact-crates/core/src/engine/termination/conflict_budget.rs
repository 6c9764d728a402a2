use super::TerminationCondition;

/// Stops the search once it has run into a fixed number of conflicts.
///
/// The optimisation driver uses one of these to bound each phase of the hybrid search, which is
/// why the budget can be inspected after the search returns.
#[derive(Debug, Copy, Clone)]
pub struct ConflictBudget {
    remaining: u64,
}

impl ConflictBudget {
    pub fn new(conflicts: u64) -> ConflictBudget {
        ConflictBudget {
            remaining: conflicts,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

impl TerminationCondition for ConflictBudget {
    fn should_stop(&mut self) -> bool {
        self.is_exhausted()
    }

    fn conflict_has_been_found(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}
