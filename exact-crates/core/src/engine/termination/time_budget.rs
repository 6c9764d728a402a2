use std::time::Duration;
use std::time::Instant;

use super::TerminationCondition;

/// Stops the search once a wall-clock deadline has passed.
#[derive(Clone, Copy, Debug)]
pub struct TimeBudget {
    /// `None` when the budget is too large to be represented as an [`Instant`].
    deadline: Option<Instant>,
}

impl TimeBudget {
    pub fn starting_now(budget: Duration) -> TimeBudget {
        TimeBudget {
            deadline: Instant::now().checked_add(budget),
        }
    }

    /// The time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.map_or(Duration::MAX, |deadline| {
            deadline.saturating_duration_since(Instant::now())
        })
    }
}

impl TerminationCondition for TimeBudget {
    fn should_stop(&mut self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_empty_budget_is_spent_immediately() {
        let mut budget = TimeBudget::starting_now(Duration::ZERO);
        assert!(budget.should_stop());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[test]
    fn an_unrepresentable_budget_never_runs_out() {
        let mut budget = TimeBudget::starting_now(Duration::MAX);
        assert!(!budget.should_stop());
        assert_eq!(budget.remaining(), Duration::MAX);
    }
}
