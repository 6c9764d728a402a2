use super::TerminationCondition;

/// Stops as soon as either of its two conditions does. Both conditions see every conflict.
///
/// Nest combinators to combine more than two conditions.
#[derive(Clone, Copy, Debug)]
pub struct Combinator<First, Second> {
    first: First,
    second: Second,
}

impl<First, Second> Combinator<First, Second> {
    pub fn new(first: First, second: Second) -> Self {
        Combinator { first, second }
    }

    pub fn first(&self) -> &First {
        &self.first
    }

    pub fn second(&self) -> &Second {
        &self.second
    }
}

impl<First, Second> TerminationCondition for Combinator<First, Second>
where
    First: TerminationCondition,
    Second: TerminationCondition,
{
    fn should_stop(&mut self) -> bool {
        // both are polled so that stateful conditions stay in step
        let first = self.first.should_stop();
        let second = self.second.should_stop();
        first || second
    }

    fn conflict_has_been_found(&mut self) {
        self.first.conflict_has_been_found();
        self.second.conflict_has_been_found();
    }
}
