use rand::rngs::SmallRng;
use rand::Rng;

use crate::basic_types::Lit;
use crate::basic_types::Var;
use crate::containers::KeyValueHeap;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;
use crate::engine::Trail;

/// VSIDS decision heuristic with phase saving.
///
/// Variables are ordered by an activity which is bumped when the variable takes part in a
/// conflict; the polarity of a decision is the value the variable last had.
#[derive(Debug)]
pub(crate) struct VariableSelector {
    heap: KeyValueHeap<Var, f64>,
    increment: f64,
    max_threshold: f64,
    decay_factor: f64,
    phases: KeyedVec<Var, bool>,
    random_frequency: f64,
    random_generator: SmallRng,
}

impl VariableSelector {
    pub(crate) fn new(
        decay_factor: f64,
        random_frequency: f64,
        random_generator: SmallRng,
    ) -> VariableSelector {
        VariableSelector {
            heap: KeyValueHeap::default(),
            increment: 1.0,
            max_threshold: 1e100,
            decay_factor,
            phases: KeyedVec::default(),
            random_frequency,
            random_generator,
        }
    }

    /// Adds the variables up to and including `num_vars` to the heap.
    pub(crate) fn grow(&mut self, num_vars: usize) {
        while self.heap.num_keys() <= num_vars {
            let var = Var::from_index(self.heap.num_keys());
            self.heap.grow(var, 0.0);
            if var.index() == 0 {
                self.heap.delete_key(var);
            }
        }
        self.phases.grow_to_include(Var::from_index(num_vars), false);
    }

    pub(crate) fn bump_activity(&mut self, var: Var) {
        // scale the activities if the values are too large
        let activity = self.heap.get_value(var);
        if activity + self.increment >= self.max_threshold {
            self.heap.divide_values(self.max_threshold);
            self.increment /= self.max_threshold;
        }
        self.heap.increment(var, self.increment);
    }

    pub(crate) fn decay_activities(&mut self) {
        // decaying is implemented by increasing the increment so that future bumps weigh more
        self.increment *= 1.0 / self.decay_factor;
    }

    #[cfg(test)]
    pub(crate) fn activity(&self, var: Var) -> f64 {
        self.heap.get_value(var)
    }

    /// Called when `lit` is removed from the trail.
    pub(crate) fn on_unassigned(&mut self, lit: Lit) {
        self.phases[lit.var()] = lit.is_positive();
        self.heap.restore_key(lit.var());
    }

    /// Sets the polarity for the next decision on the variable of `lit`.
    /// The most active unassigned variable, or occasionally a random one, in its saved phase.
    /// Returns `None` when every variable is assigned.
    pub(crate) fn next_decision(&mut self, trail: &Trail) -> Option<Lit> {
        if self.random_frequency > 0.0
            && !self.heap.is_empty()
            && self.random_generator.gen_bool(self.random_frequency)
        {
            let position = self.random_generator.gen_range(0..self.heap.len());
            let var = self.heap.key_at_position(position);
            if trail.is_unknown(var.positive()) {
                return Some(Lit::new(var, self.phases[var]));
            }
        }

        loop {
            let (var, _) = self.heap.peek_max()?;
            // assigned variables are removed lazily
            if trail.is_unknown(var.positive()) {
                return Some(Lit::new(var, self.phases[var]));
            }
            let _ = self.heap.pop_max();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::basic_types::CRef;

    fn selector(num_vars: usize) -> VariableSelector {
        let mut selector = VariableSelector::new(0.95, 0.0, SmallRng::seed_from_u64(42));
        selector.grow(num_vars);
        selector
    }

    #[test]
    fn most_active_variable_is_chosen() {
        let mut trail = Trail::default();
        trail.grow(3);
        let mut selector = selector(3);

        selector.bump_activity(Var::new(2));
        selector.decay_activities();
        selector.bump_activity(Var::new(3));

        assert_eq!(selector.next_decision(&trail), Some(Var::new(3).negative()));
        trail.enqueue(Var::new(3).negative(), CRef::UNDEF);
        assert_eq!(selector.next_decision(&trail), Some(Var::new(2).negative()));
    }

    #[test]
    fn phases_are_saved_on_unassignment() {
        let mut trail = Trail::default();
        trail.grow(1);
        let mut selector = selector(1);
        let x1 = Var::new(1).positive();

        trail.enqueue(x1, CRef::UNDEF);
        assert_eq!(selector.next_decision(&trail), None);

        let _ = trail.pop();
        selector.on_unassigned(x1);
        assert_eq!(selector.next_decision(&trail), Some(x1));
    }

    #[test]
    fn activities_are_rescaled() {
        let mut selector = selector(2);
        selector.increment = 6e99;
        selector.bump_activity(Var::new(1));
        selector.bump_activity(Var::new(1));
        assert!(selector.activity(Var::new(1)) < 1e100);
        assert!(selector.activity(Var::new(1)) > selector.activity(Var::new(2)));
    }
}
