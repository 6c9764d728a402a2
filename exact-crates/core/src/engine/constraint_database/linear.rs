use super::Watch;
use super::WatchKind;
use super::WatchOutcome;
use super::Watches;
use crate::arithmetic::convert;
use crate::arithmetic::Coefficient;
use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::constraints::ConstrExp;
use crate::engine::Trail;
use crate::exact_assert_moderate;

/// How a linear constraint detects propagations.
#[derive(Clone, Debug)]
pub(crate) enum LinearMode<L> {
    /// Every literal is watched and the slack over the non-falsified literals is maintained.
    Counting { slack: L },
    /// Only a subset of the literals is watched; the slack over the watched, non-falsified
    /// literals is kept at least as large as the largest coefficient whenever possible.
    Watched { watched: Vec<bool>, watch_slack: L },
}

/// A stored linear constraint `Σ c_i * l_i >= degree`, with the terms sorted by decreasing
/// coefficient.
#[derive(Clone, Debug)]
pub(crate) struct Linear<S, L> {
    coefs: Vec<S>,
    lits: Vec<Lit>,
    degree: L,
    mode: LinearMode<L>,
}

impl<S: Coefficient, L: Coefficient> Linear<S, L> {
    pub(crate) fn new(ce: &ConstrExp<S, L>) -> Linear<S, L> {
        let mut terms = ce.terms().collect::<Vec<_>>();
        terms.sort_by(|(a, _), (b, _)| b.cmp(a));
        let (coefs, lits) = terms.into_iter().unzip();
        Linear {
            coefs,
            lits,
            degree: ce.degree().clone(),
            mode: LinearMode::Counting { slack: L::zero() },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lits.len()
    }

    pub(crate) fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub(crate) fn terms(&self) -> impl Iterator<Item = (&S, Lit)> + '_ {
        self.coefs.iter().zip(self.lits.iter().copied())
    }

    #[cfg(test)]
    pub(crate) fn is_counting(&self) -> bool {
        matches!(self.mode, LinearMode::Counting { .. })
    }

    fn largest_coef(&self) -> L {
        convert(&self.coefs[0])
    }

    fn coef(&self, index: usize) -> L {
        convert(&self.coefs[index])
    }

    /// The smallest number of literals whose coefficients sum to at least the degree plus the
    /// largest coefficient; this is the size of the smallest possible watch set.
    fn minimal_watch_set_size(&self) -> usize {
        let target = self.degree.clone() + self.largest_coef();
        let mut sum = L::zero();
        for (count, coef) in self.coefs.iter().enumerate() {
            sum = sum + convert::<S, L>(coef);
            if sum >= target {
                return count + 1;
            }
        }
        self.len()
    }

    /// Chooses the propagation mode and registers the watches of the constraint.
    ///
    /// Counting propagation is used when the smallest watch set contains at least
    /// `counting_ratio` of the literals.
    pub(crate) fn attach(&mut self, cref: CRef, trail: &Trail, watches: &mut Watches, counting_ratio: f64) {
        let contribution = |lit: Lit, coef: L| {
            if trail.is_false_and_processed(lit) {
                L::zero()
            } else {
                coef
            }
        };

        if self.minimal_watch_set_size() as f64 >= counting_ratio * self.len() as f64 {
            let mut slack = -self.degree.clone();
            for index in 0..self.len() {
                slack = slack + contribution(self.lits[index], self.coef(index));
                watches.push(self.lits[index], linear_watch(cref, index));
            }
            self.mode = LinearMode::Counting { slack };
            return;
        }

        // non-falsified literals first, then falsified literals from the most recent level
        let mut order = (0..self.len()).collect::<Vec<_>>();
        order.sort_by_key(|&index| {
            let lit = self.lits[index];
            (trail.is_false(lit), std::cmp::Reverse(trail.false_level(lit)))
        });

        let largest = self.largest_coef();
        let mut watched = vec![false; self.len()];
        let mut watch_slack = -self.degree.clone();
        for index in order {
            if watch_slack >= largest {
                break;
            }
            watched[index] = true;
            watch_slack = watch_slack + contribution(self.lits[index], self.coef(index));
            watches.push(self.lits[index], linear_watch(cref, index));
        }
        self.mode = LinearMode::Watched {
            watched,
            watch_slack,
        };
    }

    /// Propagates the constraint under the full current assignment; used when it is attached.
    /// Returns whether the constraint is falsified.
    pub(crate) fn propagate_on_attach(&self, cref: CRef, trail: &mut Trail) -> bool {
        let slack = self
            .terms()
            .filter(|&(_, lit)| !trail.is_false(lit))
            .fold(-self.degree.clone(), |slack, (coef, _)| {
                slack + convert::<S, L>(coef)
            });
        if slack.is_negative() {
            return true;
        }
        self.propagate_with_slack(&slack, cref, trail);
        false
    }

    fn propagate_with_slack(&self, slack: &L, cref: CRef, trail: &mut Trail) {
        for (coef, lit) in self.terms() {
            if convert::<S, L>(coef) <= *slack {
                break;
            }
            if trail.is_unknown(lit) {
                trail.enqueue(lit, cref);
            }
        }
    }

    /// Visits the constraint because the literal with the given index became false.
    ///
    /// With `bookkeeping_only` the slack is updated but nothing is propagated; this is used for
    /// the remaining watches of a literal after a conflict was found.
    pub(crate) fn on_falsified(
        &mut self,
        index: usize,
        cref: CRef,
        trail: &mut Trail,
        watches: &mut Watches,
        bookkeeping_only: bool,
    ) -> WatchOutcome {
        let coef = self.coef(index);
        let largest = self.largest_coef();

        let slack = match &mut self.mode {
            LinearMode::Counting { slack } => {
                *slack = slack.clone() - coef;
                slack.clone()
            }
            LinearMode::Watched {
                watched,
                watch_slack,
            } => {
                if !watched[index] {
                    return WatchOutcome::Drop;
                }
                *watch_slack = watch_slack.clone() - coef;
                if bookkeeping_only {
                    return WatchOutcome::Keep;
                }

                if *watch_slack < largest {
                    for other in 0..self.lits.len() {
                        if *watch_slack >= largest {
                            break;
                        }
                        let lit = self.lits[other];
                        if watched[other] || trail.is_false(lit) {
                            continue;
                        }
                        watched[other] = true;
                        *watch_slack = watch_slack.clone() + convert::<S, L>(&self.coefs[other]);
                        watches.push(lit, linear_watch(cref, other));
                    }
                }

                if *watch_slack >= largest {
                    watched[index] = false;
                    return WatchOutcome::Drop;
                }
                watch_slack.clone()
            }
        };

        if bookkeeping_only {
            return WatchOutcome::Keep;
        }
        if slack.is_negative() {
            return WatchOutcome::Conflict;
        }
        self.propagate_with_slack(&slack, cref, trail);
        WatchOutcome::Keep
    }

    /// Restores the contribution of the literal with the given index when the assignment which
    /// falsified it is undone.
    pub(crate) fn on_unfalsified(&mut self, index: usize) {
        let coef = self.coef(index);
        match &mut self.mode {
            LinearMode::Counting { slack } => *slack = slack.clone() + coef,
            LinearMode::Watched {
                watched,
                watch_slack,
            } => {
                if watched[index] {
                    *watch_slack = watch_slack.clone() + coef;
                }
            }
        }
    }

    /// The slack over the non-falsified processed literals, as maintained incrementally.
    #[cfg(test)]
    pub(crate) fn tracked_slack(&self) -> &L {
        match &self.mode {
            LinearMode::Counting { slack } => slack,
            LinearMode::Watched { watch_slack, .. } => watch_slack,
        }
    }

    /// Recomputes the slack that [`Linear::tracked_slack`] should have.
    #[cfg(test)]
    pub(crate) fn expected_tracked_slack(&self, trail: &Trail) -> L {
        let is_watched = |index: usize| match &self.mode {
            LinearMode::Counting { .. } => true,
            LinearMode::Watched { watched, .. } => watched[index],
        };
        (0..self.len())
            .filter(|&index| is_watched(index) && !trail.is_false_and_processed(self.lits[index]))
            .fold(-self.degree.clone(), |slack, index| slack + self.coef(index))
    }

    pub(crate) fn copy_into(&self, ce: &mut ConstrExp<S, L>) {
        for (coef, lit) in self.terms() {
            ce.add_lhs(coef, lit);
        }
        ce.add_rhs(&self.degree);
        exact_assert_moderate!(ce.degree() == &self.degree);
    }
}

fn linear_watch(cref: CRef, index: usize) -> Watch {
    Watch {
        cref,
        kind: WatchKind::Linear(index as u32),
    }
}
