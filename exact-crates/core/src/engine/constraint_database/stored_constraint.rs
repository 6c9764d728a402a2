use num::BigInt;

use super::Linear;
use super::Watch;
use super::WatchKind;
use super::WatchOutcome;
use super::Watches;
use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::engine::Trail;
use crate::proof::ProofId;

/// Bookkeeping shared by all stored constraints.
#[derive(Clone, Debug)]
pub(crate) struct ConstraintHeader {
    /// The proof line which derived the constraint
    pub(crate) id: ProofId,
    pub(crate) origin: Origin,
    pub(crate) lbd: u32,
    pub(crate) activity: f32,
    pub(crate) removed: bool,
    /// Locked constraints are never removed by database reduction
    pub(crate) locked: bool,
    /// Protected constraints survive the next database reduction
    pub(crate) protected: bool,
    /// The ID under which the constraint can be removed through the public interface
    pub(crate) external_id: Option<ProofId>,
}

impl ConstraintHeader {
    pub(crate) fn new(id: ProofId, origin: Origin, lbd: u32, locked: bool) -> ConstraintHeader {
        ConstraintHeader {
            id,
            origin,
            lbd,
            activity: 0.0,
            removed: false,
            locked,
            protected: false,
            external_id: None,
        }
    }
}

/// A clause; the first two literals are watched.
#[derive(Clone, Debug)]
pub(crate) struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    pub(crate) fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub(crate) fn is_binary(&self) -> bool {
        self.lits.len() == 2
    }

    fn attach(&self, cref: CRef, watches: &mut Watches) {
        // units are only attached at the root, where they stay assigned
        if self.lits.len() < 2 {
            return;
        }
        if self.is_binary() {
            watches.push(
                self.lits[0],
                Watch {
                    cref,
                    kind: WatchKind::Binary(self.lits[1]),
                },
            );
            watches.push(
                self.lits[1],
                Watch {
                    cref,
                    kind: WatchKind::Binary(self.lits[0]),
                },
            );
        } else {
            for (watched, blocker) in [(0, 1), (1, 0)] {
                watches.push(
                    self.lits[watched],
                    Watch {
                        cref,
                        kind: WatchKind::Clause(self.lits[blocker]),
                    },
                );
            }
        }
    }

    fn on_falsified(
        &mut self,
        falsified: Lit,
        cref: CRef,
        trail: &mut Trail,
        watches: &mut Watches,
    ) -> WatchOutcome {
        if self.lits[0] == falsified {
            self.lits.swap(0, 1);
        }
        let other = self.lits[0];
        if trail.is_true(other) {
            return WatchOutcome::Keep;
        }

        if let Some(replacement) =
            (2..self.lits.len()).find(|&index| !trail.is_false(self.lits[index]))
        {
            self.lits.swap(1, replacement);
            watches.push(
                self.lits[1],
                Watch {
                    cref,
                    kind: WatchKind::Clause(other),
                },
            );
            return WatchOutcome::Drop;
        }

        if trail.is_false(other) {
            WatchOutcome::Conflict
        } else {
            trail.enqueue(other, cref);
            WatchOutcome::Keep
        }
    }
}

/// A cardinality constraint `Σ l_i >= degree`; the first `degree + 1` literals are watched.
#[derive(Clone, Debug)]
pub(crate) struct Cardinality {
    lits: Vec<Lit>,
    degree: usize,
}

impl Cardinality {
    pub(crate) fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub(crate) fn degree(&self) -> usize {
        self.degree
    }

    fn num_watched(&self) -> usize {
        (self.degree + 1).min(self.lits.len())
    }

    fn attach(&self, cref: CRef, watches: &mut Watches) {
        for &lit in &self.lits[..self.num_watched()] {
            watches.push(
                lit,
                Watch {
                    cref,
                    kind: WatchKind::Cardinality,
                },
            );
        }
    }

    fn on_falsified(
        &mut self,
        falsified: Lit,
        cref: CRef,
        trail: &mut Trail,
        watches: &mut Watches,
    ) -> WatchOutcome {
        let num_watched = self.num_watched();
        let Some(position) = self.lits[..num_watched]
            .iter()
            .position(|&lit| lit == falsified)
        else {
            return WatchOutcome::Drop;
        };

        if let Some(replacement) =
            (num_watched..self.lits.len()).find(|&index| !trail.is_false(self.lits[index]))
        {
            self.lits.swap(position, replacement);
            watches.push(
                self.lits[position],
                Watch {
                    cref,
                    kind: WatchKind::Cardinality,
                },
            );
            return WatchOutcome::Drop;
        }

        let num_non_false = self.lits[..num_watched]
            .iter()
            .filter(|&&lit| !trail.is_false(lit))
            .count();
        if num_non_false < self.degree {
            return WatchOutcome::Conflict;
        }
        if num_non_false == self.degree {
            for index in 0..num_watched {
                let lit = self.lits[index];
                if trail.is_unknown(lit) {
                    trail.enqueue(lit, cref);
                }
            }
        }
        WatchOutcome::Keep
    }
}

/// Matches on a [`ConstraintBody`], applying `$body` to a linear constraint of any width.
macro_rules! match_body {
    ($value:expr, linear $linear:ident => $body:expr, $($arm:pat => $expr:expr),+ $(,)?) => {
        match $value {
            ConstraintBody::Linear32($linear) => $body,
            ConstraintBody::Linear64($linear) => $body,
            ConstraintBody::Linear96($linear) => $body,
            ConstraintBody::Linear128($linear) => $body,
            ConstraintBody::LinearArb($linear) => $body,
            $($arm => $expr),+
        }
    };
}
#[cfg(test)]
pub(crate) use match_body;

/// The representation of a stored constraint, chosen at attach time.
#[derive(Clone, Debug)]
pub(crate) enum ConstraintBody {
    Clause(Clause),
    Cardinality(Cardinality),
    Linear32(Linear<i32, i64>),
    Linear64(Linear<i64, i128>),
    Linear96(Linear<i128, i128>),
    Linear128(Linear<i128, BigInt>),
    LinearArb(Linear<BigInt, BigInt>),
}

impl ConstraintBody {
    pub(crate) fn clause(lits: Vec<Lit>) -> ConstraintBody {
        ConstraintBody::Clause(Clause { lits })
    }

    pub(crate) fn cardinality(lits: Vec<Lit>, degree: usize) -> ConstraintBody {
        ConstraintBody::Cardinality(Cardinality { lits, degree })
    }

    pub(crate) fn lits(&self) -> &[Lit] {
        match_body!(self,
            linear linear => linear.lits(),
            ConstraintBody::Clause(clause) => clause.lits(),
            ConstraintBody::Cardinality(cardinality) => cardinality.lits(),
        )
    }

    /// Orders the literals so that the most suitable ones are watched: non-falsified literals
    /// first, then falsified literals from the most recent level.
    pub(crate) fn sort_for_watching(&mut self, trail: &Trail) {
        let key = |lit: &Lit| {
            (
                trail.is_false(*lit),
                std::cmp::Reverse(trail.false_level(*lit)),
            )
        };
        match self {
            ConstraintBody::Clause(clause) => clause.lits.sort_by_key(key),
            ConstraintBody::Cardinality(cardinality) => cardinality.lits.sort_by_key(key),
            _ => {}
        }
    }

    pub(crate) fn attach(
        &mut self,
        cref: CRef,
        trail: &Trail,
        watches: &mut Watches,
        counting_ratio: f64,
    ) {
        match_body!(self,
            linear linear => linear.attach(cref, trail, watches, counting_ratio),
            ConstraintBody::Clause(clause) => clause.attach(cref, watches),
            ConstraintBody::Cardinality(cardinality) => cardinality.attach(cref, watches),
        )
    }

    /// Checks the constraint against the full assignment when it is attached, propagating what it
    /// implies. Returns whether it is falsified.
    pub(crate) fn propagate_on_attach(&self, cref: CRef, trail: &mut Trail) -> bool {
        let (lits, degree) = match self {
            ConstraintBody::Clause(clause) => (clause.lits(), 1),
            ConstraintBody::Cardinality(cardinality) => (cardinality.lits(), cardinality.degree),
            _ => {
                return match_body!(self,
                    linear linear => linear.propagate_on_attach(cref, trail),
                    _ => unreachable!(),
                )
            }
        };

        let num_non_false = lits.iter().filter(|&&lit| !trail.is_false(lit)).count();
        if num_non_false < degree {
            return true;
        }
        if num_non_false == degree {
            for &lit in lits {
                if trail.is_unknown(lit) {
                    trail.enqueue(lit, cref);
                }
            }
        }
        false
    }

    pub(crate) fn on_falsified(
        &mut self,
        watch: Watch,
        falsified: Lit,
        trail: &mut Trail,
        watches: &mut Watches,
        bookkeeping_only: bool,
    ) -> WatchOutcome {
        match (self, watch.kind) {
            (_, WatchKind::Binary(other)) => {
                if bookkeeping_only || trail.is_true(other) {
                    WatchOutcome::Keep
                } else if trail.is_false(other) {
                    WatchOutcome::Conflict
                } else {
                    trail.enqueue(other, watch.cref);
                    WatchOutcome::Keep
                }
            }
            (ConstraintBody::Clause(clause), WatchKind::Clause(blocker)) => {
                if bookkeeping_only || trail.is_true(blocker) {
                    WatchOutcome::Keep
                } else {
                    clause.on_falsified(falsified, watch.cref, trail, watches)
                }
            }
            (ConstraintBody::Cardinality(cardinality), WatchKind::Cardinality) => {
                if bookkeeping_only {
                    WatchOutcome::Keep
                } else {
                    cardinality.on_falsified(falsified, watch.cref, trail, watches)
                }
            }
            (body, WatchKind::Linear(index)) => match_body!(body,
                linear linear => linear.on_falsified(
                    index as usize,
                    watch.cref,
                    trail,
                    watches,
                    bookkeeping_only,
                ),
                _ => unreachable!("linear watch on a non-linear constraint"),
            ),
            (_, kind) => unreachable!("watch {kind:?} does not match its constraint"),
        }
    }

    pub(crate) fn on_unfalsified(&mut self, watch: Watch) {
        if let WatchKind::Linear(index) = watch.kind {
            match_body!(self,
                linear linear => linear.on_unfalsified(index as usize),
                _ => {},
            );
        }
    }
}
