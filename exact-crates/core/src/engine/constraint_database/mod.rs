//! The arena of stored constraints together with the structures that refer into it: the watch
//! lists, the per-literal occurrence index and the map of externally visible IDs.
//!
//! Constraints are addressed by [`CRef`]s. Removal only marks a constraint; the arena is compacted
//! by [`ConstraintDatabase::garbage_collect`], which returns the relocation map so that the
//! holders outside the database can be updated as well.
mod linear;
mod stored_constraint;
mod watch;

use enum_map::EnumMap;
use log::debug;
pub(crate) use linear::*;
pub(crate) use stored_constraint::*;
pub(crate) use watch::*;

use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::basic_types::Var;
use crate::constraints::AnyCe;
use crate::constraints::ConstrExpPools;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;
use crate::engine::Trail;
use crate::exact_assert_moderate;
use crate::exact_assert_simple;
use crate::proof::ProofId;
use crate::proof::ProofLog;

#[derive(Clone, Debug)]
pub(crate) struct StoredConstraint {
    pub(crate) header: ConstraintHeader,
    pub(crate) body: ConstraintBody,
}

#[derive(Debug, Default)]
pub(crate) struct ConstraintDatabase {
    constraints: KeyedVec<CRef, StoredConstraint>,
    watches: Watches,
    /// The constraints in which a literal occurs
    occurrences: KeyedVec<Lit, HashSet<CRef>>,
    external: HashMap<ProofId, CRef>,
    /// The number of live constraints per origin
    counts: EnumMap<Origin, usize>,
    num_removed: usize,
}

impl ConstraintDatabase {
    pub(crate) fn grow(&mut self, num_vars: usize) {
        self.watches.grow(num_vars);
        self.occurrences.grow_to_include(
            Var::from_index(num_vars).negative(),
            HashSet::default(),
        );
    }

    #[cfg(test)]
    pub(crate) fn get(&self, cref: CRef) -> &StoredConstraint {
        &self.constraints[cref]
    }

    pub(crate) fn header(&self, cref: CRef) -> &ConstraintHeader {
        &self.constraints[cref].header
    }

    pub(crate) fn header_mut(&mut self, cref: CRef) -> &mut ConstraintHeader {
        &mut self.constraints[cref].header
    }

    pub(crate) fn lits(&self, cref: CRef) -> &[Lit] {
        self.constraints[cref].body.lits()
    }

    /// The references of all constraints which have not been removed.
    pub(crate) fn live(&self) -> impl Iterator<Item = CRef> + '_ {
        self.constraints
            .keys()
            .filter(|&cref| !self.constraints[cref].header.removed)
    }

    /// The size of the arena, including removed constraints.
    pub(crate) fn arena_len(&self) -> usize {
        self.constraints.len()
    }

    pub(crate) fn num_removed(&self) -> usize {
        self.num_removed
    }

    pub(crate) fn count(&self, origin: Origin) -> usize {
        self.counts[origin]
    }

    pub(crate) fn occurrences(&self, lit: Lit) -> &HashSet<CRef> {
        &self.occurrences[lit]
    }

    #[cfg(test)]
    pub(crate) fn watches(&self, lit: Lit) -> &[Watch] {
        self.watches.get(lit)
    }

    pub(crate) fn lookup_external(&self, id: ProofId) -> Option<CRef> {
        self.external.get(&id).copied()
    }

    pub(crate) fn set_external(&mut self, cref: CRef, id: ProofId) {
        self.constraints[cref].header.external_id = Some(id);
        let _ = self.external.insert(id, cref);
    }

    /// Stores `ce`, which must be saturated, free of root-assigned literals and non-trivial, and
    /// registers its watches.
    ///
    /// The cheapest adequate representation is chosen: a clause when every coefficient equals
    /// the degree, a cardinality constraint when all coefficients are equal, and otherwise a
    /// linear constraint of the width of `ce`.
    pub(crate) fn store(
        &mut self,
        ce: &AnyCe,
        header: ConstraintHeader,
        trail: &Trail,
        counting_ratio: f64,
    ) -> CRef {
        exact_assert_simple!(!ce.is_empty() && !ce.is_trivial());

        let mut body = if ce.is_clause() {
            ConstraintBody::clause(ce.lits())
        } else if ce.is_cardinality() {
            ConstraintBody::cardinality(ce.lits(), ce.cardinality_degree())
        } else {
            match ce {
                AnyCe::Ce32(ce) => ConstraintBody::Linear32(Linear::new(ce)),
                AnyCe::Ce64(ce) => ConstraintBody::Linear64(Linear::new(ce)),
                AnyCe::Ce96(ce) => ConstraintBody::Linear96(Linear::new(ce)),
                AnyCe::Ce128(ce) => ConstraintBody::Linear128(Linear::new(ce)),
                AnyCe::CeArb(ce) => ConstraintBody::LinearArb(Linear::new(ce)),
            }
        };
        body.sort_for_watching(trail);

        let origin = header.origin;
        let cref = CRef::from_index(self.constraints.len());
        body.attach(cref, trail, &mut self.watches, counting_ratio);
        let _ = self.constraints.push(StoredConstraint { header, body });

        for &lit in self.constraints[cref].body.lits() {
            let _ = self.occurrences[lit].insert(cref);
        }
        self.counts[origin] += 1;
        cref
    }

    /// Propagates a freshly stored constraint under the full current assignment. Returns whether
    /// it is falsified.
    pub(crate) fn propagate_on_attach(&self, cref: CRef, trail: &mut Trail) -> bool {
        self.constraints[cref].body.propagate_on_attach(cref, trail)
    }

    /// Marks the constraint as removed. Its watches are dropped lazily.
    pub(crate) fn remove(&mut self, cref: CRef, proof_log: &mut ProofLog) {
        let constraint = &mut self.constraints[cref];
        if constraint.header.removed {
            return;
        }
        constraint.header.removed = true;
        proof_log.log_deletion(constraint.header.id);

        self.counts[constraint.header.origin] -= 1;
        self.num_removed += 1;
        if let Some(id) = constraint.header.external_id {
            let _ = self.external.remove(&id);
        }
        for &lit in constraint.body.lits() {
            let _ = self.occurrences[lit].remove(&cref);
        }
    }

    /// Whether the constraint is the reason of a literal on the trail.
    pub(crate) fn is_reason(&self, cref: CRef, trail: &Trail) -> bool {
        self.lits(cref)
            .iter()
            .any(|&lit| trail.is_true(lit) && trail.reason(lit.var()) == cref)
    }

    /// Processes the trail from the propagation head until a fixpoint or a conflict.
    ///
    /// When a conflict is found the remaining watches of the falsified literal are still visited
    /// for slack bookkeeping, so that every processed literal is accounted for on backjumping.
    pub(crate) fn propagate(&mut self, trail: &mut Trail) -> Option<CRef> {
        while trail.propagation_head < trail.len() {
            let falsified = !trail.lit_at(trail.propagation_head);
            let mut list = self.watches.take(falsified);

            let mut conflict = None;
            let mut kept = 0;
            for position in 0..list.len() {
                let watch = list[position];
                let constraint = &mut self.constraints[watch.cref];
                if constraint.header.removed {
                    continue;
                }
                let outcome = constraint.body.on_falsified(
                    watch,
                    falsified,
                    trail,
                    &mut self.watches,
                    conflict.is_some(),
                );
                match outcome {
                    WatchOutcome::Drop => {}
                    WatchOutcome::Keep => {
                        list[kept] = watch;
                        kept += 1;
                    }
                    WatchOutcome::Conflict => {
                        list[kept] = watch;
                        kept += 1;
                        conflict = Some(watch.cref);
                    }
                }
            }
            list.truncate(kept);
            self.watches.put_back(falsified, list);

            trail.propagation_head += 1;
            if conflict.is_some() {
                return conflict;
            }
        }
        None
    }

    /// Restores the slack bookkeeping of the constraints watching `falsified`, whose negation is
    /// being removed from the trail after having been processed.
    pub(crate) fn undo_falsified(&mut self, falsified: Lit) {
        let ConstraintDatabase {
            constraints,
            watches,
            ..
        } = self;
        for &watch in watches.get(falsified) {
            if let WatchKind::Linear(_) = watch.kind {
                let constraint = &mut constraints[watch.cref];
                if !constraint.header.removed {
                    constraint.body.on_unfalsified(watch);
                }
            }
        }
    }

    /// Expands a stored constraint into an expression, with the proof derivation starting from
    /// its ID.
    pub(crate) fn to_ce(&self, cref: CRef, pools: &ConstrExpPools) -> AnyCe {
        let constraint = &self.constraints[cref];
        let mut ce = match &constraint.body {
            ConstraintBody::Clause(clause) => {
                let mut ce = pools.ce32.take();
                for &lit in clause.lits() {
                    ce.add_lhs(&1, lit);
                }
                ce.add_rhs(&1);
                AnyCe::Ce32(ce)
            }
            ConstraintBody::Cardinality(cardinality) => {
                let mut ce = pools.ce32.take();
                for &lit in cardinality.lits() {
                    ce.add_lhs(&1, lit);
                }
                ce.add_rhs(&(cardinality.degree() as i64));
                AnyCe::Ce32(ce)
            }
            ConstraintBody::Linear32(linear) => {
                let mut ce = pools.ce32.take();
                linear.copy_into(&mut ce);
                AnyCe::Ce32(ce)
            }
            ConstraintBody::Linear64(linear) => {
                let mut ce = pools.ce64.take();
                linear.copy_into(&mut ce);
                AnyCe::Ce64(ce)
            }
            ConstraintBody::Linear96(linear) => {
                let mut ce = pools.ce96.take();
                linear.copy_into(&mut ce);
                AnyCe::Ce96(ce)
            }
            ConstraintBody::Linear128(linear) => {
                let mut ce = pools.ce128.take();
                linear.copy_into(&mut ce);
                AnyCe::Ce128(ce)
            }
            ConstraintBody::LinearArb(linear) => {
                let mut ce = pools.ce_arb.take();
                linear.copy_into(&mut ce);
                AnyCe::CeArb(ce)
            }
        };
        ce.set_origin(constraint.header.origin);
        ce.set_proof_id(constraint.header.id);
        ce
    }

    /// Compacts the arena. Must be called at the root, where no literal needs a reason.
    ///
    /// Returns the map from old to new references; removed constraints map to
    /// [`CRef::UNDEF`].
    pub(crate) fn garbage_collect(&mut self, trail: &mut Trail) -> KeyedVec<CRef, CRef> {
        exact_assert_simple!(trail.decision_level() == 0);
        debug!(
            "Garbage collection: {} of {} constraints were removed",
            self.num_removed,
            self.constraints.len()
        );

        let mut relocation = KeyedVec::default();
        let mut compacted = KeyedVec::default();
        for constraint in std::mem::take(&mut self.constraints).into_values() {
            if constraint.header.removed {
                let _ = relocation.push(CRef::UNDEF);
            } else {
                let _ = relocation.push(compacted.push(constraint));
            }
        }
        self.constraints = compacted;
        self.num_removed = 0;

        self.watches.retain(|watch| {
            let relocated = relocation[watch.cref];
            watch.cref = relocated;
            !relocated.is_undef()
        });

        let root_vars = trail.lits().iter().map(|lit| lit.var()).collect::<Vec<_>>();
        for var in root_vars {
            trail.set_reason(var, CRef::UNDEF);
        }

        for set in self.occurrences.iter_mut() {
            set.clear();
        }
        for cref in self.constraints.keys() {
            for &lit in self.constraints[cref].body.lits() {
                let _ = self.occurrences[lit].insert(cref);
            }
        }

        for cref in self.external.values_mut() {
            *cref = relocation[*cref];
            exact_assert_moderate!(!cref.is_undef());
        }

        relocation
    }

    /// Checks that the incrementally maintained slacks match a recomputation.
    #[cfg(test)]
    pub(crate) fn slacks_are_consistent(&self, trail: &Trail) -> bool {
        self.live().all(|cref| {
            match_body!(&self.constraints[cref].body,
                linear linear => *linear.tracked_slack() == linear.expected_tracked_slack(trail),
                _ => true,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Origin;
    use crate::constraints::ConstrSimple;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    struct Fixture {
        database: ConstraintDatabase,
        trail: Trail,
        pools: ConstrExpPools,
        proof: ProofLog,
    }

    impl Fixture {
        fn new(num_vars: usize) -> Fixture {
            let mut database = ConstraintDatabase::default();
            database.grow(num_vars);
            let mut trail = Trail::default();
            trail.grow(num_vars);
            let pools = ConstrExpPools::default();
            pools.resize(num_vars);
            Fixture {
                database,
                trail,
                pools,
                proof: ProofLog::default(),
            }
        }

        fn add(&mut self, constraint: ConstrSimple<i64>, counting_ratio: f64) -> (CRef, bool) {
            let mut ce = self.pools.take_from_simple(&constraint, Origin::Formula);
            let _ = ce.saturate();
            let header = ConstraintHeader::new(ProofId::UNDEF, Origin::Formula, 0, true);
            let cref = self
                .database
                .store(&ce, header, &self.trail, counting_ratio);
            let conflict = self.database.propagate_on_attach(cref, &mut self.trail);
            (cref, conflict)
        }

        fn decide(&mut self, lit: Lit) -> Option<CRef> {
            self.trail.new_level();
            self.trail.enqueue(lit, CRef::UNDEF);
            self.database.propagate(&mut self.trail)
        }

        fn backjump_to(&mut self, level: u32) {
            while self.trail.decision_level() > level {
                let Some(lit) = self.trail.last() else {
                    break;
                };
                if self.trail.position(lit.var()) < self.trail.propagation_head {
                    self.database.undo_falsified(!lit);
                }
                let _ = self.trail.pop();
            }
        }
    }

    #[test]
    fn representations_are_chosen_by_shape() {
        let mut fixture = Fixture::new(4);
        let (clause, _) = fixture.add(ConstrSimple::clause([lit(1), lit(2), lit(3)]), 0.7);
        let (card, _) = fixture.add(ConstrSimple::at_least([lit(1), lit(2), lit(3)], 2), 0.7);
        let (linear, _) = fixture.add(
            ConstrSimple::new([(3, lit(1)), (2, lit(2)), (1, lit(3))], 3),
            0.7,
        );

        assert!(matches!(fixture.database.get(clause).body, ConstraintBody::Clause(_)));
        assert!(matches!(
            fixture.database.get(card).body,
            ConstraintBody::Cardinality(_)
        ));
        assert!(matches!(
            fixture.database.get(linear).body,
            ConstraintBody::Linear32(_)
        ));
        assert_eq!(fixture.database.count(Origin::Formula), 3);
        assert_eq!(fixture.database.occurrences(lit(2)).len(), 3);
    }

    #[test]
    fn cardinality_propagates_after_enough_falsifications() {
        let mut fixture = Fixture::new(3);
        let _ = fixture.add(ConstrSimple::at_least([lit(1), lit(2), lit(3)], 2), 0.7);

        assert_eq!(fixture.decide(lit(-1)), None);
        assert!(fixture.trail.is_true(lit(2)));
        assert!(fixture.trail.is_true(lit(3)));
    }

    #[test]
    fn counting_and_watched_propagation_agree() {
        for counting_ratio in [0.0, 1.1] {
            let mut fixture = Fixture::new(5);
            let (cref, _) = fixture.add(
                ConstrSimple::new(
                    [(5, lit(1)), (4, lit(2)), (3, lit(3)), (2, lit(4)), (1, lit(5))],
                    8,
                ),
                counting_ratio,
            );
            match &fixture.database.get(cref).body {
                ConstraintBody::Linear32(linear) => {
                    assert_eq!(linear.is_counting(), counting_ratio == 0.0)
                }
                other => panic!("unexpected representation {other:?}"),
            }

            assert_eq!(fixture.decide(lit(-2)), None);
            // slack 15 - 4 - 8 = 3: x1 is propagated
            assert!(fixture.trail.is_true(lit(1)));
            assert!(fixture.trail.is_unknown(lit(3)));
            assert!(fixture.database.slacks_are_consistent(&fixture.trail));

            assert_eq!(fixture.decide(lit(-5)), None);
            // slack 2: x3 is propagated
            assert!(fixture.trail.is_true(lit(3)));
            assert!(fixture.trail.is_unknown(lit(4)));

            assert_eq!(fixture.decide(lit(-4)), Some(cref));

            fixture.backjump_to(1);
            assert!(fixture.trail.is_unknown(lit(3)));
            assert!(fixture.database.slacks_are_consistent(&fixture.trail));
            fixture.backjump_to(0);
            assert!(fixture.database.slacks_are_consistent(&fixture.trail));
        }
    }

    #[test]
    fn conflicting_constraint_is_detected_at_attach() {
        let mut fixture = Fixture::new(2);
        assert_eq!(fixture.decide(lit(-1)), None);
        let _ = fixture.decide(lit(-2));

        let (_, conflict) = fixture.add(ConstrSimple::clause([lit(1), lit(2)]), 0.7);
        assert!(conflict);
    }

    #[test]
    fn garbage_collection_relocates_watches() {
        let mut fixture = Fixture::new(3);
        let (first, _) = fixture.add(ConstrSimple::clause([lit(1), lit(2), lit(3)]), 0.7);
        let (second, _) = fixture.add(ConstrSimple::clause([lit(-1), lit(2), lit(3)]), 0.7);

        fixture.database.remove(first, &mut fixture.proof);
        let relocation = fixture.database.garbage_collect(&mut fixture.trail);

        assert!(relocation[first].is_undef());
        let moved = relocation[second];
        assert_eq!(fixture.database.arena_len(), 1);
        assert_eq!(fixture.database.lits(moved).len(), 3);
        assert!(fixture
            .database
            .watches(lit(-1))
            .iter()
            .chain(fixture.database.watches(lit(2)))
            .all(|watch| watch.cref == moved));

        assert_eq!(fixture.decide(lit(1)), None);
        assert_eq!(fixture.decide(lit(-2)), None);
        assert!(fixture.trail.is_true(lit(3)));
        assert_eq!(fixture.trail.reason(Var::new(3)), moved);
    }
}
