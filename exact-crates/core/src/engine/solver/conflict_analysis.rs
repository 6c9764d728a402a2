//! Learning from conflicts by generalised resolution, and extracting cores under assumptions.
//!
//! Analysis walks the trail from the top and resolves the conflict with the reasons of the
//! literals it falsifies until the result is asserting at a lower level. The learned constraint
//! is then minimised, made to fit the configured coefficient width and attached after
//! backjumping to its assertion level, where it propagates.
use log::debug;
use log::trace;

use super::Solver;
use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::constraints::AnyCe;
use crate::constraints::AssertionStatus;
use crate::engine::UNASSIGNED;
use crate::exact_assert_moderate;
use crate::exact_assert_simple;

impl Solver {
    /// Derives an asserting constraint from `conflict`, backjumps to its assertion level and
    /// attaches it.
    pub(super) fn analyze(&mut self, conflict: CRef) {
        let options = self.conflict_analysis_options;
        let level = self.trail.decision_level();
        exact_assert_simple!(level > 0);

        self.learned_constraints
            .on_conflict_participation(conflict, &mut self.database, &self.trail);
        let mut learned = self.database.to_ce(conflict, &self.pools);
        learned.set_origin(Origin::Learned);
        learned.remove_units(&self.trail);
        let _ = learned.saturate();
        exact_assert_simple!(learned.is_conflicting(&self.trail));

        // Literals are unassigned as the walk passes them, so that a literal falsified later on
        // the trail counts as unassigned when a reason is reduced and cannot re-enter the conflict.
        while learned.assertion_status(&self.trail, level) == AssertionStatus::NonAsserting {
            exact_assert_simple!(
                self.trail.len() > self.trail.level_start(level),
                "the decision of the conflict level makes the conflict asserting"
            );
            let Some(lit) = self.trail.last() else {
                break;
            };
            if learned.contains_lit(!lit) {
                self.resolve_conflict_on(&mut learned, lit);
            }
            self.undo_one();
        }

        learned.remove_units(&self.trail);
        let _ = learned.saturate();

        let assertion_level = self.assertion_level_of(&learned, level);
        if options.minimisation {
            self.minimise(&mut learned, assertion_level);
        }
        let asserting = self.asserting_lit(&learned, assertion_level);
        let trail = &self.trail;
        let _ = learned.fix_overflow(
            |lit| trail.false_level(lit) <= assertion_level,
            options.bits_learned,
            options.bits_learned,
            asserting,
        );

        let assertion_level = self.assertion_level_of(&learned, level);
        let lbd = learned.lbd(&self.trail);
        for &var in learned.vars() {
            self.variable_selector.bump_activity(var);
        }

        let statistics = &mut self.statistics.conflict_analysis;
        statistics.num_learned += 1;
        if learned.is_clause() {
            statistics.num_learned_clauses += 1;
        } else if learned.is_cardinality() {
            statistics.num_learned_cardinalities += 1;
        }
        statistics.average_learned_lbd.record(lbd as u64);
        statistics.average_learned_size.record(learned.len() as u64);
        trace!("Learned {learned} with LBD {lbd}, backjumping to level {assertion_level}");

        self.backjump(assertion_level);
        if let Some(cref) = self.attach(learned, Origin::Learned, lbd, false).cref {
            self.learned_constraints.add(cref, lbd);
        }
    }

    /// Eliminates `lit`, the top of the trail, from `learned` using its reason.
    fn resolve_conflict_on(&mut self, learned: &mut AnyCe, lit: Lit) {
        let options = self.conflict_analysis_options;
        let reason = self.trail.reason(lit.var());
        exact_assert_simple!(!reason.is_undef());

        self.learned_constraints
            .on_conflict_participation(reason, &mut self.database, &self.trail);
        let reason_ce = self.database.to_ce(reason, &self.pools);

        if options.self_subsumption && learned.subsume_with(&reason_ce, lit, &self.trail) > 0 {
            self.statistics.conflict_analysis.num_self_subsumptions += 1;
            return;
        }

        let promoted = learned.resolve_with(
            reason_ce,
            lit,
            &self.trail,
            options.division_policy,
            options.bits_overflow,
            options.bits_reduced,
            &self.pools,
        );
        self.statistics.conflict_analysis.num_resolutions += 1;
        if promoted {
            self.statistics.conflict_analysis.num_promotions += 1;
        }
    }

    /// The level to backjump to: the smallest level at which `ce` asserts a literal, or else
    /// the smallest level at which it is already falsified.
    fn assertion_level_of(&self, ce: &AnyCe, conflict_level: u32) -> u32 {
        ce.assertion_level(&self.trail).unwrap_or_else(|| {
            (0..conflict_level)
                .find(|&level| {
                    ce.assertion_status(&self.trail, level + 1) != AssertionStatus::NonAsserting
                })
                .unwrap_or(conflict_level - 1)
        })
    }

    /// The literal which `ce` propagates after backjumping to `assertion_level`: the one with the
    /// largest coefficient among those not falsified at that level.
    fn asserting_lit(&self, ce: &AnyCe, assertion_level: u32) -> Option<Lit> {
        ce.lits()
            .into_iter()
            .filter(|&lit| {
                let level = self.trail.false_level(lit);
                level > assertion_level && level != UNASSIGNED
            })
            .max_by_key(|&lit| ce.coef_of_lit_big(lit))
    }

    /// Replaces literals falsified at or below `assertion_level` by a literal they imply, if
    /// that literal already has a saturated coefficient. Such a literal then absorbs the
    /// replaced one, so the constraint gets shorter without losing its assertion.
    fn minimise(&mut self, ce: &mut AnyCe, assertion_level: u32) {
        if self.implications.len() == 0 {
            return;
        }

        for lit in ce.lits() {
            let level = self.trail.false_level(lit);
            if level == 0 || level > assertion_level || !ce.contains_lit(lit) {
                continue;
            }
            let Some((implied, clause_id)) = self
                .implications
                .implied_by(lit)
                .iter()
                .find(|(&implied, _)| ce.is_saturated_lit(implied))
                .map(|(&implied, &clause_id)| (implied, clause_id))
            else {
                continue;
            };

            ce.substitute(lit, implied, clause_id);
            ce.saturate_vars(&[implied.var()]);
            self.statistics.conflict_analysis.num_minimised_literals += 1;
        }
    }

    /// Explains why `falsified`, the next assumption, is false given the assumptions before it.
    ///
    /// The assumptions which were decided are decided again together with `falsified`, without
    /// propagating in between. Propagating then yields a conflict, from which every propagated
    /// literal is resolved away. What remains is a constraint over negated assumptions, which
    /// is stored as the core and learned.
    pub(super) fn extract_core(&mut self, falsified: Lit) {
        self.statistics.engine.num_cores += 1;
        if self.trail.is_false_at_root(falsified) {
            debug!("The assumption {falsified} is false at the root");
            self.last_core = None;
            return;
        }

        let mut decisions = self.trail.decisions();
        decisions.push(falsified);
        self.backjump(0);
        for &decision in &decisions {
            exact_assert_moderate!(self.trail.is_unknown(decision));
            self.decide(decision);
        }
        let first_propagated = self.trail.len();

        let Some(conflict) = self.propagate() else {
            // propagating the earlier assumptions falsified the last one, so this cannot happen
            exact_assert_simple!(false, "re-deciding the assumptions did not conflict");
            return;
        };

        let options = self.conflict_analysis_options;
        let mut core = self.database.to_ce(conflict, &self.pools);
        core.set_origin(Origin::Learned);
        while self.trail.len() > first_propagated {
            let Some(lit) = self.trail.last() else {
                break;
            };
            if core.contains_lit(!lit) {
                let reason = self.trail.reason(lit.var());
                let reason_ce = self.database.to_ce(reason, &self.pools);
                let _ = core.resolve_with(
                    reason_ce,
                    lit,
                    &self.trail,
                    options.division_policy,
                    options.bits_overflow,
                    options.bits_reduced,
                    &self.pools,
                );
            }
            self.undo_one();
        }

        core.remove_units(&self.trail);
        let trail = &self.trail;
        core.weaken_non_falsified(|lit| trail.is_false(lit));
        let _ = core.saturate();
        exact_assert_moderate!(core.is_conflicting(&self.trail));

        self.statistics
            .conflict_analysis
            .average_core_size
            .record(core.len() as u64);
        debug!("Extracted a core over {} assumptions", core.len());
        self.last_core = Some(core.to_simple());

        self.backjump(0);
        let lbd = core.len() as u32;
        if let Some(cref) = self.attach(core, Origin::Learned, lbd, false).cref {
            self.learned_constraints.add(cref, lbd);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::basic_types::Lit;
    use crate::basic_types::Origin;
    use crate::basic_types::SolveState;
    use crate::constraints::ConstrSimple;
    use crate::engine::solver_options::ConflictAnalysisOptions;
    use crate::engine::solver_options::PropagationOptions;
    use crate::engine::termination::Indefinite;
    use crate::engine::DivisionPolicy;
    use crate::engine::Solver;
    use crate::engine::SolverOptions;
    use crate::proof::ProofId;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    #[test]
    fn resolving_two_clauses_learns_the_unit() {
        let mut solver = Solver::default();
        let _ = solver.new_variables(2);
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(1), lit(2)]), Origin::Formula);
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(-1), lit(2)]), Origin::Formula);

        // deciding ~x2 propagates x1, which falsifies ~x1 + x2 >= 1
        solver.decide(lit(-2));
        let conflict = solver.propagate().expect("the second clause is falsified");
        solver.analyze(conflict);

        assert_eq!(solver.trail.decision_level(), 0);
        assert_eq!(solver.root_value(lit(2)), Some(true));
        assert_eq!(solver.statistics.conflict_analysis.num_learned, 1);
    }

    #[test]
    fn slack_bookkeeping_survives_the_search() {
        for counting_ratio in [0.0, 1.0] {
            let mut solver = Solver::with_options(SolverOptions {
                propagation_options: PropagationOptions { counting_ratio },
                ..Default::default()
            })
            .expect("valid options");
            let _ = solver.new_variables(6);
            let constraints = [
                ConstrSimple::new([(3_i32, lit(1)), (2, lit(2)), (2, lit(3)), (1, lit(4))], 4),
                ConstrSimple::new([(2, lit(-1)), (2, lit(-2)), (1, lit(5)), (1, lit(6))], 3),
                ConstrSimple::new([(4, lit(-3)), (3, lit(-4)), (2, lit(-5)), (1, lit(2))], 5),
                ConstrSimple::new([(1, lit(1)), (1, lit(-6)), (2, lit(4)), (2, lit(-2))], 3),
            ];
            for constraint in &constraints {
                let _ = solver.add_constraint(constraint, Origin::Formula);
            }

            let state = solver.satisfy(&mut Indefinite);
            assert!(solver.database.slacks_are_consistent(&solver.trail));
            if state == SolveState::Sat {
                let solution = solver.last_solution().expect("a solution was found");
                assert!(constraints
                    .iter()
                    .all(|constraint| constraint.is_satisfied_by(|lit| solution.is_true(lit))));
            } else {
                assert_eq!(state, SolveState::Unsat);
            }
        }
    }

    #[test]
    fn every_division_policy_proves_infeasibility() {
        for division_policy in [
            DivisionPolicy::RoundToOne,
            DivisionPolicy::SlackPlusOne,
            DivisionPolicy::MinDivisor,
        ] {
            let mut solver = Solver::with_options(SolverOptions {
                conflict_analysis_options: ConflictAnalysisOptions {
                    division_policy,
                    ..Default::default()
                },
                ..Default::default()
            })
            .expect("valid options");
            // the weighted sum is at least 5 and at most 4
            let weights = [3_i32, 2, 2, 1];
            let lits = [lit(1), lit(2), lit(3), lit(4)];
            let _ = solver.add_constraint(
                &ConstrSimple::new(weights.into_iter().zip(lits), 5),
                Origin::Formula,
            );
            let _ = solver.add_constraint(
                &ConstrSimple::new(weights.into_iter().zip(lits.map(|lit| !lit)), 4),
                Origin::Formula,
            );
            assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);
        }
    }

    #[test]
    fn minimisation_drops_literals_implied_by_saturated_ones() {
        let mut solver = Solver::default();
        let _ = solver.new_variables(3);
        let _ = solver.implications.add(lit(-1), lit(2), ProofId::UNDEF);

        let pools = &solver.pools;
        let mut ce = pools.take_from_simple(
            &ConstrSimple::new([(1_i32, lit(-1)), (3, lit(2)), (1, lit(3))], 3),
            Origin::Learned,
        );
        solver.decide(lit(1));
        solver.decide(lit(-3));

        solver.minimise(&mut ce, 1);
        assert!(!ce.contains_lit(lit(-1)));
        assert_eq!(ce.coef_of_lit_big(lit(2)), 3.into());
        assert_eq!(solver.statistics.conflict_analysis.num_minimised_literals, 1);
    }
}
