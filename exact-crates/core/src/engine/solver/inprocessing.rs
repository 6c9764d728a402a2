//! Maintenance at the root between two searches: failed literal probing with detection of
//! implications and equalities, fixing of dominated literals, removal of root-assigned literals
//! from the database, database reduction and garbage collection.
use log::debug;
use log::trace;

use super::Solver;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::basic_types::Var;
use crate::constraints::ConstrSimple;
use crate::containers::HashSet;
use crate::containers::DenseKey;
use crate::engine::termination::TerminationCondition;
use crate::exact_assert_simple;
use crate::proof::ProofId;

impl Solver {
    pub(super) fn inprocess(&mut self, termination: &mut impl TerminationCondition) {
        exact_assert_simple!(self.trail.decision_level() == 0);
        self.statistics.engine.num_inprocessing_rounds += 1;
        self.next_inprocessing =
            self.statistics.engine.num_conflicts + self.inprocessing_interval as u64;
        self.inprocessing_interval *= self.inprocessing_options.growth_factor;

        if !self.propagate_at_root() {
            return;
        }
        if self.inprocessing_options.probing {
            self.probe(termination);
            if self.is_unsat {
                return;
            }
        }
        if self.inprocessing_options.dominance {
            self.fix_dominated_literals();
            if !self.propagate_at_root() {
                return;
            }
        }
        self.simplify_at_root();

        if self.learned_constraints.should_reduce() {
            self.reduce_database();
        }
        if self.database.num_removed() as f64
            > self.inprocessing_options.gc_wasted_ratio * self.database.arena_len() as f64
        {
            self.garbage_collect();
        }
        debug!(
            "Inprocessing round {}: {} root literals, {} implications, {} equalities",
            self.statistics.engine.num_inprocessing_rounds,
            self.trail.len(),
            self.implications.len(),
            self.equalities.num_merged()
        );
    }

    /// Probes both polarities of a bounded number of variables, continuing where the previous
    /// round stopped.
    fn probe(&mut self, termination: &mut impl TerminationCondition) {
        let budget = self.inprocessing_options.probing_limit.min(self.num_vars);
        for _ in 0..budget {
            if self.is_unsat || termination.should_stop() {
                return;
            }
            self.probing_cursor = self.probing_cursor % self.num_vars + 1;
            let var = Var::from_index(self.probing_cursor);
            if !self.trail.is_unknown(var.positive()) || !self.equalities.is_canonical(var.positive())
            {
                continue;
            }
            self.statistics.inprocessing.num_probed += 1;

            let Some(positive) = self.probe_lit(var.positive()) else {
                continue;
            };
            let Some(negative) = self.probe_lit(var.negative()) else {
                continue;
            };
            self.learn_from_probes(var, &positive, &negative);
        }
    }

    /// Decides `lit` and propagates. Returns the implied literals, or `None` when `lit` failed,
    /// in which case its negation was added as a unit.
    fn probe_lit(&mut self, lit: Lit) -> Option<Vec<Lit>> {
        self.decide(lit);
        let conflict = self.propagate();
        let implied = self.trail.lits()[self.trail.level_start(1) + 1..].to_vec();
        self.backjump(0);

        if conflict.is_some() {
            trace!("Failed literal {lit}");
            self.statistics.inprocessing.num_probing_units += 1;
            let mut ce = self
                .pools
                .take_from_simple(&ConstrSimple::<i32>::clause([!lit]), Origin::Probing);
            let _ = ce.log_as_rup(&mut self.proof_log);
            let _ = self.attach(ce, Origin::Probing, 1, false);
            let _ = self.propagate_at_root();
            return None;
        }
        Some(implied)
    }

    fn learn_from_probes(&mut self, var: Var, positive: &[Lit], negative: &[Lit]) {
        let x = var.positive();
        let implied_by_negative = negative.iter().copied().collect::<HashSet<_>>();
        let mut merged = false;

        for &lit in positive {
            if self.is_unsat || !self.trail.is_unknown(lit) {
                continue;
            }
            if implied_by_negative.contains(&lit) {
                self.add_unit_implied_by_both(x, lit);
            } else if !merged && implied_by_negative.contains(&!lit) {
                merged = self.merge_equal(x, lit);
            }
        }
        if self.is_unsat {
            return;
        }

        for (from, implied) in [(x, positive), (!x, negative)] {
            if !self.trail.is_unknown(from) {
                continue;
            }
            for &lit in implied {
                if !self.trail.is_unknown(lit) {
                    continue;
                }
                let clause_id = self.log_implication(from, lit);
                let _ = self.implications.add(!lit, !from, clause_id);
                if self.implications.add(from, lit, clause_id) {
                    self.statistics.inprocessing.num_implications += 1;
                }
            }
        }
    }

    /// Writes the clause `~from + to >= 1`, which unit propagation proves.
    fn log_implication(&mut self, from: Lit, to: Lit) -> ProofId {
        self.proof_log
            .log_rup(ConstrSimple::<i32>::clause([!from, to]))
    }

    /// `lit` follows from both `x` and `~x`, so it holds at the root.
    fn add_unit_implied_by_both(&mut self, x: Lit, lit: Lit) {
        let positive_id = self.log_implication(x, lit);
        let negative_id = self.log_implication(!x, lit);

        let mut ce = self
            .pools
            .take_from_simple(&ConstrSimple::<i32>::clause([!x, lit]), Origin::Probing);
        ce.set_proof_id(positive_id);
        // ~x + lit >= 1 and x + lit >= 1 sum to 2 lit >= 1
        ce.substitute(!x, lit, negative_id);
        let _ = ce.saturate();

        trace!("{lit} is implied by both {x} and {}", !x);
        self.statistics.inprocessing.num_probing_units += 1;
        let _ = self.attach(ce, Origin::Probing, 1, false);
        let _ = self.propagate_at_root();
    }

    /// `x` implies `lit` and `~x` implies `~lit`, so both are equal. The variable which is not
    /// frozen is replaced by the other. Returns whether the equality was recorded.
    fn merge_equal(&mut self, x: Lit, lit: Lit) -> bool {
        if lit.var() == x.var() || !self.equalities.is_canonical(lit) {
            return false;
        }
        let (replaced, representative) = if !self.frozen[x.var()] {
            (x, lit)
        } else if !self.frozen[lit.var()] {
            (lit, x)
        } else {
            return false;
        };

        // ~replaced + representative >= 1 and replaced + ~representative >= 1
        let forward = self.log_implication(replaced, representative);
        let backward = self.log_implication(!replaced, !representative);
        for (clause, id) in [
            ([!replaced, representative], forward),
            ([replaced, !representative], backward),
        ] {
            let mut ce = self
                .pools
                .take_from_simple(&ConstrSimple::<i32>::clause(clause), Origin::Equality);
            ce.set_proof_id(id);
            let _ = self.attach(ce, Origin::Equality, 2, true);
        }
        self.equalities
            .merge(replaced, representative, forward, backward);

        trace!("{replaced} is equal to {representative}");
        self.statistics.inprocessing.num_equalities += 1;
        true
    }

    /// Fixes every literal whose negation occurs in no constraint. Setting such a literal to
    /// true can only satisfy more constraints, so some optimal solution has it true.
    fn fix_dominated_literals(&mut self) {
        for var in (1..=self.num_vars).map(Var::from_index) {
            if self.frozen[var] || !self.trail.is_unknown(var.positive()) {
                continue;
            }
            let Some(lit) = [var.negative(), var.positive()]
                .into_iter()
                .find(|&lit| self.database.occurrences(!lit).is_empty())
            else {
                continue;
            };

            let id = self
                .proof_log
                .log_redundant(ConstrSimple::<i32>::clause([lit]), &[lit]);
            let mut ce = self
                .pools
                .take_from_simple(&ConstrSimple::<i32>::clause([lit]), Origin::Dominance);
            ce.set_proof_id(id);
            let _ = self.attach(ce, Origin::Dominance, 1, true);
            self.statistics.inprocessing.num_dominance_units += 1;
        }
    }

    /// Replaces every stored constraint which mentions a root-assigned literal by a copy without
    /// it, or drops it when the root assignment satisfies it.
    fn simplify_at_root(&mut self) {
        if self.trail.len() == self.root_len_at_simplification {
            return;
        }
        self.root_len_at_simplification = self.trail.len();
        self.implications.remove_fixed(&self.trail);

        let candidates = self
            .database
            .live()
            .filter(|&cref| {
                self.database
                    .lits(cref)
                    .iter()
                    .any(|&lit| self.trail.assignment_level(lit) == 0)
            })
            .collect::<Vec<_>>();

        for cref in candidates {
            let header = self.database.header(cref).clone();
            let ce = self.database.to_ce(cref, &self.pools);
            let attached = self.attach(ce, header.origin, header.lbd, header.locked);
            self.database.remove(cref, &mut self.proof_log);
            if let Some(simplified) = attached.cref {
                if let Some(external_id) = header.external_id {
                    self.database.set_external(simplified, external_id);
                }
                self.learned_constraints.replace(cref, simplified);
            }
            self.statistics.inprocessing.num_root_simplified += 1;
        }
        self.learned_constraints.forget_removed(&self.database);
    }

    fn garbage_collect(&mut self) {
        self.statistics.engine.num_garbage_collections += 1;
        let relocation = self.database.garbage_collect(&mut self.trail);
        self.learned_constraints.relocate(&relocation);
    }
}

#[cfg(test)]
mod tests {
    use crate::basic_types::Lit;
    use crate::basic_types::Origin;
    use crate::basic_types::SolveState;
    use crate::constraints::ConstrSimple;
    use crate::engine::termination::Indefinite;
    use crate::engine::Solver;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    fn solver_with_clauses(num_vars: usize, clauses: &[&[i32]]) -> Solver {
        let mut solver = Solver::default();
        let _ = solver.new_variables(num_vars);
        for clause in clauses {
            let _ = solver.add_constraint(
                &ConstrSimple::<i32>::clause(clause.iter().map(|&code| lit(code))),
                Origin::Formula,
            );
        }
        solver
    }

    #[test]
    fn failed_literals_become_units() {
        // x1 implies both x2 and ~x2
        let mut solver = solver_with_clauses(3, &[&[-1, 2], &[-1, -2], &[1, 3], &[-3, 2, 1]]);
        solver.probe(&mut Indefinite);
        assert_eq!(solver.root_value(lit(1)), Some(false));
        assert_eq!(solver.root_value(lit(3)), Some(true));
    }

    #[test]
    fn literals_implied_by_both_polarities_become_units() {
        let mut solver = solver_with_clauses(3, &[&[-1, 2], &[1, 3], &[-3, 2]]);
        solver.probe(&mut Indefinite);
        assert_eq!(solver.root_value(lit(2)), Some(true));
    }

    #[test]
    fn equal_literals_are_merged() {
        // x1 = ~x2, with x3 keeping both in use
        let mut solver = solver_with_clauses(3, &[&[-1, -2], &[1, 2], &[1, 3], &[2, -3]]);
        solver.probe(&mut Indefinite);
        assert_eq!(solver.equalities.num_merged(), 1);
        assert_eq!(
            solver.equalities.representative(lit(1)),
            !solver.equalities.representative(lit(2))
        );

        // a constraint over the replaced variable is rewritten onto its representative
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(1), lit(3)]), Origin::Formula);
        assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
        let solution = solver.last_solution().expect("the formula is satisfiable");
        assert_ne!(solution.is_true(lit(1)), solution.is_true(lit(2)));
    }

    #[test]
    fn dominated_literals_are_fixed_unless_frozen() {
        let mut solver = solver_with_clauses(3, &[&[1, 2], &[1, -3]]);
        solver.freeze(lit(2).var());
        solver.fix_dominated_literals();
        assert!(solver.propagate_at_root());

        // ~x1 occurs nowhere, x2 is frozen and ~x3 only occurs positively
        assert_eq!(solver.root_value(lit(1)), Some(true));
        assert_eq!(solver.root_value(lit(2)), None);
        assert_eq!(solver.root_value(lit(3)), Some(false));
    }

    #[test]
    fn later_constraints_can_still_use_literals_which_occur_in_one_polarity() {
        // ~x3 occurs nowhere until the constraints added after inprocessing need it
        let mut solver = solver_with_clauses(3, &[&[1, 2], &[1, 3]]);
        assert!(!solver.inprocessing_options.dominance);
        solver.inprocess(&mut Indefinite);
        assert_eq!(solver.root_value(lit(3)), None);

        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(-3)]), Origin::Formula);
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(-2)]), Origin::Formula);
        assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
        let solution = solver.last_solution().expect("x1 satisfies every clause");
        assert!(solution.is_true(lit(1)));
    }

    #[test]
    fn root_simplification_and_garbage_collection_keep_the_database_usable() {
        let mut solver = solver_with_clauses(4, &[&[1, 2, 3], &[-1, 3, 4], &[2, -4]]);
        let (id, _) = solver.add_constraint(
            &ConstrSimple::new([(2_i32, lit(2)), (1, lit(3)), (1, lit(4))], 2),
            Origin::Formula,
        );
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([lit(1)]), Origin::Formula);
        assert!(solver.propagate_at_root());

        solver.simplify_at_root();
        assert!(solver.database.num_removed() > 0);
        solver.garbage_collect();
        assert_eq!(solver.database.num_removed(), 0);
        assert!(solver.database.slacks_are_consistent(&solver.trail));

        assert!(solver.remove_constraint(id));
        assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
        let solution = solver.last_solution().expect("the formula is satisfiable");
        assert!(solution.is_true(lit(1)));
        assert!(solution.is_true(lit(3)) || solution.is_true(lit(4)));
    }
}
