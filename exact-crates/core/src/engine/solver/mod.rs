//! The conflict-driven search engine.
//!
//! The [`Solver`] owns the trail, the constraint database and the heuristics. It is driven
//! through [`Solver::solve`], which runs the search until something happens that the caller
//! may want to react to (see [`SolveState`]). Conflict analysis and core extraction live in
//! [`conflict_analysis`], the maintenance at the root in [`inprocessing`].
mod conflict_analysis;
mod inprocessing;

use log::debug;
use log::info;
use num::BigInt;

use super::ConstraintDatabase;
use super::ConstraintHeader;
use super::Equalities;
use super::Implications;
use super::LearnedConstraintManager;
use super::RestartStrategy;
use super::SolverOptions;
use super::SolverStatistics;
use super::Trail;
use super::VariableSelector;
use crate::arithmetic::Coefficient;
use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::OptionError;
use crate::basic_types::Origin;
use crate::basic_types::Solution;
use crate::basic_types::SolveState;
use crate::basic_types::Var;
use crate::constraints::AnyCe;
use crate::constraints::ConstrExpPools;
use crate::constraints::ConstrSimple;
use crate::constraints::Width;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;
use crate::engine::solver_options::ConflictAnalysisOptions;
use crate::engine::solver_options::InprocessingOptions;
use crate::engine::solver_options::PropagationOptions;
use crate::engine::termination::TerminationCondition;
use crate::exact_assert_moderate;
use crate::exact_assert_simple;
use crate::proof::ProofId;
use crate::proof::ProofLog;
use crate::statistics::log_statistic_postfix;
use crate::statistics::should_log_statistics;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

/// The outcome of attaching a constraint: the proof line of the processed constraint and, when
/// it was stored, its reference.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Attached {
    pub(crate) id: ProofId,
    pub(crate) cref: Option<CRef>,
}

/// A conflict-driven pseudo-Boolean solver.
///
/// Constraints are added with [`Solver::add_constraint`]; the search is run with
/// [`Solver::solve`] or [`Solver::satisfy`]. Assumptions set with [`Solver::set_assumptions`]
/// are decided before any other literal; when they cannot all hold, the solver reports
/// [`SolveState::Inconsistent`] and provides a core through [`Solver::last_core`].
///
/// # Example
/// ```
/// # use exact_core::ConstrSimple;
/// # use exact_core::Origin;
/// # use exact_core::SolveState;
/// # use exact_core::Solver;
/// # use exact_core::termination::Indefinite;
/// let mut solver = Solver::default();
/// let [x1, x2, x3] = [(); 3].map(|_| solver.new_variable().positive());
///
/// // x1 + x2 + x3 >= 2
/// let _ = solver.add_constraint(&ConstrSimple::at_least([x1, x2, x3], 2), Origin::Formula);
/// // ~x1 >= 1
/// let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x1]), Origin::Formula);
///
/// assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
/// let solution = solver.last_solution().expect("a solution was found");
/// assert!(solution.is_true(x2) && solution.is_true(x3));
/// ```
#[derive(Debug)]
pub struct Solver {
    trail: Trail,
    database: ConstraintDatabase,
    pools: ConstrExpPools,
    variable_selector: VariableSelector,
    restart_strategy: RestartStrategy,
    learned_constraints: LearnedConstraintManager,
    implications: Implications,
    equalities: Equalities,
    conflict_analysis_options: ConflictAnalysisOptions,
    propagation_options: PropagationOptions,
    inprocessing_options: InprocessingOptions,
    proof_log: ProofLog,
    num_vars: usize,
    assumptions: Vec<Lit>,
    /// Variables which must keep both polarities, such as objective and assumption variables
    frozen: KeyedVec<Var, bool>,
    /// Copies of the input constraints, for checking externally produced solutions
    formula: HashMap<ProofId, ConstrSimple<BigInt>>,
    last_solution: Option<Solution>,
    last_core: Option<ConstrSimple<BigInt>>,
    is_unsat: bool,
    /// A constraint found falsified when it was attached, handed to the next propagation
    pending_conflict: Option<CRef>,
    /// The prefix of the root literals for which a unit has been written to the proof
    num_root_units_logged: usize,
    next_inprocessing: u64,
    inprocessing_interval: f64,
    /// The number of root literals at the last root simplification
    root_len_at_simplification: usize,
    probing_cursor: usize,
    statistics: SolverStatistics,
}

impl Default for Solver {
    fn default() -> Self {
        Solver::from_valid_options(SolverOptions::default())
    }
}

impl Solver {
    /// Creates a solver, checking the options first.
    pub fn with_options(options: SolverOptions) -> Result<Solver, OptionError> {
        options.validate()?;
        Ok(Solver::from_valid_options(options))
    }

    fn from_valid_options(options: SolverOptions) -> Solver {
        let pools = ConstrExpPools::default();
        pools.set_proof_logging(options.proof_log.is_enabled());

        let mut solver = Solver {
            trail: Trail::default(),
            database: ConstraintDatabase::default(),
            pools,
            variable_selector: VariableSelector::new(
                options.variable_decay,
                options.random_decision_frequency,
                options.random_generator,
            ),
            restart_strategy: RestartStrategy::new(options.restart_options),
            learned_constraints: LearnedConstraintManager::new(options.learning_options),
            implications: Implications::default(),
            equalities: Equalities::default(),
            conflict_analysis_options: options.conflict_analysis_options,
            propagation_options: options.propagation_options,
            inprocessing_options: options.inprocessing_options,
            proof_log: options.proof_log,
            num_vars: 0,
            assumptions: vec![],
            frozen: KeyedVec::default(),
            formula: HashMap::default(),
            last_solution: None,
            last_core: None,
            is_unsat: false,
            pending_conflict: None,
            num_root_units_logged: 0,
            next_inprocessing: options.inprocessing_options.first_interval,
            inprocessing_interval: options.inprocessing_options.first_interval as f64,
            root_len_at_simplification: 0,
            probing_cursor: 0,
            statistics: SolverStatistics::default(),
        };
        solver.grow_to(0);
        solver
    }

    /// Creates a new variable and returns it.
    pub fn new_variable(&mut self) -> Var {
        self.grow_to(self.num_vars + 1);
        Var::from_index(self.num_vars)
    }

    /// Creates `count` new variables.
    pub fn new_variables(&mut self, count: usize) -> Vec<Var> {
        let first = self.num_vars + 1;
        self.grow_to(self.num_vars + count);
        (first..=self.num_vars).map(Var::from_index).collect()
    }

    pub fn num_variables(&self) -> usize {
        self.num_vars
    }

    fn grow_to(&mut self, num_vars: usize) {
        if num_vars < self.num_vars {
            return;
        }
        self.num_vars = num_vars;
        self.trail.grow(num_vars);
        self.database.grow(num_vars);
        self.pools.resize(num_vars);
        self.variable_selector.grow(num_vars);
        self.implications.grow(num_vars);
        self.equalities.grow(num_vars);
        self.frozen.grow_to_include(Var::from_index(num_vars), false);
    }

    /// Adds a constraint with the given origin. Variables which do not exist yet are created.
    ///
    /// Returns the proof line of the constraint as given, which also identifies it for
    /// [`Solver::remove_constraint`], and the proof line of the constraint as it was stored
    /// after simplification. The latter is [`ProofId::UNSAT`] when the solver became infeasible
    /// and [`ProofId::TRIVIAL`] when the constraint was satisfied at the root.
    pub fn add_constraint<C: Coefficient>(
        &mut self,
        constraint: &ConstrSimple<C>,
        origin: Origin,
    ) -> (ProofId, ProofId) {
        let formula_id = if origin == Origin::Formula {
            self.proof_log.log_formula(constraint)
        } else {
            self.proof_log.log_rup(constraint)
        };
        self.add_logged_constraint(constraint, origin, formula_id)
    }

    /// Adds a constraint which is justified by redundance with respect to `witness`, such as
    /// the definition of a fresh variable.
    pub(crate) fn add_redundant_constraint<C: Coefficient>(
        &mut self,
        constraint: &ConstrSimple<C>,
        witness: &[Lit],
        origin: Origin,
    ) -> (ProofId, ProofId) {
        let formula_id = self.proof_log.log_redundant(constraint, witness);
        self.add_logged_constraint(constraint, origin, formula_id)
    }

    /// Adds a constraint which follows from the postfix `derivation` over earlier proof lines.
    pub(crate) fn add_derived_constraint<C: Coefficient>(
        &mut self,
        constraint: &ConstrSimple<C>,
        derivation: &str,
        origin: Origin,
    ) -> (ProofId, ProofId) {
        let formula_id = self.proof_log.log_derivation(derivation);
        self.add_logged_constraint(constraint, origin, formula_id)
    }

    fn add_logged_constraint<C: Coefficient>(
        &mut self,
        constraint: &ConstrSimple<C>,
        origin: Origin,
        formula_id: ProofId,
    ) -> (ProofId, ProofId) {
        if self.is_unsat {
            return (formula_id, ProofId::UNSAT);
        }
        self.backjump(0);

        let max_var = constraint
            .terms
            .iter()
            .map(|term| term.lit.var().index() as usize)
            .max()
            .unwrap_or(0);
        self.grow_to(max_var);

        if origin == Origin::Formula {
            let _ = self.formula.insert(formula_id, constraint.to_big());
        }

        let mut ce = self.pools.take_from_simple(constraint, origin);
        ce.set_proof_id(formula_id);
        let ce = self.substitute_equalities(ce);

        let lbd = ce.len() as u32;
        let attached = self.attach(ce, origin, lbd, !origin.is_learned());
        if let Some(cref) = attached.cref {
            self.database.set_external(cref, formula_id);
            if origin.is_learned() {
                self.learned_constraints.add(cref, lbd);
            }
        }
        if !self.propagate_at_root() {
            return (formula_id, ProofId::UNSAT);
        }
        (formula_id, attached.id)
    }

    /// Replaces every literal which was merged into an equivalence class by its representative.
    fn substitute_equalities(&self, ce: AnyCe) -> AnyCe {
        if self.equalities.num_merged() == 0
            || ce
                .vars()
                .iter()
                .all(|&var| self.equalities.is_canonical(var.positive()))
        {
            return ce;
        }

        let mut ce = ce.promote_to(Width::Arbitrary, &self.pools);
        for var in ce.vars().to_vec() {
            let mut lit = ce.lit(var);
            while let Some((next, clause_id)) = self.equalities.step(lit) {
                ce.substitute(lit, next, clause_id);
                lit = next;
            }
        }
        ce.into_smallest(&self.pools)
    }

    /// Removes the constraint which was added under the given ID. Returns whether such a
    /// constraint existed.
    pub fn remove_constraint(&mut self, id: ProofId) -> bool {
        let Some(cref) = self.database.lookup_external(id) else {
            return false;
        };
        self.backjump(0);
        let _ = self.formula.remove(&id);
        self.database.remove(cref, &mut self.proof_log);
        if self.database.header(cref).origin.is_learned() {
            self.learned_constraints.forget_removed(&self.database);
        }
        true
    }

    /// Sets the literals which are decided first in every search. They stay in place until
    /// they are replaced or cleared.
    pub fn set_assumptions(&mut self, assumptions: &[Lit]) {
        self.backjump(0);
        if let Some(max_var) = assumptions.iter().map(|lit| lit.var().index()).max() {
            self.grow_to(max_var as usize);
        }
        for lit in assumptions {
            self.freeze(lit.var());
        }
        self.assumptions = assumptions.to_vec();
    }

    pub fn clear_assumptions(&mut self) {
        self.backjump(0);
        self.assumptions.clear();
    }

    pub fn assumptions(&self) -> &[Lit] {
        &self.assumptions
    }

    /// Prevents inprocessing from fixing the variable by dominance or replacing it by an
    /// equivalent literal. With [`InprocessingOptions::dominance`] enabled, variables which later
    /// constraints will mention must be frozen.
    pub fn freeze(&mut self, var: Var) {
        self.grow_to(var.index() as usize);
        self.frozen[var] = true;
    }

    /// Whether the constraint database was found infeasible. This is final.
    pub fn is_unsat(&self) -> bool {
        self.is_unsat
    }

    /// The most recent solution, if any was found.
    pub fn last_solution(&self) -> Option<&Solution> {
        self.last_solution.as_ref()
    }

    /// The core of the most recent [`SolveState::Inconsistent`] result: a constraint over
    /// negated assumptions which the assumptions falsify. `None` means that an assumption is
    /// false at the root.
    pub fn last_core(&self) -> Option<&ConstrSimple<BigInt>> {
        self.last_core.as_ref()
    }

    /// The value of `lit` at the root, if it is fixed there.
    pub fn root_value(&self, lit: Lit) -> Option<bool> {
        if self.trail.is_true_at_root(lit) {
            Some(true)
        } else if self.trail.is_false_at_root(lit) {
            Some(false)
        } else {
            None
        }
    }

    /// Whether `solution` satisfies every input constraint which is still present.
    pub fn satisfies_formula(&self, solution: &Solution) -> bool {
        solution.num_variables() >= self.num_vars
            && self
                .formula
                .values()
                .all(|constraint| constraint.is_satisfied_by(|lit| solution.is_true(lit)))
    }

    pub fn num_conflicts(&self) -> u64 {
        self.statistics.engine.num_conflicts
    }

    pub(crate) fn proof_log_mut(&mut self) -> &mut ProofLog {
        &mut self.proof_log
    }

    /// Runs [`Solver::solve`] until it reports anything other than
    /// [`SolveState::Inprocessing`].
    pub fn satisfy(&mut self, termination: &mut impl TerminationCondition) -> SolveState {
        loop {
            match self.solve(termination) {
                SolveState::Inprocessing => continue,
                state => return state,
            }
        }
    }

    /// Searches until a solution is found, infeasibility is proven, the assumptions are shown
    /// inconsistent, inprocessing ran, or `termination` triggers.
    pub fn solve(&mut self, termination: &mut impl TerminationCondition) -> SolveState {
        if self.is_unsat {
            return SolveState::Unsat;
        }

        loop {
            if termination.should_stop() {
                return SolveState::Interrupted;
            }

            if let Some(conflict) = self.propagate() {
                self.statistics.engine.num_conflicts += 1;
                termination.conflict_has_been_found();

                if self.trail.decision_level() == 0 {
                    self.conclude_unsat(conflict);
                    return SolveState::Unsat;
                }
                self.analyze(conflict);
                if self.is_unsat {
                    return SolveState::Unsat;
                }

                self.restart_strategy.notify_conflict();
                self.variable_selector.decay_activities();
                self.learned_constraints.decay_activities();
                continue;
            }

            if self.trail.decision_level() > 0 && self.restart_strategy.should_restart() {
                self.restart();
            }

            if self.statistics.engine.num_conflicts >= self.next_inprocessing {
                self.backjump(0);
                self.inprocess(termination);
                return if self.is_unsat {
                    SolveState::Unsat
                } else {
                    SolveState::Inprocessing
                };
            }

            if self.learned_constraints.should_reduce() {
                self.reduce_database();
            }

            let level = self.trail.decision_level() as usize;
            if let Some(&assumption) = self.assumptions.get(level) {
                if self.trail.is_true(assumption) {
                    // an implied assumption still gets its own level
                    self.trail.new_level();
                } else if self.trail.is_false(assumption) {
                    self.extract_core(assumption);
                    return if self.is_unsat {
                        SolveState::Unsat
                    } else {
                        SolveState::Inconsistent
                    };
                } else {
                    self.decide(assumption);
                }
                continue;
            }

            match self.variable_selector.next_decision(&self.trail) {
                Some(decision) => {
                    self.statistics.engine.num_decisions += 1;
                    self.decide(decision);
                }
                None => {
                    self.record_solution();
                    return SolveState::Sat;
                }
            }
        }
    }

    fn decide(&mut self, lit: Lit) {
        self.trail.new_level();
        self.trail.enqueue(lit, CRef::UNDEF);
    }

    /// Propagates to a fixpoint. A conflict found while attaching a constraint takes precedence.
    fn propagate(&mut self) -> Option<CRef> {
        let conflict = match self.pending_conflict.take() {
            Some(conflict) => Some(conflict),
            None => {
                let num_assigned = self.trail.len();
                let conflict = self.database.propagate(&mut self.trail);
                self.statistics.engine.num_propagations +=
                    (self.trail.len() - num_assigned) as u64;
                conflict
            }
        };
        if self.trail.decision_level() == 0 {
            self.log_root_units();
        }
        conflict
    }

    /// Writes a unit for every root literal which does not have one yet, so that later
    /// derivations can refer to it.
    fn log_root_units(&mut self) {
        exact_assert_simple!(self.trail.decision_level() == 0);
        while self.num_root_units_logged < self.trail.len() {
            let lit = self.trail.lit_at(self.num_root_units_logged);
            let id = self.proof_log.log_rup(ConstrSimple::<i32>::clause([lit]));
            self.trail.set_unit_id(lit.var(), id);
            self.num_root_units_logged += 1;
        }
    }

    fn conclude_unsat(&mut self, conflict: CRef) {
        let mut ce = self.database.to_ce(conflict, &self.pools);
        ce.remove_units(&self.trail);
        let id = ce.log_derivation(&mut self.proof_log);
        self.proof_log.log_contradiction(id);
        self.is_unsat = true;
        debug!("Conflict at the root, the constraints are infeasible");
    }

    fn record_solution(&mut self) {
        let mut values = KeyedVec::default();
        values.grow_to_include(Var::from_index(self.num_vars), false);
        for var in (1..=self.num_vars).map(Var::from_index) {
            values[var] = self.trail.is_true(var.positive());
        }
        self.statistics.engine.num_solutions += 1;
        self.last_solution = Some(Solution::new(values));
        info!(
            "Found a solution after {} conflicts",
            self.statistics.engine.num_conflicts
        );
        self.backjump(0);
    }

    fn restart(&mut self) {
        self.statistics.engine.num_restarts += 1;
        debug!(
            "Restart {} after {} conflicts",
            self.restart_strategy.number_of_restarts() + 1,
            self.statistics.engine.num_conflicts
        );
        self.backjump(0);
        self.restart_strategy.notify_restart();
    }

    fn reduce_database(&mut self) {
        self.statistics.engine.num_reductions += 1;
        let num_removed =
            self.learned_constraints
                .reduce(&mut self.database, &self.trail, &mut self.proof_log);
        self.statistics.engine.num_removed_learned += num_removed as u64;
    }

    /// Undoes the assignments above `level`.
    fn backjump(&mut self, level: u32) {
        while self.trail.decision_level() > level {
            if self.trail.len() > self.trail.level_start(level + 1) {
                self.undo_one();
            } else {
                self.trail.truncate_levels(level);
            }
        }
    }

    fn undo_one(&mut self) {
        let Some(lit) = self.trail.last() else {
            return;
        };
        if self.trail.position(lit.var()) < self.trail.propagation_head {
            self.database.undo_falsified(!lit);
        }
        let _ = self.trail.pop();
        self.variable_selector.on_unassigned(lit);
    }

    /// Simplifies `ce` at the root, stores it and propagates it under the current assignment.
    ///
    /// A constraint which is satisfied at the root is dropped and one which is infeasible makes
    /// the solver infeasible; neither is stored.
    fn attach(&mut self, mut ce: AnyCe, origin: Origin, lbd: u32, locked: bool) -> Attached {
        ce.set_origin(origin);
        ce.remove_units(&self.trail);
        let _ = ce.saturate();

        if ce.is_trivial() {
            return Attached {
                id: ProofId::TRIVIAL,
                cref: None,
            };
        }
        if ce.is_infeasible() {
            let id = ce.log_derivation(&mut self.proof_log);
            self.proof_log.log_contradiction(id);
            self.proof_log.flush();
            self.is_unsat = true;
            debug!("An infeasible {origin:?} constraint was attached");
            return Attached {
                id: ProofId::UNSAT,
                cref: None,
            };
        }

        let id = ce.log_derivation(&mut self.proof_log);
        let ce = ce.into_smallest(&self.pools);
        let cref = self.database.store(
            &ce,
            ConstraintHeader::new(id, origin, lbd, locked),
            &self.trail,
            self.propagation_options.counting_ratio,
        );
        if self.database.propagate_on_attach(cref, &mut self.trail) {
            exact_assert_moderate!(self.pending_conflict.is_none());
            self.pending_conflict = Some(cref);
        }
        if self.trail.decision_level() == 0 {
            self.log_root_units();
        }
        Attached {
            id,
            cref: Some(cref),
        }
    }

    /// Propagates at the root after units were added. Returns `false` when this shows the
    /// database infeasible.
    fn propagate_at_root(&mut self) -> bool {
        exact_assert_simple!(self.trail.decision_level() == 0);
        if self.is_unsat {
            return false;
        }
        if let Some(conflict) = self.propagate() {
            self.conclude_unsat(conflict);
            return false;
        }
        true
    }

    /// Logs the statistics of the solver, followed by the statistics postfix.
    pub fn log_statistics(&self, verbose: bool) {
        if !should_log_statistics() {
            return;
        }
        self.log_statistics_with_logger(&StatisticLogger::new("solver"), verbose);
        log_statistic_postfix();
    }

    pub(crate) fn log_statistics_with_logger(
        &self,
        statistic_logger: &StatisticLogger,
        verbose: bool,
    ) {
        self.statistics.log(statistic_logger, verbose);
        self.learned_constraints
            .num_learned()
            .log(statistic_logger.attach_to_prefix("numLearnedConstraints"));
        self.database
            .count(Origin::Formula)
            .log(statistic_logger.attach_to_prefix("numFormulaConstraints"));
        if verbose {
            self.pools
                .num_created()
                .log(statistic_logger.attach_to_prefix("numPooledExpressions"));
        }
    }
}
