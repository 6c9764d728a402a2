use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use num::BigInt;
use num::One;

use super::LpCollaborator;
use super::LpView;
use super::Objective;
use super::OptimisationMode;
use super::OptimisationOptions;
use super::OptimisationResult;
use super::Reformulation;
use super::SolutionImprover;
use crate::basic_types::OptionError;
use crate::basic_types::Origin;
use crate::basic_types::Solution;
use crate::basic_types::SolveState;
use crate::create_statistics_struct;
use crate::engine::termination::Combinator;
use crate::engine::termination::ConflictBudget;
use crate::engine::termination::TerminationCondition;
use crate::engine::Solver;
use crate::exact_assert_simple;
use crate::proof::ProofId;
use crate::statistics::log_statistic;
use crate::statistics::log_statistic_postfix;
use crate::statistics::should_log_statistics;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

create_statistics_struct!(
    /// Counters of the optimisation loop.
    OptimisationStatistics {
        num_solutions: u64,
        /// The number of solutions which improved the upper bound
        num_improving_solutions: u64,
        /// The number of solutions accepted from the solution improver
        num_improver_solutions: u64,
        num_cores: u64,
        /// The number of cores which consisted of a literal fixed at the root
        num_root_cores: u64,
        num_counting_variables: u64,
        num_stratification_steps: u64,
        num_lp_calls: u64,
        num_lp_cuts: u64,
        num_phase_switches: u64,
    }
);

/// Minimises an [`Objective`] over the constraints of a [`Solver`].
///
/// The driver repeatedly calls [`Solver::solve`] and reacts to its outcome: solutions tighten
/// the upper bound, cores under the assumption that objective literals are false raise the
/// lower bound by reformulating the objective, and the pauses for inprocessing are used to
/// inject the lower bound and consult the [`LpCollaborator`]. The search ends when the bounds
/// meet or the solver proves that no better solution exists.
///
/// # Example
/// ```
/// # use exact_core::ConstrSimple;
/// # use exact_core::Origin;
/// # use exact_core::Solver;
/// # use exact_core::optimisation::Objective;
/// # use exact_core::optimisation::OptimisationDriver;
/// # use exact_core::optimisation::OptimisationOptions;
/// # use exact_core::optimisation::OptimisationResult;
/// # use exact_core::termination::Indefinite;
/// # use num::BigInt;
/// let mut solver = Solver::default();
/// let [x1, x2, x3] = [(); 3].map(|_| solver.new_variable().positive());
/// let _ = solver.add_constraint(&ConstrSimple::at_least([x1, x2, x3], 2), Origin::Formula);
///
/// let objective = Objective::new([(1, x1), (1, x2), (1, x3)], 0);
/// let mut driver = OptimisationDriver::new(objective, OptimisationOptions::default())?;
///
/// let result = driver.optimise(&mut solver, &mut Indefinite);
/// assert!(matches!(result, OptimisationResult::Optimal(_)));
/// assert_eq!(driver.upper_bound(), Some(&BigInt::from(2)));
/// assert_eq!(driver.lower_bound(), &BigInt::from(2));
/// # Ok::<(), exact_core::OptionError>(())
/// ```
pub struct OptimisationDriver {
    objective: Objective,
    options: OptimisationOptions,
    reformulation: Reformulation,
    /// Only objective literals with at least this weight are assumed; `None` assumes all of them
    threshold: Option<BigInt>,
    lower_bound: BigInt,
    upper_bound: Option<BigInt>,
    best_solution: Option<Solution>,
    last_upper_bound_id: ProofId,
    last_lower_bound_id: ProofId,
    injected_lower_bound: BigInt,
    /// Set once a solution under all assumptions does not attain the reformulated lower bound;
    /// from then on the search only tightens the upper bound
    reformulation_exhausted: bool,
    linear_phase: bool,
    phase_budget: ConflictBudget,
    lp: Option<Box<dyn LpCollaborator>>,
    improver: Option<Box<dyn SolutionImprover>>,
    started_at: Instant,
    lp_time: Duration,
    statistics: OptimisationStatistics,
}

impl std::fmt::Debug for OptimisationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisationDriver")
            .field("objective", &self.objective)
            .field("options", &self.options)
            .field("lower_bound", &self.lower_bound)
            .field("upper_bound", &self.upper_bound)
            .finish_non_exhaustive()
    }
}

impl OptimisationDriver {
    pub fn new(
        objective: Objective,
        options: OptimisationOptions,
    ) -> Result<OptimisationDriver, OptionError> {
        options.validate()?;

        let reformulation = Reformulation::new(&objective, options.core_encoding);
        let threshold = if options.stratification {
            reformulation.max_weight()
        } else {
            None
        };
        Ok(OptimisationDriver {
            lower_bound: objective.trivial_lower_bound(),
            injected_lower_bound: objective.trivial_lower_bound(),
            objective,
            options,
            reformulation,
            threshold,
            upper_bound: None,
            best_solution: None,
            last_upper_bound_id: ProofId::UNDEF,
            last_lower_bound_id: ProofId::UNDEF,
            reformulation_exhausted: false,
            linear_phase: false,
            phase_budget: ConflictBudget::new(options.hybrid_phase_conflicts),
            lp: None,
            improver: None,
            started_at: Instant::now(),
            lp_time: Duration::ZERO,
            statistics: OptimisationStatistics::default(),
        })
    }

    pub fn with_lp_collaborator(mut self, lp: impl LpCollaborator + 'static) -> Self {
        self.lp = Some(Box::new(lp));
        self
    }

    pub fn with_solution_improver(mut self, improver: impl SolutionImprover + 'static) -> Self {
        self.improver = Some(Box::new(improver));
        self
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn lower_bound(&self) -> &BigInt {
        &self.lower_bound
    }

    /// The objective value of the best solution found so far.
    pub fn upper_bound(&self) -> Option<&BigInt> {
        self.upper_bound.as_ref()
    }

    pub fn best_solution(&self) -> Option<&Solution> {
        self.best_solution.as_ref()
    }

    /// The proof line of the most recent constraint `objective <= upper bound - 1`.
    pub fn last_upper_bound_id(&self) -> ProofId {
        self.last_upper_bound_id
    }

    /// The proof line of the most recent constraint `objective >= lower bound`.
    pub fn last_lower_bound_id(&self) -> ProofId {
        self.last_lower_bound_id
    }

    /// Minimises the objective over the constraints of `solver`, until optimality is proven or
    /// `termination` triggers.
    pub fn optimise(
        &mut self,
        solver: &mut Solver,
        termination: &mut impl TerminationCondition,
    ) -> OptimisationResult {
        self.started_at = Instant::now();
        for term in self.objective.terms() {
            solver.freeze(term.lit.var());
        }

        loop {
            if let Some(result) = self.conclude_if_bounds_meet() {
                return result;
            }

            if self.uses_assumptions() {
                let assumptions = self.reformulation.assumptions(self.threshold.as_ref());
                if assumptions != solver.assumptions() {
                    solver.set_assumptions(&assumptions);
                }
            } else if !solver.assumptions().is_empty() {
                solver.clear_assumptions();
            }

            let state = if self.options.mode == OptimisationMode::Hybrid {
                let state = solver.solve(&mut Combinator::new(
                    &mut *termination,
                    &mut self.phase_budget,
                ));
                if state == SolveState::Interrupted && self.phase_budget.is_exhausted() {
                    self.switch_phase();
                    continue;
                }
                state
            } else {
                solver.solve(termination)
            };

            match state {
                SolveState::Sat => self.on_solution(solver),
                SolveState::Inconsistent => self.on_core(solver),
                SolveState::Inprocessing => self.on_inprocessing(solver),
                SolveState::Unsat => return self.conclude_unsat(),
                SolveState::Interrupted => {
                    return match &self.best_solution {
                        Some(solution) => OptimisationResult::Satisfiable(solution.clone()),
                        None => OptimisationResult::Unknown,
                    };
                }
            }
        }
    }

    fn uses_assumptions(&self) -> bool {
        match self.options.mode {
            OptimisationMode::CoreGuided => !self.reformulation_exhausted,
            OptimisationMode::LinearSearch => false,
            OptimisationMode::Hybrid => !self.linear_phase && !self.reformulation_exhausted,
        }
    }

    fn switch_phase(&mut self) {
        self.linear_phase = !self.linear_phase;
        self.phase_budget = ConflictBudget::new(self.options.hybrid_phase_conflicts);
        self.statistics.num_phase_switches += 1;
        debug!(
            "Switching to the {} phase",
            if self.linear_phase {
                "linear"
            } else {
                "core-guided"
            }
        );
    }

    fn conclude_if_bounds_meet(&mut self) -> Option<OptimisationResult> {
        let upper_bound = self.upper_bound.as_ref()?;
        if self.lower_bound < *upper_bound {
            return None;
        }
        self.lower_bound = upper_bound.clone();
        self.best_solution.clone().map(OptimisationResult::Optimal)
    }

    fn conclude_unsat(&mut self) -> OptimisationResult {
        match &self.best_solution {
            Some(solution) => {
                if let Some(upper_bound) = &self.upper_bound {
                    self.lower_bound = upper_bound.clone();
                }
                OptimisationResult::Optimal(solution.clone())
            }
            None => OptimisationResult::Unsatisfiable,
        }
    }

    fn on_solution(&mut self, solver: &mut Solver) {
        self.statistics.num_solutions += 1;
        let Some(found) = solver.last_solution().cloned() else {
            exact_assert_simple!(false, "a SAT answer comes with a solution");
            return;
        };
        let found_value = self.objective.value(&found);

        let (solution, value) = match self.improve(solver, &found, &found_value) {
            Some(improved) => improved,
            None => (found, found_value.clone()),
        };

        if self
            .upper_bound
            .as_ref()
            .is_none_or(|upper_bound| value < *upper_bound)
        {
            info!("New upper bound {value}");
            self.statistics.num_improving_solutions += 1;
            let proof_log = solver.proof_log_mut();
            proof_log.log_comment(format_args!("upper bound {value}"));
            let _ = proof_log.log_solution(solution.true_literals());
            self.upper_bound = Some(value);
            self.best_solution = Some(solution);
            if self.options.bound_upper || !self.uses_assumptions() {
                self.add_upper_bound_constraint(solver);
            }
        }

        if !self.uses_assumptions() {
            return;
        }
        if self.reformulation.all_assumed(self.threshold.as_ref()) {
            // every reformulated literal is false, so the reformulation is tight on this solution
            // unless some of its counting terms were never introduced
            if found_value <= *self.reformulation.lower_bound() {
                self.raise_lower_bound(self.reformulation.lower_bound().clone());
            } else {
                debug!("The reformulation does not reach {found_value}, tightening upper bounds only");
                self.reformulation_exhausted = true;
                self.add_upper_bound_constraint(solver);
            }
        } else if let Some(threshold) = &self.threshold {
            self.threshold = self.reformulation.next_threshold(threshold);
            self.statistics.num_stratification_steps += 1;
            debug!(
                "Lowering the stratification threshold to {}",
                self.threshold
                    .as_ref()
                    .map_or_else(|| "0".to_owned(), BigInt::to_string)
            );
        }
    }

    /// Asks the solution improver for a better solution, and returns it with its value if it
    /// is a valid improvement.
    fn improve(
        &mut self,
        solver: &Solver,
        solution: &Solution,
        value: &BigInt,
    ) -> Option<(Solution, BigInt)> {
        let improver = self.improver.as_mut()?;
        let improved = improver.improve(solution, &self.objective)?;
        let improved_value = self.objective.value(&improved);
        if improved_value < *value && solver.satisfies_formula(&improved) {
            self.statistics.num_improver_solutions += 1;
            Some((improved, improved_value))
        } else {
            None
        }
    }

    fn add_upper_bound_constraint(&mut self, solver: &mut Solver) {
        let Some(upper_bound) = &self.upper_bound else {
            return;
        };
        let constraint = self.objective.at_most(&(upper_bound - BigInt::one()));
        let (id, processed) = solver.add_constraint(&constraint, Origin::UpperBound);
        if processed == ProofId::UNSAT {
            debug!("No solution improves on {upper_bound}");
        }

        let previous = std::mem::replace(&mut self.last_upper_bound_id, id);
        if previous != ProofId::UNDEF {
            let _ = solver.remove_constraint(previous);
        }
    }

    fn on_core(&mut self, solver: &mut Solver) {
        self.statistics.num_cores += 1;
        match solver.last_core().cloned() {
            None => {
                self.statistics.num_root_cores += 1;
                let _ = self.reformulation.fold_root_assignments(solver);
            }
            Some(core) => match self.reformulation.process_core(&core, solver) {
                Some(num_introduced) => {
                    self.statistics.num_counting_variables += num_introduced as u64;
                }
                None => {
                    debug!("A core without objective literals, continuing with upper bounds");
                    self.reformulation_exhausted = true;
                }
            },
        }
        self.raise_lower_bound(self.reformulation.lower_bound().clone());
    }

    fn on_inprocessing(&mut self, solver: &mut Solver) {
        if self.reformulation.fold_root_assignments(solver) {
            self.raise_lower_bound(self.reformulation.lower_bound().clone());
        }
        self.run_lp(solver);
        self.add_lower_bound_constraint(solver);
    }

    fn raise_lower_bound(&mut self, bound: BigInt) {
        if bound > self.lower_bound {
            info!("New lower bound {bound}");
            self.lower_bound = bound;
        }
    }

    fn add_lower_bound_constraint(&mut self, solver: &mut Solver) {
        if self.lower_bound <= self.injected_lower_bound {
            return;
        }
        let constraint = self.objective.at_least(&self.lower_bound);
        let (id, _) = solver.add_constraint(&constraint, Origin::LowerBound);
        self.injected_lower_bound = self.lower_bound.clone();

        let previous = std::mem::replace(&mut self.last_lower_bound_id, id);
        if previous != ProofId::UNDEF {
            let _ = solver.remove_constraint(previous);
        }
    }

    fn run_lp(&mut self, solver: &mut Solver) {
        let Some(lp) = self.lp.as_mut() else {
            return;
        };
        let budget = self.started_at.elapsed().as_secs_f64() * self.options.lp_time_ratio;
        if self.options.lp_time_ratio <= 0.0 || self.lp_time.as_secs_f64() > budget {
            return;
        }

        let started_at = Instant::now();
        let outcome = lp.run(&LpView {
            solver,
            objective: &self.objective,
            lower_bound: &self.lower_bound,
            upper_bound: self.upper_bound.as_ref(),
        });
        self.lp_time += started_at.elapsed();
        self.statistics.num_lp_calls += 1;

        if let Some(cut) = outcome.cut {
            self.statistics.num_lp_cuts += 1;
            let _ = solver.add_constraint(&cut, Origin::LpCut);
        }
        if let Some(bound) = outcome.lower_bound {
            self.raise_lower_bound(bound);
        }
    }

    /// Logs the statistics of the optimisation and of `solver`, followed by the statistics
    /// postfix.
    pub fn log_statistics(&self, solver: &Solver, verbose: bool) {
        if !should_log_statistics() {
            return;
        }
        self.statistics.log(StatisticLogger::new("optimisation"));
        log_statistic("lowerBound", &self.lower_bound);
        if let Some(upper_bound) = &self.upper_bound {
            log_statistic("upperBound", upper_bound);
        }
        solver.log_statistics_with_logger(&StatisticLogger::new("solver"), verbose);
        log_statistic_postfix();
    }
}
