#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use exact_core::num::BigInt;
use exact_core::optimisation::Objective;
use exact_core::optimisation::OptimisationDriver;
use exact_core::optimisation::OptimisationOptions;
use exact_core::optimisation::OptimisationResult;
use exact_core::rand::rngs::SmallRng;
use exact_core::rand::Rng;
use exact_core::rand::SeedableRng;
use exact_core::termination::Indefinite;
use exact_core::ConflictAnalysisOptions;
use exact_core::ConstrSimple;
use exact_core::DivisionPolicy;
use exact_core::InprocessingOptions;
use exact_core::Lit;
use exact_core::Origin;
use exact_core::PropagationOptions;
use exact_core::ProofId;
use exact_core::ProofLog;
use exact_core::SolveState;
use exact_core::Solver;
use exact_core::SolverOptions;

fn lits(solver: &mut Solver, count: usize) -> Vec<Lit> {
    solver
        .new_variables(count)
        .into_iter()
        .map(|var| var.positive())
        .collect()
}

#[test]
fn cardinality_propagates_once_two_literals_are_false() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 4);
    let _ = solver.add_constraint(&ConstrSimple::at_least(x.clone(), 2), Origin::Formula);
    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x[0]]), Origin::Formula);

    assert_eq!(solver.root_value(x[0]), Some(false));
    assert_eq!(solver.root_value(x[1]), None);
    assert_eq!(solver.root_value(x[2]), None);

    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x[1]]), Origin::Formula);
    assert_eq!(solver.root_value(x[2]), Some(true));
    assert_eq!(solver.root_value(x[3]), Some(true));
}

#[test]
fn a_cardinality_with_no_slack_forces_the_remaining_literals() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 3);
    let _ = solver.add_constraint(&ConstrSimple::at_least(x.clone(), 2), Origin::Formula);
    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x[0]]), Origin::Formula);

    assert_eq!(solver.root_value(x[1]), Some(true));
    assert_eq!(solver.root_value(x[2]), Some(true));
}

#[test]
fn resolving_the_conflict_learns_a_unit() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 2);
    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([x[0], x[1]]), Origin::Formula);
    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x[0], x[1]]), Origin::Formula);
    assert_eq!(solver.root_value(x[1]), None);

    // assuming ~x2 forces the conflict whose analysis derives x2 at the root
    solver.set_assumptions(&[!x[1]]);
    assert_eq!(solver.solve(&mut Indefinite), SolveState::Inconsistent);
    assert_eq!(solver.root_value(x[1]), Some(true));
    assert!(solver.last_core().is_none());

    solver.clear_assumptions();
    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
    let solution = solver.last_solution().expect("a solution was found");
    assert!(solution.is_true(x[1]));
}

#[test]
fn the_empty_constraint_makes_the_solver_unsat() {
    let mut solver = Solver::default();
    let (_, processed) =
        solver.add_constraint(&ConstrSimple::new(std::iter::empty(), 1), Origin::Formula);

    assert_eq!(processed, ProofId::UNSAT);
    assert!(solver.is_unsat());
    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);

    // nothing can be added once the solver is unsat
    let x1 = solver.new_variable().positive();
    let (_, processed) = solver.add_constraint(&ConstrSimple::<i32>::clause([x1]), Origin::Formula);
    assert_eq!(processed, ProofId::UNSAT);
}

#[test]
fn huge_coefficients_are_handled_exactly() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 3);
    let big = BigInt::from(10).pow(30);

    // 10^30 x1 + 10^30 x2 + x3 >= 10^30 + 1, so with ~x1 both x2 and x3 are needed
    let _ = solver.add_constraint(
        &ConstrSimple::new(
            [
                (big.clone(), x[0]),
                (big.clone(), x[1]),
                (BigInt::from(1), x[2]),
            ],
            &big + 1,
        ),
        Origin::Formula,
    );
    let _ = solver.add_constraint(&ConstrSimple::<i32>::clause([!x[0]]), Origin::Formula);

    assert_eq!(solver.root_value(x[1]), Some(true));
    assert_eq!(solver.root_value(x[2]), Some(true));
    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
}

#[test]
fn conflicts_over_huge_coefficients_are_refuted() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 4);
    let big = BigInt::from(2).pow(100);

    // an odd sum of even coefficients
    let terms = x
        .iter()
        .map(|&lit| (&big * 2, lit))
        .collect::<Vec<_>>();
    let _ = solver.add_constraint(&ConstrSimple::new(terms.clone(), &big * 4 + 1), Origin::Formula);
    let _ = solver.add_constraint(&ConstrSimple::at_most(terms, &big * 4 + 1), Origin::Formula);

    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);
}

fn pigeonhole(solver: &mut Solver, pigeons: usize, holes: usize) {
    let vars = (0..pigeons)
        .map(|_| lits(solver, holes))
        .collect::<Vec<_>>();
    for pigeon in &vars {
        let _ = solver.add_constraint(&ConstrSimple::<i32>::clause(pigeon.clone()), Origin::Formula);
    }
    for hole in 0..holes {
        for first in 0..pigeons {
            for second in first + 1..pigeons {
                let _ = solver.add_constraint(
                    &ConstrSimple::<i32>::clause([!vars[first][hole], !vars[second][hole]]),
                    Origin::Formula,
                );
            }
        }
    }
}

#[test]
fn pigeonhole_principle_is_refuted() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut solver = Solver::default();
    pigeonhole(&mut solver, 5, 4);
    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);
    assert!(solver.num_conflicts() > 0);
}

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn refutations_end_with_a_contradiction_in_the_proof() {
    let buffer = SharedBuffer::default();
    let options = SolverOptions {
        proof_log: ProofLog::to_writer(buffer.clone()),
        ..Default::default()
    };
    let mut solver = Solver::with_options(options).expect("default options are valid");
    pigeonhole(&mut solver, 4, 3);
    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);

    let proof = String::from_utf8(buffer.0.borrow().clone()).expect("the proof is text");
    let lines = proof.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "pseudo-Boolean proof version 1.0");
    assert_eq!(lines.iter().filter(|line| line.starts_with("f ")).count(), 4 + 3 * 6);
    assert!(lines
        .last()
        .is_some_and(|line| line.starts_with("c ")));
}

#[test]
fn solutions_satisfy_every_constraint() {
    let mut solver = Solver::default();
    let x = lits(&mut solver, 6);
    let constraints = [
        ConstrSimple::new([(3, x[0]), (2, x[1]), (2, x[2]), (1, x[3])], 4),
        ConstrSimple::new([(-2, x[0]), (1, x[4]), (1, !x[5])], 0),
        ConstrSimple::at_least([x[2], x[3], x[4], x[5]], 2),
        ConstrSimple::at_most([(1, x[1]), (1, x[2])], 1),
    ];
    for constraint in &constraints {
        let _ = solver.add_constraint(constraint, Origin::Formula);
    }

    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
    let solution = solver.last_solution().expect("a solution was found");
    for constraint in &constraints {
        assert!(constraint.is_satisfied_by(|lit| solution.is_true(lit)));
    }
    assert!(solver.satisfies_formula(solution));
}

const DIVISION_POLICIES: [DivisionPolicy; 3] = [
    DivisionPolicy::RoundToOne,
    DivisionPolicy::SlackPlusOne,
    DivisionPolicy::MinDivisor,
];

/// A constraint from `(coefficient, dimacs literal)` terms.
fn constraint(terms: &[(i32, i32)], rhs: i32) -> ConstrSimple<i32> {
    ConstrSimple::new(
        terms
            .iter()
            .map(|&(coefficient, code)| (coefficient, Lit::from_dimacs(code))),
        rhs,
    )
}

#[test]
fn reasons_falsified_later_on_the_trail_do_not_break_analysis() {
    // Resolving on x7 used to pull in ~x2, which is falsified only after x7 is propagated.
    let constraints = [
        constraint(&[(-6, 7), (2, -5), (9, 9), (4, -9), (2, 4), (3, -8)], 5),
        constraint(&[(4, 2), (5, -3), (6, -7)], 8),
        constraint(&[(-4, -5), (8, -9), (5, 5), (8, 7), (-5, 2), (2, -8)], 8),
        constraint(&[(6, 9), (5, -5)], 4),
        constraint(&[(5, -2), (3, -3), (2, 7), (9, -4), (1, -5)], 11),
    ];

    for division_policy in DIVISION_POLICIES {
        for inprocessing in [true, false] {
            let mut options = SolverOptions {
                conflict_analysis_options: ConflictAnalysisOptions {
                    division_policy,
                    ..Default::default()
                },
                ..Default::default()
            };
            options.inprocessing_options.probing = inprocessing;
            options.inprocessing_options.dominance = inprocessing;
            let mut solver = Solver::with_options(options).expect("valid options");
            let _ = solver.new_variables(9);
            for constraint in &constraints {
                let _ = solver.add_constraint(constraint, Origin::Formula);
            }

            assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat, "{division_policy:?}");
            let solution = solver.last_solution().expect("a solution was found");
            assert!(constraints
                .iter()
                .all(|constraint| constraint.is_satisfied_by(|lit| solution.is_true(lit))));
        }
    }
}

/// A random instance over few enough variables to enumerate every assignment.
struct RandomInstance {
    num_vars: usize,
    constraints: Vec<ConstrSimple<i32>>,
    objective: Vec<(i32, Lit)>,
}

impl RandomInstance {
    fn generate(rng: &mut SmallRng) -> RandomInstance {
        let num_vars = rng.gen_range(3..=8);
        let mut random_lit = |rng: &mut SmallRng| {
            let lit = Lit::from_dimacs(rng.gen_range(1..=num_vars as i32));
            if rng.gen_bool(0.5) {
                lit
            } else {
                !lit
            }
        };

        let constraints = (0..rng.gen_range(2..=7))
            .map(|_| {
                let terms = (0..rng.gen_range(1..=6))
                    .map(|_| {
                        let coefficient = match rng.gen_range(-6..=9) {
                            0 => 1,
                            coefficient => coefficient,
                        };
                        (coefficient, random_lit(rng))
                    })
                    .collect::<Vec<_>>();
                let positive_sum = terms
                    .iter()
                    .map(|&(coefficient, _)| coefficient.max(0))
                    .sum::<i32>();
                let rhs = rng.gen_range(-2..=positive_sum.max(1));
                ConstrSimple::new(terms, rhs)
            })
            .collect();
        let objective = (0..rng.gen_range(1..=num_vars))
            .map(|_| (rng.gen_range(-3..=5), random_lit(rng)))
            .collect();

        RandomInstance {
            num_vars,
            constraints,
            objective,
        }
    }

    /// The smallest objective value over all feasible assignments, or `None` if there are none.
    fn brute_force_optimum(&self) -> Option<i32> {
        (0..1_u32 << self.num_vars)
            .filter_map(|assignment| {
                let is_true = |lit: Lit| {
                    (assignment >> (lit.var().index() - 1) & 1 == 1) == lit.is_positive()
                };
                self.constraints
                    .iter()
                    .all(|constraint| constraint.is_satisfied_by(is_true))
                    .then(|| {
                        self.objective
                            .iter()
                            .filter(|&&(_, lit)| is_true(lit))
                            .map(|&(coefficient, _)| coefficient)
                            .sum()
                    })
            })
            .min()
    }

    fn solver(&self, options: SolverOptions) -> Solver {
        let mut solver = Solver::with_options(options).expect("valid options");
        let _ = solver.new_variables(self.num_vars);
        for constraint in &self.constraints {
            let _ = solver.add_constraint(constraint, Origin::Formula);
        }
        solver
    }
}

#[test]
fn random_instances_agree_with_enumeration() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = SmallRng::seed_from_u64(20_240_917);

    let mut configurations = vec![];
    for division_policy in DIVISION_POLICIES {
        for counting_ratio in [0.0, 0.7, 1.0] {
            for (bits_overflow, bits_reduced) in [(62, 29), (4, 2)] {
                configurations.push((division_policy, counting_ratio, bits_overflow, bits_reduced));
            }
        }
    }

    for round in 0..3000 {
        let instance = RandomInstance::generate(&mut rng);
        let optimum = instance.brute_force_optimum();
        let (division_policy, counting_ratio, bits_overflow, bits_reduced) =
            configurations[round % configurations.len()];
        let options = || SolverOptions {
            conflict_analysis_options: ConflictAnalysisOptions {
                division_policy,
                bits_overflow,
                bits_reduced,
                bits_learned: bits_reduced,
                ..Default::default()
            },
            propagation_options: PropagationOptions { counting_ratio },
            inprocessing_options: InprocessingOptions {
                first_interval: 2,
                ..Default::default()
            },
            random_generator: SmallRng::seed_from_u64(round as u64),
            ..Default::default()
        };
        let context = format!(
            "round {round}, {division_policy:?}, counting ratio {counting_ratio}, \
             bits {bits_overflow}/{bits_reduced}: {:?}",
            instance.constraints
        );

        let mut solver = instance.solver(options());
        match solver.satisfy(&mut Indefinite) {
            SolveState::Sat => {
                assert!(optimum.is_some(), "{context}");
                let solution = solver.last_solution().expect("a solution was found");
                assert!(
                    instance
                        .constraints
                        .iter()
                        .all(|constraint| constraint.is_satisfied_by(|lit| solution.is_true(lit))),
                    "{context}"
                );
            }
            SolveState::Unsat => assert!(optimum.is_none(), "{context}"),
            state => panic!("unexpected {state:?} for {context}"),
        }

        let mut solver = instance.solver(options());
        let objective = Objective::new(instance.objective.iter().copied(), 0);
        let mut driver = OptimisationDriver::new(objective, OptimisationOptions::default())
            .expect("valid options");
        match (driver.optimise(&mut solver, &mut Indefinite), optimum) {
            (OptimisationResult::Optimal(solution), Some(optimum)) => {
                assert_eq!(
                    driver.objective().value(&solution),
                    BigInt::from(optimum),
                    "{context}"
                );
            }
            (OptimisationResult::Unsatisfiable, None) => {}
            (result, optimum) => {
                panic!("{result:?} but the optimum is {optimum:?} for {context}")
            }
        }
    }
}
