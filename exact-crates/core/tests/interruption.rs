#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use exact_core::termination::Combinator;
use exact_core::termination::ConflictBudget;
use exact_core::termination::Indefinite;
use exact_core::termination::Interrupt;
use exact_core::termination::TimeBudget;
use exact_core::ConstrSimple;
use exact_core::Lit;
use exact_core::Origin;
use exact_core::SolveState;
use exact_core::Solver;

/// The clausal pigeonhole formula, which takes many conflicts to refute.
fn pigeonhole(pigeons: usize, holes: usize) -> Solver {
    let mut solver = Solver::default();
    let vars = (0..pigeons)
        .map(|_| {
            solver
                .new_variables(holes)
                .into_iter()
                .map(|var| var.positive())
                .collect::<Vec<Lit>>()
        })
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
    solver
}

#[test]
fn a_raised_interrupt_stops_the_search() {
    let mut solver = pigeonhole(5, 4);
    let mut interrupt = Interrupt::new();
    interrupt.raise();

    assert_eq!(solver.solve(&mut interrupt), SolveState::Interrupted);
    assert_eq!(solver.num_conflicts(), 0);

    interrupt.clear();
    assert_eq!(solver.satisfy(&mut interrupt), SolveState::Unsat);
}

#[test]
fn clones_of_an_interrupt_share_the_flag() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut interrupt = Interrupt::from_flag(Arc::clone(&flag));
    let handle = interrupt.clone();

    handle.raise();
    assert!(interrupt.is_raised());

    let mut solver = pigeonhole(3, 2);
    assert_eq!(solver.satisfy(&mut interrupt), SolveState::Interrupted);
}

#[test]
fn an_exhausted_conflict_budget_interrupts_and_the_search_resumes() {
    let mut solver = pigeonhole(5, 4);

    assert_eq!(
        solver.satisfy(&mut ConflictBudget::new(0)),
        SolveState::Interrupted
    );
    assert_eq!(solver.num_conflicts(), 0);

    let mut budget = ConflictBudget::new(1);
    assert_eq!(solver.satisfy(&mut budget), SolveState::Interrupted);
    assert!(budget.is_exhausted());
    assert_eq!(solver.num_conflicts(), 1);

    assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Unsat);
}

#[test]
fn a_spent_time_budget_interrupts() {
    let mut solver = pigeonhole(5, 4);
    let mut budget = TimeBudget::starting_now(Duration::ZERO);

    assert_eq!(solver.satisfy(&mut budget), SolveState::Interrupted);
}

#[test]
fn combined_conditions_stop_when_either_does() {
    let mut solver = pigeonhole(5, 4);
    let mut combined = Combinator::new(
        TimeBudget::starting_now(Duration::from_secs(3600)),
        ConflictBudget::new(2),
    );

    assert_eq!(solver.satisfy(&mut combined), SolveState::Interrupted);
    assert!(combined.second().is_exhausted());
    assert_eq!(solver.num_conflicts(), 2);
}
