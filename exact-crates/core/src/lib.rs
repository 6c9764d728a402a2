//! # Exact core
//! A conflict-driven solver for pseudo-Boolean problems: conjunctions of linear constraints
//! `Σ c_i * l_i >= d` over literals, with arbitrary-precision integer coefficients.
//!
//! The [`Solver`] decides satisfiability, possibly under assumptions, in which case it reports
//! a core over the negated assumptions. The
//! [`OptimisationDriver`](optimisation::OptimisationDriver) builds on it to minimise a linear
//! objective exactly.
//!
//! ```
//! # use exact_core::ConstrSimple;
//! # use exact_core::Origin;
//! # use exact_core::SolveState;
//! # use exact_core::Solver;
//! # use exact_core::termination::Indefinite;
//! let mut solver = Solver::default();
//! let [x1, x2] = [(); 2].map(|_| solver.new_variable().positive());
//!
//! // 3 x1 + 2 x2 >= 4 forces both literals
//! let _ = solver.add_constraint(&ConstrSimple::new([(3, x1), (2, x2)], 4), Origin::Formula);
//!
//! assert_eq!(solver.satisfy(&mut Indefinite), SolveState::Sat);
//! let solution = solver.last_solution().expect("the formula is satisfiable");
//! assert!(solution.is_true(x1) && solution.is_true(x2));
//! ```
pub(crate) mod arithmetic;
pub(crate) mod asserts;
pub(crate) mod basic_types;
pub(crate) mod constraints;
pub mod containers;
pub(crate) mod engine;
pub mod optimisation;
pub mod proof;
pub mod statistics;

pub use num;
pub use rand;

pub use crate::arithmetic::Coefficient;
pub use crate::basic_types::Lit;
pub use crate::basic_types::OptionError;
pub use crate::basic_types::Origin;
pub use crate::basic_types::interval_sequence::SequenceGeneratorType;
pub use crate::basic_types::Solution;
pub use crate::basic_types::SolveState;
pub use crate::basic_types::Var;
pub use crate::constraints::ConstrSimple;
pub use crate::constraints::Term;
pub use crate::engine::termination;
pub use crate::engine::ConflictAnalysisOptions;
pub use crate::engine::DivisionPolicy;
pub use crate::engine::InprocessingOptions;
pub use crate::engine::LearnedConstraintSortingStrategy;
pub use crate::engine::LearningOptions;
pub use crate::engine::PropagationOptions;
pub use crate::engine::RestartOptions;
pub use crate::engine::Solver;
pub use crate::engine::SolverOptions;
pub use crate::proof::ProofId;
pub use crate::proof::ProofLog;
