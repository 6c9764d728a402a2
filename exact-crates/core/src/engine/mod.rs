mod constraint_database;
mod implication_graph;
mod learned_constraint_manager;
mod restart_strategy;
mod solver;
pub(crate) mod solver_options;
mod solver_statistics;
pub mod termination;
mod trail;
mod variable_selector;

pub(crate) use constraint_database::ConstraintDatabase;
pub(crate) use constraint_database::ConstraintHeader;
pub(crate) use implication_graph::Equalities;
pub(crate) use implication_graph::Implications;
pub(crate) use learned_constraint_manager::LearnedConstraintManager;
pub use learned_constraint_manager::LearnedConstraintSortingStrategy;
pub use learned_constraint_manager::LearningOptions;
pub use restart_strategy::RestartOptions;
pub(crate) use restart_strategy::RestartStrategy;
pub use solver::Solver;
pub use solver_options::ConflictAnalysisOptions;
pub use solver_options::DivisionPolicy;
pub use solver_options::InprocessingOptions;
pub use solver_options::PropagationOptions;
pub use solver_options::SolverOptions;
pub(crate) use solver_statistics::SolverStatistics;
pub(crate) use trail::Trail;
pub(crate) use trail::UNASSIGNED;
pub(crate) use variable_selector::VariableSelector;
