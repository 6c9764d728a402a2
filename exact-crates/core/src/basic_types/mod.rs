mod constraint_reference;
mod literal;
mod option_error;
mod origin;
pub(crate) mod interval_sequence;
mod solution;
mod solve_state;

pub(crate) use constraint_reference::CRef;
pub use literal::Lit;
pub use literal::Var;
pub use option_error::OptionError;
pub use origin::Origin;
pub use solution::Solution;
pub use solve_state::SolveState;
