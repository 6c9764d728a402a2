//! Linear constraints in the forms used by the solver: [`ConstrSimple`] for ingestion, and the
//! arithmetic working form `ConstrExp` in five coefficient widths.
mod any_constr_exp;
mod constr_exp;
mod constr_exp_pool;
mod constr_simple;

pub(crate) use any_constr_exp::*;
pub(crate) use constr_exp::*;
pub(crate) use constr_exp_pool::*;
pub use constr_simple::*;
