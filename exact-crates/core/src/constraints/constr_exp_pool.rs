use std::cell::RefCell;
use std::ops::Deref;
use std::ops::DerefMut;
use std::rc::Rc;

use super::ConstrExp;
use crate::arithmetic::Coefficient;
use crate::exact_assert_moderate;

#[derive(Debug)]
struct PoolStorage<S, L> {
    free: Vec<Box<ConstrExp<S, L>>>,
    num_vars: usize,
    proof_logging: bool,
    num_created: usize,
}

/// A free-list of reusable [`ConstrExp`]s of one width.
///
/// Taking an expression from the pool hands out a [`CePtr`]; when the last handle is dropped the
/// expression is reset and returned to the pool, so its dense buffers are allocated only once.
#[derive(Debug)]
pub(crate) struct ConstrExpPool<S, L> {
    storage: Rc<RefCell<PoolStorage<S, L>>>,
}

impl<S, L> Default for ConstrExpPool<S, L> {
    fn default() -> Self {
        ConstrExpPool {
            storage: Rc::new(RefCell::new(PoolStorage {
                free: Vec::new(),
                num_vars: 0,
                proof_logging: false,
                num_created: 0,
            })),
        }
    }
}

impl<S: Coefficient, L: Coefficient> ConstrExpPool<S, L> {
    /// Hands out an empty expression over the current number of variables.
    pub(crate) fn take(&self) -> CePtr<S, L> {
        let mut storage = self.storage.borrow_mut();
        let num_vars = storage.num_vars;
        let proof_logging = storage.proof_logging;

        let mut ce = match storage.free.pop() {
            Some(ce) => ce,
            None => {
                storage.num_created += 1;
                Box::new(ConstrExp::new(num_vars))
            }
        };
        exact_assert_moderate!(ce.is_reset());
        ce.resize(num_vars);
        ce.enable_proof(proof_logging);

        CePtr {
            ce: Some(ce),
            pool: Rc::clone(&self.storage),
        }
    }

    /// Expressions handed out from now on cover `num_vars` variables. Free expressions are grown
    /// lazily when they are taken.
    pub(crate) fn resize(&self, num_vars: usize) {
        let mut storage = self.storage.borrow_mut();
        storage.num_vars = storage.num_vars.max(num_vars);
    }

    pub(crate) fn set_proof_logging(&self, enabled: bool) {
        self.storage.borrow_mut().proof_logging = enabled;
    }

    #[cfg(test)]
    pub(crate) fn num_free(&self) -> usize {
        self.storage.borrow().free.len()
    }

    pub(crate) fn num_created(&self) -> usize {
        self.storage.borrow().num_created
    }
}

/// An exclusive handle to an expression taken from a [`ConstrExpPool`].
#[derive(Debug)]
pub(crate) struct CePtr<S: Coefficient, L: Coefficient> {
    ce: Option<Box<ConstrExp<S, L>>>,
    pool: Rc<RefCell<PoolStorage<S, L>>>,
}

impl<S: Coefficient, L: Coefficient> Deref for CePtr<S, L> {
    type Target = ConstrExp<S, L>;

    fn deref(&self) -> &Self::Target {
        self.ce
            .as_deref()
            .unwrap_or_else(|| unreachable!("the expression is only taken when dropping"))
    }
}

impl<S: Coefficient, L: Coefficient> DerefMut for CePtr<S, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ce
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("the expression is only taken when dropping"))
    }
}

impl<S: Coefficient, L: Coefficient> Drop for CePtr<S, L> {
    fn drop(&mut self) {
        if let Some(mut ce) = self.ce.take() {
            ce.reset();
            // the pool may be borrowed if a handle is dropped while taking a new one
            if let Ok(mut storage) = self.pool.try_borrow_mut() {
                storage.free.push(ce);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use num::BigInt;

    use super::*;
    use crate::basic_types::Lit;

    #[test]
    fn expressions_are_recycled() {
        let pool = ConstrExpPool::<i32, i64>::default();
        pool.resize(4);

        {
            let mut ce = pool.take();
            ce.add_lhs(&3, Lit::from_dimacs(2));
            ce.add_rhs(&2);
            assert_eq!(ce.len(), 1);
        }
        assert_eq!(pool.num_free(), 1);

        let ce = pool.take();
        assert!(ce.is_reset());
        assert_eq!(pool.num_free(), 0);
        assert_eq!(pool.num_created(), 1);
    }

    #[test]
    fn taken_expressions_cover_new_variables() {
        let pool = ConstrExpPool::<BigInt, BigInt>::default();
        pool.resize(2);
        drop(pool.take());

        pool.resize(10);
        let mut ce = pool.take();
        assert_eq!(ce.num_vars(), 10);
        ce.add_lhs(&BigInt::from(1), Lit::from_dimacs(-10));
        assert_eq!(*ce.degree(), BigInt::from(0));
    }
}
