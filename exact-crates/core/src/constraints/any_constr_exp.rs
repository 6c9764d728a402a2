use num::BigInt;
use num::Integer;
use num::Signed;

use super::AssertionStatus;
use super::CePtr;
use super::ConstrExp;
use super::ConstrExpPool;
use super::ConstrSimple;
use crate::arithmetic::bit_limit;
use crate::arithmetic::convert;
use crate::arithmetic::Coefficient;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::basic_types::Var;
use crate::engine::DivisionPolicy;
use crate::engine::Trail;
use crate::exact_assert_moderate;
use crate::exact_assert_simple;
use crate::proof::ProofId;
use crate::proof::ProofLog;

/// Applies `$body` to the expression inside an [`AnyCe`], whatever its width.
macro_rules! dispatch {
    ($value:expr, $ce:ident => $body:expr) => {
        match $value {
            AnyCe::Ce32($ce) => $body,
            AnyCe::Ce64($ce) => $body,
            AnyCe::Ce96($ce) => $body,
            AnyCe::Ce128($ce) => $body,
            AnyCe::CeArb($ce) => $body,
        }
    };
}

/// The coefficient widths of [`ConstrExp`], ordered from narrow to wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Width {
    W32,
    W64,
    W96,
    W128,
    Arbitrary,
}

impl Width {
    pub(crate) fn bit_limit(self) -> Option<u32> {
        match self {
            Width::W32 => bit_limit::<i32, i64>(),
            Width::W64 => bit_limit::<i64, i128>(),
            Width::W96 => bit_limit::<i128, i128>(),
            Width::W128 => bit_limit::<i128, BigInt>(),
            Width::Arbitrary => None,
        }
    }

    /// The narrowest width which holds values of `bits` magnitude bits.
    pub(crate) fn fitting(bits: u32) -> Width {
        [Width::W32, Width::W64, Width::W96, Width::W128]
            .into_iter()
            .find(|width| width.bit_limit().is_some_and(|limit| bits <= limit))
            .unwrap_or(Width::Arbitrary)
    }

    #[cfg(test)]
    pub(crate) fn next(self) -> Width {
        match self {
            Width::W32 => Width::W64,
            Width::W64 => Width::W96,
            Width::W96 => Width::W128,
            Width::W128 | Width::Arbitrary => Width::Arbitrary,
        }
    }
}

/// One pool per width.
#[derive(Debug, Default)]
pub(crate) struct ConstrExpPools {
    pub(crate) ce32: ConstrExpPool<i32, i64>,
    pub(crate) ce64: ConstrExpPool<i64, i128>,
    pub(crate) ce96: ConstrExpPool<i128, i128>,
    pub(crate) ce128: ConstrExpPool<i128, BigInt>,
    pub(crate) ce_arb: ConstrExpPool<BigInt, BigInt>,
}

impl ConstrExpPools {
    pub(crate) fn resize(&self, num_vars: usize) {
        self.ce32.resize(num_vars);
        self.ce64.resize(num_vars);
        self.ce96.resize(num_vars);
        self.ce128.resize(num_vars);
        self.ce_arb.resize(num_vars);
    }

    pub(crate) fn set_proof_logging(&self, enabled: bool) {
        self.ce32.set_proof_logging(enabled);
        self.ce64.set_proof_logging(enabled);
        self.ce96.set_proof_logging(enabled);
        self.ce128.set_proof_logging(enabled);
        self.ce_arb.set_proof_logging(enabled);
    }

    /// The number of expressions allocated over all widths.
    pub(crate) fn num_created(&self) -> usize {
        self.ce32.num_created()
            + self.ce64.num_created()
            + self.ce96.num_created()
            + self.ce128.num_created()
            + self.ce_arb.num_created()
    }

    pub(crate) fn take(&self, width: Width) -> AnyCe {
        match width {
            Width::W32 => AnyCe::Ce32(self.ce32.take()),
            Width::W64 => AnyCe::Ce64(self.ce64.take()),
            Width::W96 => AnyCe::Ce96(self.ce96.take()),
            Width::W128 => AnyCe::Ce128(self.ce128.take()),
            Width::Arbitrary => AnyCe::CeArb(self.ce_arb.take()),
        }
    }

    /// Builds an expression from `constraint` in the narrowest width that holds it.
    pub(crate) fn take_from_simple<C: Coefficient>(
        &self,
        constraint: &ConstrSimple<C>,
        origin: Origin,
    ) -> AnyCe {
        let mut ce = self.ce_arb.take();
        for term in &constraint.terms {
            ce.add_lhs(&term.coefficient.to_big(), term.lit);
        }
        ce.add_rhs(&constraint.rhs.to_big());
        ce.origin = origin;
        AnyCe::CeArb(ce).into_smallest(self)
    }
}

/// A pooled [`ConstrExp`] of any of the supported widths.
#[derive(Debug)]
pub(crate) enum AnyCe {
    Ce32(CePtr<i32, i64>),
    Ce64(CePtr<i64, i128>),
    Ce96(CePtr<i128, i128>),
    Ce128(CePtr<i128, BigInt>),
    CeArb(CePtr<BigInt, BigInt>),
}

impl AnyCe {
    pub(crate) fn width(&self) -> Width {
        match self {
            AnyCe::Ce32(_) => Width::W32,
            AnyCe::Ce64(_) => Width::W64,
            AnyCe::Ce96(_) => Width::W96,
            AnyCe::Ce128(_) => Width::W128,
            AnyCe::CeArb(_) => Width::Arbitrary,
        }
    }

    /// A copy of this expression in the given width, which must hold its values.
    pub(crate) fn copy_into(&self, width: Width, pools: &ConstrExpPools) -> AnyCe {
        let mut target = pools.take(width);
        dispatch!(&mut target, target_ce => dispatch!(self, ce => target_ce.copy_from(&**ce)));
        target
    }

    /// Moves the expression to a width at least as wide as `width`.
    pub(crate) fn promote_to(self, width: Width, pools: &ConstrExpPools) -> AnyCe {
        if self.width() >= width {
            self
        } else {
            self.copy_into(width, pools)
        }
    }

    /// Moves the expression to the narrowest width that holds it.
    pub(crate) fn into_smallest(self, pools: &ConstrExpPools) -> AnyCe {
        let width = Width::fitting(self.max_bits());
        if width == self.width() {
            self
        } else {
            self.copy_into(width, pools)
        }
    }

    pub(crate) fn set_origin(&mut self, origin: Origin) {
        dispatch!(self, ce => ce.origin = origin);
    }

    pub(crate) fn vars(&self) -> &[Var] {
        dispatch!(self, ce => ce.vars())
    }

    pub(crate) fn len(&self) -> usize {
        dispatch!(self, ce => ce.len())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lit(&self, var: Var) -> Lit {
        dispatch!(self, ce => ce.lit(var))
    }

    pub(crate) fn lits(&self) -> Vec<Lit> {
        self.vars().iter().map(|&var| self.lit(var)).collect()
    }

    #[cfg(test)]
    pub(crate) fn degree_big(&self) -> BigInt {
        dispatch!(self, ce => ce.degree().to_big())
    }

    /// The normalised coefficient of `lit`, see [`ConstrExp::coef_of_lit`].
    pub(crate) fn coef_of_lit_big(&self, lit: Lit) -> BigInt {
        dispatch!(self, ce => ce.coef_of_lit(lit).to_big())
    }

    pub(crate) fn contains_lit(&self, lit: Lit) -> bool {
        dispatch!(self, ce => ce.coef_of_lit(lit).is_positive())
    }

    pub(crate) fn max_bits(&self) -> u32 {
        dispatch!(self, ce => ce.max_bits())
    }

    pub(crate) fn is_trivial(&self) -> bool {
        dispatch!(self, ce => ce.is_trivial())
    }

    pub(crate) fn is_infeasible(&self) -> bool {
        dispatch!(self, ce => ce.is_infeasible())
    }

    pub(crate) fn is_clause(&self) -> bool {
        dispatch!(self, ce => ce.is_clause())
    }

    pub(crate) fn is_cardinality(&self) -> bool {
        dispatch!(self, ce => ce.is_cardinality())
    }

    pub(crate) fn cardinality_degree(&self) -> usize {
        dispatch!(self, ce => ce.cardinality_degree())
    }

    pub(crate) fn is_conflicting(&self, trail: &Trail) -> bool {
        dispatch!(self, ce => ce.slack(trail).is_negative())
    }

    pub(crate) fn assertion_status(&self, trail: &Trail, level: u32) -> AssertionStatus {
        dispatch!(self, ce => ce.assertion_status(trail, level))
    }

    pub(crate) fn assertion_level(&self, trail: &Trail) -> Option<u32> {
        dispatch!(self, ce => ce.assertion_level(trail))
    }

    pub(crate) fn lbd(&self, trail: &Trail) -> u32 {
        dispatch!(self, ce => ce.lbd(trail))
    }

    pub(crate) fn saturate(&mut self) -> bool {
        dispatch!(self, ce => ce.saturate())
    }

    pub(crate) fn saturate_vars(&mut self, vars: &[Var]) {
        dispatch!(self, ce => ce.saturate_vars(vars));
    }

    pub(crate) fn weaken_non_falsified(&mut self, is_falsified: impl Fn(Lit) -> bool) {
        dispatch!(self, ce => ce.weaken_non_falsified(is_falsified));
    }

    pub(crate) fn substitute(&mut self, lit: Lit, replacement: Lit, clause_id: ProofId) {
        dispatch!(self, ce => ce.substitute(lit, replacement, clause_id));
    }

    pub(crate) fn is_saturated_lit(&self, lit: Lit) -> bool {
        dispatch!(self, ce => ce.is_saturated_lit(lit))
    }

    pub(crate) fn remove_units(&mut self, trail: &Trail) {
        dispatch!(self, ce => ce.remove_units(trail));
    }

    pub(crate) fn fix_overflow(
        &mut self,
        is_falsified: impl Fn(Lit) -> bool,
        bit_overflow: u32,
        bit_reduce: u32,
        asserting: Option<Lit>,
    ) -> bool {
        dispatch!(self, ce => ce.fix_overflow(is_falsified, bit_overflow, bit_reduce, asserting))
    }

    pub(crate) fn to_simple(&self) -> ConstrSimple<BigInt> {
        dispatch!(self, ce => ce.to_simple())
    }

    pub(crate) fn set_proof_id(&mut self, id: ProofId) {
        dispatch!(self, ce => ce.set_proof_id(id));
    }

    pub(crate) fn log_derivation(&mut self, proof_log: &mut ProofLog) -> ProofId {
        dispatch!(self, ce => ce.log_derivation(proof_log))
    }

    pub(crate) fn log_as_rup(&mut self, proof_log: &mut ProofLog) -> ProofId {
        dispatch!(self, ce => ce.log_as_rup(proof_log))
    }

    pub(crate) fn reduce_for_resolution(&mut self, lit: Lit, trail: &Trail, policy: DivisionPolicy) {
        dispatch!(self, ce => ce.reduce_for_resolution(lit, trail, policy));
    }

    /// Self-subsumption of `~lit` with the reason of `lit`, see [`ConstrExp::subsume_with`].
    pub(crate) fn subsume_with(&mut self, reason: &AnyCe, lit: Lit, trail: &Trail) -> u32 {
        dispatch!(self, ce => dispatch!(reason, other => ce.subsume_with(&**other, lit, trail)))
    }

    /// Resolves this conflicting expression on `~lit` with `reason`, the reason for `lit`.
    ///
    /// The reason is first reduced according to `policy`; both sides are then moved to a width
    /// that holds the scaled sum. Afterwards the coefficients are brought back below
    /// `bits_overflow` bits if they grew beyond it. Returns whether the expression was promoted
    /// to a wider type.
    #[allow(
        clippy::too_many_arguments,
        reason = "the limits are part of the analysis configuration"
    )]
    pub(crate) fn resolve_with(
        &mut self,
        mut reason: AnyCe,
        lit: Lit,
        trail: &Trail,
        policy: DivisionPolicy,
        bits_overflow: u32,
        bits_reduced: u32,
        pools: &ConstrExpPools,
    ) -> bool {
        exact_assert_simple!(self.contains_lit(!lit));
        exact_assert_simple!(reason.contains_lit(lit));

        reason.reduce_for_resolution(lit, trail, policy);

        let own_coef = self.coef_of_lit_big(!lit);
        let reason_coef = reason.coef_of_lit_big(lit);
        let gcd = own_coef.gcd(&reason_coef);
        let own_factor = &reason_coef / &gcd;
        let reason_factor = &own_coef / &gcd;

        let predicted_bits = (self.max_bits() + own_factor.bits() as u32)
            .max(reason.max_bits() + reason_factor.bits() as u32)
            + 1;
        let width = self
            .width()
            .max(reason.width())
            .max(Width::fitting(predicted_bits));
        let promoted = width != self.width();

        let current = std::mem::replace(self, pools.take(Width::W32));
        *self = current.promote_to(width, pools);
        let reason = reason.promote_to(width, pools);

        match (&mut *self, &reason) {
            (AnyCe::Ce32(ce), AnyCe::Ce32(other)) => resolve(ce, other, &own_factor, &reason_factor),
            (AnyCe::Ce64(ce), AnyCe::Ce64(other)) => resolve(ce, other, &own_factor, &reason_factor),
            (AnyCe::Ce96(ce), AnyCe::Ce96(other)) => resolve(ce, other, &own_factor, &reason_factor),
            (AnyCe::Ce128(ce), AnyCe::Ce128(other)) => resolve(ce, other, &own_factor, &reason_factor),
            (AnyCe::CeArb(ce), AnyCe::CeArb(other)) => resolve(ce, other, &own_factor, &reason_factor),
            _ => unreachable!("both sides were promoted to the same width"),
        }

        let _ = self.fix_overflow(|other| trail.is_false(other), bits_overflow, bits_reduced, None);

        exact_assert_simple!(!self.coef_of_lit_big(!lit).is_positive());
        exact_assert_moderate!(self.is_conflicting(trail));
        promoted
    }
}

fn resolve<S: Coefficient, L: Coefficient>(
    ce: &mut ConstrExp<S, L>,
    reason: &ConstrExp<S, L>,
    own_factor: &BigInt,
    reason_factor: &BigInt,
) {
    ce.resolve_same_width(reason, &convert(own_factor), &convert(reason_factor));
}

impl std::fmt::Display for AnyCe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        dispatch!(self, ce => std::fmt::Display::fmt(&**ce, f))
    }
}

#[cfg(test)]
mod tests {
    use num::BigInt;
    use num::Zero;

    use super::*;
    use crate::basic_types::CRef;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    fn pools(num_vars: usize) -> ConstrExpPools {
        let pools = ConstrExpPools::default();
        pools.resize(num_vars);
        pools
    }

    #[test]
    fn widths_are_ordered_by_bit_limit() {
        assert_eq!(Width::fitting(1), Width::W32);
        assert_eq!(Width::fitting(30), Width::W32);
        assert_eq!(Width::fitting(31), Width::W64);
        assert_eq!(Width::fitting(94), Width::W96);
        assert_eq!(Width::fitting(126), Width::W128);
        assert_eq!(Width::fitting(127), Width::Arbitrary);
        assert_eq!(Width::W128.next(), Width::Arbitrary);
    }

    #[test]
    fn simple_constraints_land_in_the_smallest_width() {
        let pools = pools(4);
        let small = ConstrSimple::new([(3_i64, lit(1)), (-2, lit(2))], 1);
        assert_eq!(pools.take_from_simple(&small, Origin::Formula).width(), Width::W32);

        let big: BigInt = BigInt::from(1) << 100;
        let large = ConstrSimple::new([(big.clone(), lit(1)), (BigInt::from(1), lit(2))], big.clone());
        let ce = pools.take_from_simple(&large, Origin::Formula);
        assert_eq!(ce.width(), Width::W128);
        assert_eq!(ce.coef_of_lit_big(lit(1)), big);
    }

    #[test]
    fn resolution_promotes_when_coefficients_grow() {
        let pools = pools(4);
        let mut trail = Trail::default();
        trail.grow(4);
        trail.new_level();
        trail.enqueue(lit(-2), CRef::UNDEF);
        trail.enqueue(lit(-3), CRef::UNDEF);
        trail.enqueue(lit(1), CRef::UNDEF);

        let large: BigInt = (BigInt::from(1) << 29) + 1;
        // conflict: large * ~x1 + x2 >= large, reason of x1: x1 + x3 >= 1
        let conflict = ConstrSimple::new([(large.clone(), lit(-1)), (BigInt::from(1), lit(2))], large.clone());
        let reason = ConstrSimple::new([(1_i32, lit(1)), (1, lit(3))], 1);
        let mut ce = pools.take_from_simple(&conflict, Origin::Learned);
        let reason = pools.take_from_simple(&reason, Origin::Formula);
        assert_eq!(ce.width(), Width::W32);
        assert!(ce.is_conflicting(&trail));

        let promoted = ce.resolve_with(reason, lit(1), &trail, DivisionPolicy::RoundToOne, 0, 0, &pools);

        assert!(promoted);
        assert_eq!(ce.width(), Width::W64);
        assert!(ce.coef_of_lit_big(lit(1)).is_zero());
        assert!(ce.is_conflicting(&trail));
    }

    #[test]
    fn clause_resolution() {
        let pools = pools(3);
        let mut trail = Trail::default();
        trail.grow(3);
        trail.new_level();
        trail.enqueue(lit(-2), CRef::UNDEF);
        trail.enqueue(lit(1), CRef::UNDEF);

        // x1 or x2 propagated x1; ~x1 or x2 is conflicting
        let mut conflict = pools.take_from_simple(&ConstrSimple::<i32>::clause([lit(-1), lit(2)]), Origin::Formula);
        let reason = pools.take_from_simple(&ConstrSimple::<i32>::clause([lit(1), lit(2)]), Origin::Formula);

        let promoted = conflict.resolve_with(reason, lit(1), &trail, DivisionPolicy::SlackPlusOne, 62, 29, &pools);

        assert!(!promoted);
        assert_eq!(conflict.lits(), vec![lit(2)]);
        assert_eq!(conflict.degree_big(), BigInt::from(1));
    }
}
