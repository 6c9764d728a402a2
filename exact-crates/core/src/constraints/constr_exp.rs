use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use itertools::Itertools;
use num::BigInt;

use super::ConstrSimple;
use crate::arithmetic::ceil_div;
use crate::arithmetic::convert;
use crate::arithmetic::negative_part;
use crate::arithmetic::power_of_two;
use crate::arithmetic::smallest_divisor_above;
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

/// How many candidates past the slack are tried when looking for a small divisor.
const DIVISOR_SEARCH_WINDOW: u32 = 64;

/// The status of a constraint with respect to the assignment below some decision level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AssertionStatus {
    /// The slack is negative.
    Conflicting,
    /// The slack is non-negative but smaller than the coefficient of an unassigned literal.
    Asserting,
    NonAsserting,
}

/// A linear constraint `Σ c_v * x_v >= rhs` over a dense range of variables, used as the
/// working representation during conflict analysis and constraint construction.
///
/// Coefficients are stored per variable with a sign ("variable form"). The equivalent
/// normalised form over literals with non-negative coefficients (`c * ~x` for a negative
/// coefficient on `x`) has right-hand side `degree = rhs + Σ_{c_v < 0} |c_v|`; both are kept up
/// to date. `Small` holds individual coefficients, `Large` holds sums of coefficients.
#[derive(Clone, Debug)]
pub(crate) struct ConstrExp<Small, Large> {
    vars: Vec<Var>,
    /// The position of a variable in `vars`, or -1
    index: Vec<i32>,
    coefs: Vec<Small>,
    rhs: Large,
    degree: Large,
    pub(crate) origin: Origin,
    /// The derivation of the constraint in postfix notation, if proofs are logged
    proof: Option<String>,
}

impl<S: Coefficient, L: Coefficient> ConstrExp<S, L> {
    pub(crate) fn new(num_vars: usize) -> ConstrExp<S, L> {
        ConstrExp {
            vars: Vec::new(),
            index: vec![-1; num_vars + 1],
            coefs: vec![S::zero(); num_vars + 1],
            rhs: L::zero(),
            degree: L::zero(),
            origin: Origin::Formula,
            proof: None,
        }
    }

    pub(crate) fn num_vars(&self) -> usize {
        self.coefs.len() - 1
    }

    pub(crate) fn resize(&mut self, num_vars: usize) {
        if self.coefs.len() < num_vars + 1 {
            self.coefs.resize(num_vars + 1, S::zero());
            self.index.resize(num_vars + 1, -1);
        }
    }

    /// Clears the constraint to `0 >= 0`.
    pub(crate) fn reset(&mut self) {
        for var in self.vars.drain(..) {
            let position = var.index() as usize;
            self.coefs[position] = S::zero();
            self.index[position] = -1;
        }
        self.rhs = L::zero();
        self.degree = L::zero();
        self.origin = Origin::Formula;
        if let Some(proof) = self.proof.as_mut() {
            proof.clear();
        }
    }

    pub(crate) fn is_reset(&self) -> bool {
        self.vars.is_empty()
            && self.rhs.is_zero()
            && self.degree.is_zero()
            && self.proof.as_ref().is_none_or(String::is_empty)
    }

    pub(crate) fn enable_proof(&mut self, enabled: bool) {
        self.proof = enabled.then(String::new);
    }

    pub(crate) fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub(crate) fn len(&self) -> usize {
        self.vars.len()
    }

    pub(crate) fn degree(&self) -> &L {
        &self.degree
    }

    #[cfg(test)]
    pub(crate) fn rhs(&self) -> &L {
        &self.rhs
    }

    /// The signed coefficient of `var`.
    pub(crate) fn coef(&self, var: Var) -> S {
        self.coefs
            .get(var.index() as usize)
            .cloned()
            .unwrap_or_else(S::zero)
    }

    /// The literal of `var` in normalised form.
    pub(crate) fn lit(&self, var: Var) -> Lit {
        Lit::new(var, !self.coef(var).is_negative())
    }

    /// The coefficient of `var` in normalised form.
    pub(crate) fn abs_coef(&self, var: Var) -> S {
        self.coef(var).abs()
    }

    /// The normalised coefficient of `lit`: positive if `lit` occurs, negative if `~lit` occurs.
    pub(crate) fn coef_of_lit(&self, lit: Lit) -> S {
        let coef = self.coef(lit.var());
        if lit.is_positive() {
            coef
        } else {
            -coef
        }
    }

    /// The terms in normalised form.
    pub(crate) fn terms(&self) -> impl Iterator<Item = (S, Lit)> + '_ {
        self.vars
            .iter()
            .map(|&var| (self.abs_coef(var), self.lit(var)))
    }

    pub(crate) fn largest_coef(&self) -> S {
        self.vars
            .iter()
            .map(|&var| self.abs_coef(var))
            .max()
            .unwrap_or_else(S::zero)
    }

    /// The number of bits needed for the largest coefficient and the degree.
    pub(crate) fn max_bits(&self) -> u32 {
        self.largest_coef().num_bits().max(self.degree.num_bits())
    }

    /// The sum of all normalised coefficients.
    pub(crate) fn coef_sum(&self) -> L {
        self.vars
            .iter()
            .fold(L::zero(), |sum, &var| sum + convert::<S, L>(&self.abs_coef(var)))
    }

    pub(crate) fn is_trivial(&self) -> bool {
        !self.degree.is_positive()
    }

    /// Whether the constraint cannot be satisfied by any assignment.
    pub(crate) fn is_infeasible(&self) -> bool {
        self.coef_sum() < self.degree
    }

    fn ensure_var(&mut self, var: Var) {
        let position = var.index() as usize;
        if position >= self.coefs.len() {
            self.resize(position);
        }
    }

    fn remove_from_list(&mut self, var: Var) {
        let position = self.index[var.index() as usize];
        exact_assert_moderate!(position >= 0);
        let _ = self.vars.swap_remove(position as usize);
        if let Some(&moved) = self.vars.get(position as usize) {
            self.index[moved.index() as usize] = position;
        }
        self.index[var.index() as usize] = -1;
    }

    /// Adds `delta` to the signed coefficient of `var`, keeping the degree consistent.
    fn add_to_var(&mut self, var: Var, delta: &S) {
        if delta.is_zero() {
            return;
        }
        self.ensure_var(var);
        let position = var.index() as usize;

        let old = self.coefs[position].clone();
        let new = old.clone() + delta.clone();
        self.degree = self.degree.clone() + convert::<S, L>(&negative_part(&new))
            - convert::<S, L>(&negative_part(&old));

        if old.is_zero() {
            self.index[position] = self.vars.len() as i32;
            self.vars.push(var);
        }
        self.coefs[position] = new;
        if self.coefs[position].is_zero() {
            self.remove_from_list(var);
        }
    }

    /// Adds `coef * lit` to the left-hand side.
    pub(crate) fn add_lhs(&mut self, coef: &S, lit: Lit) {
        if lit.is_positive() {
            self.add_to_var(lit.var(), coef);
        } else {
            // c * ~x = c - c * x
            self.add_to_var(lit.var(), &-coef.clone());
            self.add_rhs(&-convert::<S, L>(coef));
        }
    }

    /// Adds `delta` to the right-hand side (and hence to the degree).
    pub(crate) fn add_rhs(&mut self, delta: &L) {
        self.rhs = self.rhs.clone() + delta.clone();
        self.degree = self.degree.clone() + delta.clone();
    }

    /// Removes the term of `var`, lowering the degree by its coefficient.
    pub(crate) fn weaken(&mut self, var: Var) {
        let coef = self.coef(var);
        if coef.is_zero() {
            return;
        }
        let position = var.index() as usize;
        let magnitude = convert::<S, L>(&coef.abs());
        if coef.is_positive() {
            self.rhs = self.rhs.clone() - magnitude.clone();
        }
        self.degree = self.degree.clone() - magnitude;
        self.coefs[position] = S::zero();
        self.remove_from_list(var);
        self.push_proof(format_args!("{var} w "));
    }

    /// Removes the term of `var` without changing the degree. This is only sound if the literal
    /// of `var` is false, or is implied to be irrelevant in some other way.
    pub(crate) fn strengthen_by_removing(&mut self, var: Var) {
        let coef = self.coef(var);
        if coef.is_zero() {
            return;
        }
        if coef.is_negative() {
            self.rhs = self.rhs.clone() + convert::<S, L>(&-coef);
        }
        self.coefs[var.index() as usize] = S::zero();
        self.remove_from_list(var);
    }

    /// Replaces `lit` by `replacement` by adding the clause `~lit + replacement >= 1`, derived on
    /// proof line `clause_id`, scaled by the coefficient of `lit`.
    pub(crate) fn substitute(&mut self, lit: Lit, replacement: Lit, clause_id: ProofId) {
        let coef = self.coef_of_lit(lit);
        if !coef.is_positive() {
            return;
        }
        self.add_lhs(&coef, !lit);
        self.add_lhs(&coef, replacement);
        self.add_rhs(&convert::<S, L>(&coef));
        self.push_proof(format_args!("{clause_id} {coef} * + "));
    }

    /// Whether `lit` occurs with a coefficient of at least the degree.
    pub(crate) fn is_saturated_lit(&self, lit: Lit) -> bool {
        let coef = self.coef_of_lit(lit);
        coef.is_positive() && convert::<S, L>(&coef) >= self.degree
    }

    /// Weakens all literals which are not falsified.
    pub(crate) fn weaken_non_falsified(&mut self, is_falsified: impl Fn(Lit) -> bool) {
        for position in (0..self.vars.len()).rev() {
            let var = self.vars[position];
            if !is_falsified(self.lit(var)) {
                self.weaken(var);
            }
        }
    }

    /// Weakens the literals which are not falsified and whose coefficient is not divisible by
    /// `divisor`, except for `keep`.
    pub(crate) fn weaken_non_divisible_non_falsified(
        &mut self,
        divisor: &L,
        is_falsified: impl Fn(Lit) -> bool,
        keep: Option<Lit>,
    ) {
        for position in (0..self.vars.len()).rev() {
            let var = self.vars[position];
            let lit = self.lit(var);
            if Some(lit) == keep || is_falsified(lit) {
                continue;
            }
            if !(convert::<S, L>(&self.abs_coef(var)) % divisor.clone()).is_zero() {
                self.weaken(var);
            }
        }
    }

    /// Clamps every normalised coefficient to the degree. Returns whether anything changed.
    pub(crate) fn saturate(&mut self) -> bool {
        if self.vars.is_empty() {
            return false;
        }
        if !self.degree.is_positive() {
            for var in std::mem::take(&mut self.vars) {
                self.coefs[var.index() as usize] = S::zero();
                self.index[var.index() as usize] = -1;
            }
            self.rhs = L::zero();
            self.degree = L::zero();
            self.push_proof(format_args!("s "));
            return true;
        }

        let degree = self.degree.clone();
        let mut changed = false;
        for position in 0..self.vars.len() {
            let var = self.vars[position];
            let coef = self.coefs[var.index() as usize].clone();
            let magnitude = convert::<S, L>(&coef.abs());
            if magnitude <= degree {
                continue;
            }
            changed = true;
            let clamped = convert::<L, S>(&degree);
            if coef.is_positive() {
                self.coefs[var.index() as usize] = clamped;
            } else {
                // keeps the degree unchanged
                self.rhs = self.rhs.clone() + magnitude - degree.clone();
                self.coefs[var.index() as usize] = -clamped;
            }
        }
        if changed {
            self.push_proof(format_args!("s "));
        }
        changed
    }

    /// Saturates only the given variables.
    pub(crate) fn saturate_vars(&mut self, vars: &[Var]) {
        if !self.degree.is_positive() {
            let _ = self.saturate();
            return;
        }
        let degree = self.degree.clone();
        for &var in vars {
            let coef = self.coef(var);
            let magnitude = convert::<S, L>(&coef.abs());
            if magnitude > degree {
                let clamped = convert::<L, S>(&degree);
                if coef.is_positive() {
                    self.coefs[var.index() as usize] = clamped;
                } else {
                    self.rhs = self.rhs.clone() + magnitude - degree.clone();
                    self.coefs[var.index() as usize] = -clamped;
                }
            }
        }
        self.push_proof(format_args!("s "));
    }

    #[cfg(test)]
    pub(crate) fn is_saturated(&self) -> bool {
        self.vars
            .iter()
            .all(|&var| convert::<S, L>(&self.abs_coef(var)) <= self.degree)
    }

    /// Divides all normalised coefficients and the degree by `divisor`, rounding up.
    pub(crate) fn divide_round_up(&mut self, divisor: &L) {
        exact_assert_simple!(divisor.is_positive());
        if divisor.is_one() {
            return;
        }

        let mut negative_sum = L::zero();
        for &var in &self.vars {
            let position = var.index() as usize;
            let coef = &self.coefs[position];
            let divided: L = ceil_div(&convert::<S, L>(&coef.abs()), divisor);
            if coef.is_negative() {
                negative_sum = negative_sum + divided.clone();
                self.coefs[position] = -convert::<L, S>(&divided);
            } else {
                self.coefs[position] = convert::<L, S>(&divided);
            }
        }
        self.degree = ceil_div(&self.degree, divisor);
        self.rhs = self.degree.clone() - negative_sum;
        self.push_proof(format_args!("{divisor} d "));
    }

    pub(crate) fn multiply(&mut self, factor: &S) {
        exact_assert_simple!(factor.is_positive());
        if factor.is_one() {
            return;
        }
        for &var in &self.vars {
            let position = var.index() as usize;
            self.coefs[position] = self.coefs[position].clone() * factor.clone();
        }
        let factor_large = convert::<S, L>(factor);
        self.rhs = self.rhs.clone() * factor_large.clone();
        self.degree = self.degree.clone() * factor_large;
        self.push_proof(format_args!("{factor} * "));
    }

    /// Adds `factor * other` to this constraint.
    pub(crate) fn add_scaled(&mut self, other: &ConstrExp<S, L>, factor: &S) {
        exact_assert_simple!(factor.is_positive());
        for &var in &other.vars {
            let delta = other.coefs[var.index() as usize].clone() * factor.clone();
            self.add_to_var(var, &delta);
        }
        self.add_rhs(&(other.rhs.clone() * convert::<S, L>(factor)));

        if let (Some(proof), Some(other_proof)) = (self.proof.as_mut(), other.proof.as_ref()) {
            let had_derivation = !proof.is_empty();
            proof.push_str(other_proof);
            if !factor.is_one() {
                let _ = write!(proof, "{factor} * ");
            }
            if had_derivation {
                proof.push_str("+ ");
            }
        }
    }

    /// Overwrites this constraint with a copy of `other`, which may be of a different width.
    pub(crate) fn copy_from<S2: Coefficient, L2: Coefficient>(&mut self, other: &ConstrExp<S2, L2>) {
        self.reset();
        self.resize(other.num_vars());
        for &var in &other.vars {
            let position = var.index() as usize;
            self.index[position] = self.vars.len() as i32;
            self.vars.push(var);
            self.coefs[position] = convert::<S2, S>(&other.coef(var));
        }
        self.rhs = convert::<L2, L>(&other.rhs);
        self.degree = convert::<L2, L>(&other.degree);
        self.origin = other.origin;
        if let (Some(proof), Some(other_proof)) = (self.proof.as_mut(), other.proof.as_ref()) {
            proof.push_str(other_proof);
        }
    }

    /// Divides the constraint when its largest coefficient or degree needs more than
    /// `bit_overflow` bits, such that the result needs at most `bit_reduce` bits.
    ///
    /// Falsified literals and the `asserting` literal are rounded up instead of weakened, so the
    /// constraint stays conflicting or asserting if it was. Returns whether anything changed.
    pub(crate) fn fix_overflow(
        &mut self,
        is_falsified: impl Fn(Lit) -> bool,
        bit_overflow: u32,
        bit_reduce: u32,
        asserting: Option<Lit>,
    ) -> bool {
        exact_assert_simple!(bit_reduce > 0 && bit_reduce <= bit_overflow || bit_overflow == 0);
        if bit_overflow == 0 {
            return false;
        }
        let largest = convert::<S, L>(&self.largest_coef()).max(self.degree.clone());
        if largest.num_bits() <= bit_overflow {
            return false;
        }

        let divisor = ceil_div(&largest, &(power_of_two::<L>(bit_reduce) - L::one()));
        self.weaken_non_divisible_non_falsified(&divisor, is_falsified, asserting);
        self.divide_round_up(&divisor);
        let _ = self.saturate();
        true
    }

    /// Prepares a reason for resolution on `lit` by dividing it according to `policy`.
    pub(crate) fn reduce_for_resolution(&mut self, lit: Lit, trail: &Trail, policy: DivisionPolicy) {
        let coef = convert::<S, L>(&self.coef_of_lit(lit));
        exact_assert_simple!(coef.is_positive());
        if coef.is_one() {
            return;
        }

        let divisor = match policy {
            DivisionPolicy::RoundToOne => coef.clone(),
            DivisionPolicy::SlackPlusOne => {
                let candidate = self.slack(trail) + L::one();
                if candidate.is_positive() && (coef.clone() % candidate.clone()).is_zero() {
                    candidate
                } else {
                    coef.clone()
                }
            }
            DivisionPolicy::MinDivisor => smallest_divisor_above(
                &coef.to_big(),
                &self.slack(trail).to_big(),
                DIVISOR_SEARCH_WINDOW,
            )
            .map(|divisor| convert::<BigInt, L>(&divisor))
            .unwrap_or(coef),
        };
        if divisor.is_one() {
            return;
        }
        self.weaken_non_divisible_non_falsified(&divisor, |other| trail.is_false(other), Some(lit));
        self.divide_round_up(&divisor);
    }

    /// Cancels `lit` against `reason`, which has `lit` while this constraint has `~lit`. The
    /// multipliers are chosen by the caller such that the result fits this width.
    pub(crate) fn resolve_same_width(&mut self, reason: &ConstrExp<S, L>, own_factor: &S, reason_factor: &S) {
        self.multiply(own_factor);
        self.add_scaled(reason, reason_factor);
        let _ = self.saturate();
    }

    /// Self-subsumption of `~lit` using the reason of `lit`.
    ///
    /// The reason is weakened on all literals except `lit` which are not saturated in this
    /// constraint. If a positive degree remains, the reason implies that either `lit` is true or
    /// this constraint is satisfied, so the term of `~lit` can be dropped. Returns the number of
    /// decision levels involved plus one on success, and 0 otherwise.
    pub(crate) fn subsume_with<S2: Coefficient, L2: Coefficient>(
        &mut self,
        reason: &ConstrExp<S2, L2>,
        lit: Lit,
        trail: &Trail,
    ) -> u32 {
        exact_assert_simple!(reason.coef_of_lit(lit).is_positive());
        exact_assert_simple!(self.coef_of_lit(!lit).is_positive());

        let mut remaining_degree = reason.degree.clone();
        let mut levels = vec![trail.assignment_level(lit)];
        for &var in &reason.vars {
            let reason_lit = reason.lit(var);
            if reason_lit == lit {
                continue;
            }
            let own_coef = self.coef_of_lit(reason_lit);
            if own_coef.is_positive() && convert::<S, L>(&own_coef) >= self.degree {
                levels.push(trail.assignment_level(reason_lit));
            } else {
                remaining_degree = remaining_degree - convert::<S2, L2>(&reason.abs_coef(var));
                if !remaining_degree.is_positive() {
                    return 0;
                }
            }
        }

        self.strengthen_by_removing(lit.var());
        levels.iter().unique().count() as u32 + 1
    }

    /// Removes literals assigned at the root: false literals are dropped, true literals are
    /// weakened.
    pub(crate) fn remove_units(&mut self, trail: &Trail) {
        for position in (0..self.vars.len()).rev() {
            let var = self.vars[position];
            let lit = self.lit(var);
            if trail.is_false_at_root(lit) {
                let coef = self.abs_coef(var);
                self.push_proof(format_args!("{} {coef} * + ", trail.unit_id(var)));
                self.strengthen_by_removing(var);
            } else if trail.is_true_at_root(lit) {
                self.weaken(var);
            }
        }
    }

    /// `Σ_{l not falsified} c_l - degree`.
    pub(crate) fn slack_where(&self, is_falsified: impl Fn(Lit) -> bool) -> L {
        self.vars
            .iter()
            .filter(|&&var| !is_falsified(self.lit(var)))
            .fold(-self.degree.clone(), |slack, &var| {
                slack + convert::<S, L>(&self.abs_coef(var))
            })
    }

    pub(crate) fn slack(&self, trail: &Trail) -> L {
        self.slack_where(|lit| trail.is_false(lit))
    }

    /// The status of the constraint under the assignment of the levels below `level`.
    pub(crate) fn assertion_status(&self, trail: &Trail, level: u32) -> AssertionStatus {
        let mut slack = -self.degree.clone();
        let mut largest_unassigned = S::zero();
        for &var in &self.vars {
            let lit = self.lit(var);
            if trail.false_level(lit) < level {
                continue;
            }
            let coef = self.abs_coef(var);
            slack = slack + convert::<S, L>(&coef);
            if trail.true_level(lit) >= level && coef > largest_unassigned {
                largest_unassigned = coef;
            }
        }

        if slack.is_negative() {
            AssertionStatus::Conflicting
        } else if convert::<S, L>(&largest_unassigned) > slack {
            AssertionStatus::Asserting
        } else {
            AssertionStatus::NonAsserting
        }
    }

    /// The smallest decision level below the current one at which the constraint is asserting.
    pub(crate) fn assertion_level(&self, trail: &Trail) -> Option<u32> {
        let mut entries = self
            .vars
            .iter()
            .map(|&var| {
                let lit = self.lit(var);
                (
                    trail.assignment_level(lit),
                    trail.is_false(lit),
                    convert::<S, L>(&self.abs_coef(var)),
                )
            })
            .collect::<Vec<_>>();
        entries.sort_by_key(|(level, _, _)| *level);

        let mut suffix_max = vec![L::zero(); entries.len() + 1];
        for position in (0..entries.len()).rev() {
            suffix_max[position] = suffix_max[position + 1].clone().max(entries[position].2.clone());
        }

        let mut slack = self.coef_sum() - self.degree.clone();
        let mut position = 0;
        let mut level = 0;
        while level < trail.decision_level() {
            while position < entries.len() && entries[position].0 <= level {
                if entries[position].1 {
                    slack = slack - entries[position].2.clone();
                }
                position += 1;
            }
            if slack.is_negative() {
                return None;
            }
            if suffix_max[position] > slack {
                return Some(level);
            }
            match entries.get(position) {
                Some((next_level, _, _)) => level = *next_level,
                None => return None,
            }
        }
        None
    }

    /// The number of distinct non-root decision levels among the falsified literals.
    pub(crate) fn lbd(&self, trail: &Trail) -> u32 {
        self.vars
            .iter()
            .map(|&var| trail.false_level(self.lit(var)))
            .filter(|&level| level > 0 && level != crate::engine::UNASSIGNED)
            .unique()
            .count() as u32
    }

    /// Whether every coefficient equals the degree, i.e. the constraint is a clause after
    /// dividing.
    pub(crate) fn is_clause(&self) -> bool {
        self.degree.is_positive()
            && self
                .vars
                .iter()
                .all(|&var| convert::<S, L>(&self.abs_coef(var)) >= self.degree)
    }

    /// Whether all coefficients are equal.
    pub(crate) fn is_cardinality(&self) -> bool {
        self.vars
            .iter()
            .map(|&var| self.abs_coef(var))
            .all_equal()
    }

    /// The minimal number of literals which have to be true to satisfy the constraint.
    pub(crate) fn cardinality_degree(&self) -> usize {
        if !self.degree.is_positive() {
            return 0;
        }
        let mut coefs = self
            .vars
            .iter()
            .map(|&var| convert::<S, L>(&self.abs_coef(var)))
            .collect::<Vec<_>>();
        coefs.sort_unstable_by(|a, b| b.cmp(a));

        let mut sum = L::zero();
        for (count, coef) in coefs.into_iter().enumerate() {
            sum = sum + coef;
            if sum >= self.degree {
                return count + 1;
            }
        }
        self.vars.len() + 1
    }

    pub(crate) fn to_simple(&self) -> ConstrSimple<BigInt> {
        ConstrSimple::new(
            self.terms().map(|(coef, lit)| (coef.to_big(), lit)),
            self.degree.to_big(),
        )
    }

    /// Starts the derivation of this constraint from the proof line `id`.
    pub(crate) fn set_proof_id(&mut self, id: ProofId) {
        if let Some(proof) = self.proof.as_mut() {
            proof.clear();
            let _ = write!(proof, "{id} ");
        }
    }

    /// Writes the pending derivation to the proof and restarts it from the new line.
    pub(crate) fn log_derivation(&mut self, proof_log: &mut ProofLog) -> ProofId {
        let id = match self.proof.as_deref() {
            Some(derivation) if !derivation.is_empty() => proof_log.log_derivation(derivation.trim_end()),
            _ => proof_log.log_rup(&*self),
        };
        self.set_proof_id(id);
        id
    }

    /// Writes the constraint as implied by unit propagation and restarts the derivation from it.
    pub(crate) fn log_as_rup(&mut self, proof_log: &mut ProofLog) -> ProofId {
        let id = proof_log.log_rup(&*self);
        self.set_proof_id(id);
        id
    }

    fn push_proof(&mut self, step: std::fmt::Arguments<'_>) {
        if let Some(proof) = self.proof.as_mut() {
            let _ = proof.write_fmt(step);
        }
    }
}

impl<S: Coefficient, L: Coefficient> Display for ConstrExp<S, L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (coef, lit) in self.terms() {
            write!(f, "{coef} {lit} ")?;
        }
        write!(f, ">= {} ;", self.degree)
    }
}
