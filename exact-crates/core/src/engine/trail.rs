use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::Var;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;
use crate::exact_assert_moderate;
use crate::exact_assert_simple;
use crate::proof::ProofId;

/// The level of a literal which is not true.
pub(crate) const UNASSIGNED: u32 = u32::MAX;

/// The assignment stack of the solver.
///
/// Every literal on the trail is true; its negation is false. For every literal we record the
/// decision level at which it became true, which gives constant-time truth queries both for the
/// current assignment and for the assignment at any earlier level.
#[derive(Debug, Default)]
pub(crate) struct Trail {
    lits: Vec<Lit>,
    /// `level_starts[i]` is the trail position of the first literal of level `i + 1`
    level_starts: Vec<usize>,
    /// The level at which a literal became true, or [`UNASSIGNED`]
    levels: KeyedVec<Lit, u32>,
    positions: KeyedVec<Var, usize>,
    reasons: KeyedVec<Var, CRef>,
    /// The proof ID of the unit constraint of a literal propagated at the root
    unit_ids: KeyedVec<Var, ProofId>,
    /// Literals before this position have had their watch lists processed
    pub(crate) propagation_head: usize,
}

impl Trail {
    pub(crate) fn grow(&mut self, num_vars: usize) {
        let var = Var::from_index(num_vars);
        self.levels.grow_to_include(var.negative(), UNASSIGNED);
        self.positions.grow_to_include(var, usize::MAX);
        self.reasons.grow_to_include(var, CRef::UNDEF);
        self.unit_ids.grow_to_include(var, ProofId::UNDEF);
    }

    pub(crate) fn len(&self) -> usize {
        self.lits.len()
    }

    pub(crate) fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub(crate) fn last(&self) -> Option<Lit> {
        self.lits.last().copied()
    }

    pub(crate) fn lit_at(&self, position: usize) -> Lit {
        self.lits[position]
    }

    pub(crate) fn decision_level(&self) -> u32 {
        self.level_starts.len() as u32
    }

    /// The trail position at which `level` starts.
    pub(crate) fn level_start(&self, level: u32) -> usize {
        if level == 0 {
            0
        } else {
            self.level_starts[level as usize - 1]
        }
    }

    /// The number of literals assigned at the root.
    pub(crate) fn root_len(&self) -> usize {
        self.level_starts.first().copied().unwrap_or(self.lits.len())
    }

    pub(crate) fn is_true(&self, lit: Lit) -> bool {
        self.levels[lit] != UNASSIGNED
    }

    pub(crate) fn is_false(&self, lit: Lit) -> bool {
        self.levels[!lit] != UNASSIGNED
    }

    pub(crate) fn is_unknown(&self, lit: Lit) -> bool {
        !self.is_true(lit) && !self.is_false(lit)
    }

    /// The level at which `lit` became true, or [`UNASSIGNED`].
    pub(crate) fn true_level(&self, lit: Lit) -> u32 {
        self.levels[lit]
    }

    /// The level at which `lit` became false, or [`UNASSIGNED`].
    pub(crate) fn false_level(&self, lit: Lit) -> u32 {
        self.levels[!lit]
    }

    /// The level at which the variable of `lit` was assigned, or [`UNASSIGNED`].
    pub(crate) fn assignment_level(&self, lit: Lit) -> u32 {
        self.true_level(lit).min(self.false_level(lit))
    }

    pub(crate) fn is_true_at_root(&self, lit: Lit) -> bool {
        self.true_level(lit) == 0
    }

    pub(crate) fn is_false_at_root(&self, lit: Lit) -> bool {
        self.false_level(lit) == 0
    }

    /// Whether `lit` is false and its negation has been processed by propagation.
    pub(crate) fn is_false_and_processed(&self, lit: Lit) -> bool {
        self.is_false(lit) && self.positions[lit.var()] < self.propagation_head
    }

    pub(crate) fn position(&self, var: Var) -> usize {
        self.positions[var]
    }

    pub(crate) fn reason(&self, var: Var) -> CRef {
        self.reasons[var]
    }

    pub(crate) fn set_reason(&mut self, var: Var, reason: CRef) {
        self.reasons[var] = reason;
    }

    pub(crate) fn unit_id(&self, var: Var) -> ProofId {
        self.unit_ids[var]
    }

    pub(crate) fn set_unit_id(&mut self, var: Var, id: ProofId) {
        self.unit_ids[var] = id;
    }

    pub(crate) fn new_level(&mut self) {
        self.level_starts.push(self.lits.len());
    }

    pub(crate) fn enqueue(&mut self, lit: Lit, reason: CRef) {
        exact_assert_simple!(self.is_unknown(lit), "{lit} is already assigned");

        let var = lit.var();
        self.levels[lit] = self.decision_level();
        self.positions[var] = self.lits.len();
        self.reasons[var] = reason;
        self.lits.push(lit);
    }

    /// Removes the last literal from the trail, together with any level which becomes empty.
    pub(crate) fn pop(&mut self) -> Option<Lit> {
        let lit = self.lits.pop()?;
        let var = lit.var();
        self.levels[lit] = UNASSIGNED;
        self.positions[var] = usize::MAX;
        self.reasons[var] = CRef::UNDEF;
        self.unit_ids[var] = ProofId::UNDEF;

        while self
            .level_starts
            .last()
            .is_some_and(|&start| start >= self.lits.len())
        {
            let _ = self.level_starts.pop();
        }
        self.propagation_head = self.propagation_head.min(self.lits.len());
        Some(lit)
    }

    /// Drops levels above `level`, which must not contain any literals.
    pub(crate) fn truncate_levels(&mut self, level: u32) {
        exact_assert_moderate!(
            level >= self.decision_level() || self.level_start(level + 1) >= self.lits.len()
        );
        self.level_starts.truncate(level as usize);
    }

    /// The decision literals on the trail, in order.
    pub(crate) fn decisions(&self) -> Vec<Lit> {
        let mut decisions = self
            .level_starts
            .iter()
            .filter(|&&start| start < self.lits.len())
            .map(|&start| self.lits[start])
            .filter(|&lit| self.reasons[lit.var()].is_undef())
            .collect::<Vec<_>>();
        decisions.dedup();
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    #[test]
    fn levels_of_literals() {
        let mut trail = Trail::default();
        trail.grow(3);

        trail.enqueue(lit(1), CRef::UNDEF);
        trail.new_level();
        trail.enqueue(lit(-2), CRef::UNDEF);

        assert!(trail.is_true_at_root(lit(1)));
        assert!(trail.is_false(lit(2)));
        assert_eq!(trail.false_level(lit(2)), 1);
        assert_eq!(trail.true_level(lit(2)), UNASSIGNED);
        assert!(trail.is_unknown(lit(3)));
        assert_eq!(trail.decisions(), vec![lit(-2)]);
    }

    #[test]
    fn popping_removes_emptied_levels() {
        let mut trail = Trail::default();
        trail.grow(3);

        trail.new_level();
        trail.enqueue(lit(1), CRef::UNDEF);
        // an empty level, e.g. for an assumption which was already true
        trail.new_level();
        trail.new_level();
        trail.enqueue(lit(2), CRef::UNDEF);
        assert_eq!(trail.decision_level(), 3);

        assert_eq!(trail.pop(), Some(lit(2)));
        assert_eq!(trail.decision_level(), 1);
        assert_eq!(trail.pop(), Some(lit(1)));
        assert_eq!(trail.decision_level(), 0);
        assert!(trail.is_unknown(lit(1)));
    }
}
