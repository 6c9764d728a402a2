use crate::basic_types::Lit;
use crate::basic_types::Var;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;
use crate::engine::Trail;
use crate::exact_assert_moderate;
use crate::proof::ProofId;

/// Binary implications `a -> b` found by probing, each with the proof line of the clause
/// `~a + b >= 1`.
#[derive(Debug, Default)]
pub(crate) struct Implications {
    implied: KeyedVec<Lit, HashMap<Lit, ProofId>>,
    num_implications: usize,
}

impl Implications {
    pub(crate) fn grow(&mut self, num_vars: usize) {
        self.implied.grow_to_include(
            Var::from_index(num_vars).negative(),
            HashMap::default(),
        );
    }

    /// Records `from -> to`. Returns whether the implication is new.
    pub(crate) fn add(&mut self, from: Lit, to: Lit, clause_id: ProofId) -> bool {
        let is_new = self.implied[from].insert(to, clause_id).is_none();
        if is_new {
            self.num_implications += 1;
        }
        is_new
    }

    pub(crate) fn implied_by(&self, lit: Lit) -> &HashMap<Lit, ProofId> {
        &self.implied[lit]
    }

    pub(crate) fn len(&self) -> usize {
        self.num_implications
    }

    /// Forgets implications in which a literal is assigned at the root; they carry no
    /// information anymore.
    pub(crate) fn remove_fixed(&mut self, trail: &Trail) {
        for &lit in &trail.lits()[..trail.root_len()] {
            self.implied[lit].clear();
            self.implied[!lit].clear();
        }
        let mut num_implications = 0;
        for implied in self.implied.iter_mut() {
            implied.retain(|&to, _| trail.assignment_level(to) != 0);
            num_implications += implied.len();
        }
        self.num_implications = num_implications;
    }
}

#[derive(Clone, Copy, Debug)]
struct Equality {
    /// The literal which the positive literal of the variable is equal to
    repr: Lit,
    /// The proof line of `~x + repr >= 1`
    forward: ProofId,
    /// The proof line of `x + ~repr >= 1`
    backward: ProofId,
}

/// Equivalent literals, kept as a forest in which every variable points towards a canonical
/// representative.
#[derive(Debug, Default)]
pub(crate) struct Equalities {
    entries: KeyedVec<Var, Option<Equality>>,
    num_merged: usize,
}

impl Equalities {
    pub(crate) fn grow(&mut self, num_vars: usize) {
        self.entries
            .grow_to_include(Var::from_index(num_vars), None);
    }

    pub(crate) fn num_merged(&self) -> usize {
        self.num_merged
    }

    pub(crate) fn is_canonical(&self, lit: Lit) -> bool {
        self.entries[lit.var()].is_none()
    }

    /// One step from `lit` towards its representative: the next literal together with the proof
    /// line of `~lit + next >= 1`.
    pub(crate) fn step(&self, lit: Lit) -> Option<(Lit, ProofId)> {
        let entry = self.entries[lit.var()]?;
        Some(if lit.is_positive() {
            (entry.repr, entry.forward)
        } else {
            (!entry.repr, entry.backward)
        })
    }

    #[cfg(test)]
    pub(crate) fn representative(&self, mut lit: Lit) -> Lit {
        while let Some((next, _)) = self.step(lit) {
            lit = next;
        }
        lit
    }

    /// Records that `lit` equals `repr`, where `forward` derives `~lit + repr >= 1` and `backward`
    /// derives `lit + ~repr >= 1`. Both literals must be canonical.
    pub(crate) fn merge(&mut self, lit: Lit, repr: Lit, forward: ProofId, backward: ProofId) {
        exact_assert_moderate!(self.is_canonical(lit) && self.is_canonical(repr));
        exact_assert_moderate!(lit.var() != repr.var());
        // ~x = r is stored as x = ~r
        self.entries[lit.var()] = Some(if lit.is_positive() {
            Equality {
                repr,
                forward,
                backward,
            }
        } else {
            Equality {
                repr: !repr,
                forward: backward,
                backward: forward,
            }
        });
        self.num_merged += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::CRef;

    fn lit(code: i32) -> Lit {
        Lit::from_dimacs(code)
    }

    #[test]
    fn representatives_follow_chains_and_polarity() {
        let mut equalities = Equalities::default();
        equalities.grow(3);
        equalities.merge(lit(-1), lit(2), ProofId::UNDEF, ProofId::UNDEF);
        equalities.merge(lit(2), lit(-3), ProofId::UNDEF, ProofId::UNDEF);

        assert_eq!(equalities.representative(lit(1)), lit(3));
        assert_eq!(equalities.representative(lit(-1)), lit(-3));
        assert_eq!(equalities.representative(lit(2)), lit(-3));
        assert!(equalities.is_canonical(lit(-3)));
        assert!(!equalities.is_canonical(lit(1)));
        assert_eq!(equalities.num_merged(), 2);
    }

    #[test]
    fn steps_carry_the_clause_in_the_right_direction() {
        let mut equalities = Equalities::default();
        equalities.grow(2);
        let forward = ProofId::TRIVIAL;
        let backward = ProofId::UNSAT;
        // ~x1 = x2: the clause for ~x1 -> x2 is forward
        equalities.merge(lit(-1), lit(2), forward, backward);

        assert_eq!(equalities.step(lit(-1)), Some((lit(2), forward)));
        assert_eq!(equalities.step(lit(1)), Some((lit(-2), backward)));
        assert_eq!(equalities.step(lit(2)), None);
    }

    #[test]
    fn implications_of_root_literals_are_dropped() {
        let mut implications = Implications::default();
        implications.grow(3);
        assert!(implications.add(lit(1), lit(2), ProofId::UNDEF));
        assert!(!implications.add(lit(1), lit(2), ProofId::UNDEF));
        assert!(implications.add(lit(2), lit(3), ProofId::UNDEF));
        assert_eq!(implications.len(), 2);

        let mut trail = Trail::default();
        trail.grow(3);
        trail.enqueue(lit(-3), CRef::UNDEF);
        implications.remove_fixed(&trail);

        assert_eq!(implications.len(), 1);
        assert!(implications.implied_by(lit(1)).contains_key(&lit(2)));
        assert!(implications.implied_by(lit(2)).is_empty());
    }
}
