use crate::basic_types::CRef;
use crate::basic_types::Lit;
use crate::basic_types::Var;
use crate::containers::KeyedVec;
use crate::containers::DenseKey;

/// An entry in the watch list of a literal; the constraint is visited when the literal becomes
/// false.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Watch {
    pub(crate) cref: CRef,
    pub(crate) kind: WatchKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WatchKind {
    /// A binary clause; the other literal is stored inline.
    Binary(Lit),
    /// A clause; if the blocker is true the clause does not need to be visited.
    Clause(Lit),
    /// A watched literal of a cardinality constraint.
    Cardinality,
    /// The term with the given index of a linear constraint.
    Linear(u32),
}

/// What to do with a watch after visiting its constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WatchOutcome {
    Keep,
    /// The constraint found another literal to watch.
    Drop,
    /// The constraint is falsified; the watch is kept.
    Conflict,
}

/// The watch lists of all literals.
#[derive(Debug, Default)]
pub(crate) struct Watches {
    lists: KeyedVec<Lit, Vec<Watch>>,
}

impl Watches {
    pub(crate) fn grow(&mut self, num_vars: usize) {
        self.lists
            .grow_to_include(Var::from_index(num_vars).negative(), Vec::new());
    }

    pub(crate) fn push(&mut self, lit: Lit, watch: Watch) {
        self.lists[lit].push(watch);
    }

    pub(crate) fn get(&self, lit: Lit) -> &[Watch] {
        &self.lists[lit]
    }

    /// Takes the watch list of `lit` out, so that it can be walked while the constraints push
    /// watches onto other lists.
    pub(crate) fn take(&mut self, lit: Lit) -> Vec<Watch> {
        std::mem::take(&mut self.lists[lit])
    }

    /// Puts a list obtained with [`Watches::take`] back; watches added in the meantime are kept.
    pub(crate) fn put_back(&mut self, lit: Lit, mut list: Vec<Watch>) {
        let added = std::mem::take(&mut self.lists[lit]);
        list.extend(added);
        self.lists[lit] = list;
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&mut Watch) -> bool) {
        for list in self.lists.iter_mut() {
            list.retain_mut(|watch| keep(watch));
        }
    }
}
