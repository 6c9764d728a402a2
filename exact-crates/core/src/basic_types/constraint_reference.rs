use std::fmt::Display;
use std::fmt::Formatter;

use crate::containers::DenseKey;

/// An opaque reference to a constraint in the constraint arena. References are invalidated by
/// garbage collection, which relocates every holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CRef(u32);

impl CRef {
    pub(crate) const UNDEF: CRef = CRef(u32::MAX);

    pub(crate) fn is_undef(self) -> bool {
        self == CRef::UNDEF
    }
}

impl DenseKey for CRef {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        CRef(u32::try_from(index).expect("fewer than 2^32 constraints"))
    }
}

impl Display for CRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_undef() {
            write!(f, "undef")
        } else {
            write!(f, "@{}", self.0)
        }
    }
}
