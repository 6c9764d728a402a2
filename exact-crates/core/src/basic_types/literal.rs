use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Not;

use crate::containers::DenseKey;
use crate::exact_assert_moderate;

/// A propositional variable. Variables are numbered from 1; index 0 is never a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub fn new(index: u32) -> Var {
        exact_assert_moderate!(index > 0, "variable indices start at 1");
        Var(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn positive(self) -> Lit {
        Lit::new(self, true)
    }

    pub fn negative(self) -> Lit {
        Lit::new(self, false)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl DenseKey for Var {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Var(index as u32)
    }
}

/// A literal is a variable or its negation. It is stored as a signed integer (as in DIMACS),
/// where the magnitude is the variable and the sign the polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(i32);

impl Lit {
    pub fn new(var: Var, is_positive: bool) -> Lit {
        let code = var.0 as i32;
        Lit(if is_positive { code } else { -code })
    }

    /// Creates a literal from its signed DIMACS code.
    pub fn from_dimacs(code: i32) -> Lit {
        exact_assert_moderate!(code != 0, "0 is not a literal");
        Lit(code)
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_positive() {
            write!(f, "x{}", self.0)
        } else {
            write!(f, "~x{}", -self.0)
        }
    }
}

impl DenseKey for Lit {
    fn index(&self) -> usize {
        2 * self.var().index() as usize + usize::from(!self.is_positive())
    }

    fn from_index(index: usize) -> Self {
        Lit::new(Var((index / 2) as u32), index % 2 == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_flips_polarity() {
        let lit = Lit::from_dimacs(-4);
        assert_eq!(lit.var(), Var::new(4));
        assert!(!lit.is_positive());
        assert_eq!(!lit, Var::new(4).positive());
        assert_eq!(!!lit, lit);
    }

    #[test]
    fn storage_index_round_trip() {
        for code in [1, -1, 7, -7] {
            let lit = Lit::from_dimacs(code);
            assert_eq!(Lit::from_index(lit.index()), lit);
        }
        assert_eq!(Var::new(3).positive().index(), 6);
        assert_eq!(Var::new(3).negative().index(), 7);
    }

    #[test]
    fn display_uses_pb_notation() {
        assert_eq!(Lit::from_dimacs(2).to_string(), "x2");
        assert_eq!(Lit::from_dimacs(-2).to_string(), "~x2");
    }
}
