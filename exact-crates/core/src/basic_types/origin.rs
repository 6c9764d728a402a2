use enum_map::Enum;

/// Where a constraint comes from. The origin decides how the constraint is treated by database
/// maintenance and proof logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum)]
pub enum Origin {
    /// Part of the input formula.
    Formula,
    /// Derived by conflict analysis.
    Learned,
    /// Derived while probing a literal.
    Probing,
    /// Binary clauses encoding a detected literal equality.
    Equality,
    /// A literal fixed because it is dominated.
    Dominance,
    /// The objective bound `objective <= best - 1`.
    UpperBound,
    /// The objective bound `objective >= lower bound`.
    LowerBound,
    /// A definition of an auxiliary variable introduced by core-guided reformulation.
    CoreGuided,
    /// A cut produced by the LP collaborator.
    LpCut,
}

impl Origin {
    /// Constraints which are implied by the rest of the database and may therefore be removed by
    /// database reduction.
    pub fn is_learned(self) -> bool {
        matches!(self, Origin::Learned | Origin::Probing | Origin::LpCut)
    }

    /// Constraints which restrict the solution space beyond the input formula.
    pub fn is_bound(self) -> bool {
        matches!(self, Origin::UpperBound | Origin::LowerBound)
    }
}
