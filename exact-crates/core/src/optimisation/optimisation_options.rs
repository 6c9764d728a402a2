use crate::basic_types::OptionError;
#[cfg(doc)]
use crate::optimisation::OptimisationDriver;

/// How the [`OptimisationDriver`] searches for an optimal solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OptimisationMode {
    /// Extracts cores under assumptions which set the objective literals to their best value,
    /// and reformulates the objective with every core. Solutions tighten the upper bound.
    #[default]
    CoreGuided,
    /// Solves without assumptions; every solution adds a constraint demanding a better one.
    LinearSearch,
    /// Alternates between core-guided and linear phases, each limited by a conflict budget.
    Hybrid,
}

/// How the counting variables of a core are introduced into the reformulated objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CoreEncoding {
    /// All counting variables of a core are introduced at once.
    Sum,
    /// The next counting variable is introduced once the weight of the previous one has been
    /// used up by other cores.
    #[default]
    Lazy,
    /// Only the first counting variable is introduced.
    Reified,
}

/// The options of an [`OptimisationDriver`].
#[derive(Clone, Copy, Debug)]
pub struct OptimisationOptions {
    pub mode: OptimisationMode,
    pub core_encoding: CoreEncoding,
    /// Whether only the objective literals with the largest weights are assumed at first.
    pub stratification: bool,
    /// Whether every improving solution adds the constraint `objective <= upper bound - 1`.
    pub bound_upper: bool,
    /// The number of conflicts a phase of [`OptimisationMode::Hybrid`] may take.
    pub hybrid_phase_conflicts: u64,
    /// The fraction of the elapsed time which may be spent in the LP collaborator.
    pub lp_time_ratio: f64,
}

impl Default for OptimisationOptions {
    fn default() -> Self {
        OptimisationOptions {
            mode: OptimisationMode::default(),
            core_encoding: CoreEncoding::default(),
            stratification: true,
            bound_upper: true,
            hybrid_phase_conflicts: 1000,
            lp_time_ratio: 1.0,
        }
    }
}

impl OptimisationOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if !(0.0..=1.0).contains(&self.lp_time_ratio) {
            return Err(OptionError::out_of_range(
                "lp-time-ratio",
                "[0, 1]",
                self.lp_time_ratio,
            ));
        }
        if self.mode == OptimisationMode::Hybrid && self.hybrid_phase_conflicts == 0 {
            return Err(OptionError::out_of_range(
                "hybrid-phase-conflicts",
                "[1, inf)",
                self.hybrid_phase_conflicts,
            ));
        }
        if self.mode != OptimisationMode::CoreGuided && !self.bound_upper {
            return Err(OptionError::MissingRequirement {
                name: "optimisation-mode",
                requires: "bound-upper",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(OptimisationOptions::default().validate(), Ok(()));
    }

    #[test]
    fn linear_search_needs_upper_bounds() {
        let options = OptimisationOptions {
            mode: OptimisationMode::LinearSearch,
            bound_upper: false,
            ..Default::default()
        };
        assert_eq!(
            options.validate(),
            Err(OptionError::MissingRequirement {
                name: "optimisation-mode",
                requires: "bound-upper",
            })
        );

        let options = OptimisationOptions {
            bound_upper: false,
            ..Default::default()
        };
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn ranges_are_checked() {
        let options = OptimisationOptions {
            lp_time_ratio: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(OptionError::OutOfRange {
                name: "lp-time-ratio",
                ..
            })
        ));

        let options = OptimisationOptions {
            mode: OptimisationMode::Hybrid,
            hybrid_phase_conflicts: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
