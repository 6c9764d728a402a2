use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::LearningOptions;
use super::RestartOptions;
use crate::basic_types::OptionError;
#[cfg(doc)]
use crate::engine::Solver;
use crate::proof::ProofLog;

/// How a reason is divided before it is resolved with the conflict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DivisionPolicy {
    /// Divide by the coefficient of the propagated literal, turning the reason into a clause-like
    /// constraint on the propagated literal.
    RoundToOne,
    /// Divide by the slack plus one when that divides the coefficient of the propagated literal.
    #[default]
    SlackPlusOne,
    /// Divide by the smallest divisor of the coefficient of the propagated literal which exceeds
    /// the slack.
    MinDivisor,
}

/// Options for conflict analysis.
#[derive(Clone, Copy, Debug)]
pub struct ConflictAnalysisOptions {
    pub division_policy: DivisionPolicy,
    /// Coefficients of the conflict which need more bits than this are reduced after every
    /// resolution step; 0 means unlimited.
    pub bits_overflow: u32,
    /// The number of bits to which an overflowing conflict is reduced.
    pub bits_reduced: u32,
    /// The number of bits to which learned constraints are reduced; 0 means unlimited.
    pub bits_learned: u32,
    /// Whether to try self-subsumption before resolving with a reason.
    pub self_subsumption: bool,
    /// Whether learned constraints are minimised using binary implications.
    pub minimisation: bool,
}

impl Default for ConflictAnalysisOptions {
    fn default() -> Self {
        ConflictAnalysisOptions {
            division_policy: DivisionPolicy::default(),
            bits_overflow: 62,
            bits_reduced: 29,
            bits_learned: 29,
            self_subsumption: true,
            minimisation: true,
        }
    }
}

impl ConflictAnalysisOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if self.bits_overflow > 126 {
            return Err(OptionError::out_of_range(
                "bits-overflow",
                "[0, 126]",
                self.bits_overflow,
            ));
        }
        if self.bits_learned > 126 {
            return Err(OptionError::out_of_range(
                "bits-learned",
                "[0, 126]",
                self.bits_learned,
            ));
        }
        if self.bits_overflow > 0 {
            if self.bits_reduced == 0 {
                return Err(OptionError::out_of_range(
                    "bits-reduced",
                    "[1, bits-overflow]",
                    self.bits_reduced,
                ));
            }
            if self.bits_reduced > self.bits_overflow {
                return Err(OptionError::InconsistentBitWidths {
                    reduced: self.bits_reduced,
                    overflow: self.bits_overflow,
                });
            }
        }
        Ok(())
    }
}

/// Options for propagation.
#[derive(Clone, Copy, Debug)]
pub struct PropagationOptions {
    /// A linear constraint uses counting propagation when its smallest watch set contains at
    /// least this fraction of its literals, and watched propagation otherwise.
    pub counting_ratio: f64,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        PropagationOptions {
            counting_ratio: 0.7,
        }
    }
}

impl PropagationOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if !(0.0..=1.0).contains(&self.counting_ratio) {
            return Err(OptionError::out_of_range(
                "counting-ratio",
                "[0, 1]",
                self.counting_ratio,
            ));
        }
        Ok(())
    }
}

/// Options for the maintenance which happens at the root between two searches.
#[derive(Clone, Copy, Debug)]
pub struct InprocessingOptions {
    /// Whether failed literal probing is performed.
    pub probing: bool,
    /// The number of variables probed per inprocessing round.
    pub probing_limit: usize,
    /// Whether a literal whose negation occurs in no constraint is fixed to true at the root.
    ///
    /// The fixed literal stays true for good, so a constraint added later which mentions its
    /// negation may be judged infeasible wrongly. Only enable this when every variable which later
    /// constraints mention is [frozen](Solver::freeze), or when no constraints follow. The
    /// optimisation driver freezes the variables it constrains later on.
    pub dominance: bool,
    /// The number of conflicts before the first inprocessing round.
    pub first_interval: u64,
    /// The factor by which the interval between inprocessing rounds grows.
    pub growth_factor: f64,
    /// The arena is compacted once this fraction of it consists of removed constraints.
    pub gc_wasted_ratio: f64,
}

impl Default for InprocessingOptions {
    fn default() -> Self {
        InprocessingOptions {
            probing: true,
            probing_limit: 100,
            dominance: false,
            first_interval: 1000,
            growth_factor: 1.1,
            gc_wasted_ratio: 0.5,
        }
    }
}

impl InprocessingOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if self.first_interval == 0 {
            return Err(OptionError::out_of_range(
                "inprocessing-first-interval",
                "[1, inf)",
                self.first_interval,
            ));
        }
        if self.growth_factor < 1.0 {
            return Err(OptionError::out_of_range(
                "inprocessing-growth-factor",
                "[1, inf)",
                self.growth_factor,
            ));
        }
        if !(self.gc_wasted_ratio > 0.0 && self.gc_wasted_ratio <= 1.0) {
            return Err(OptionError::out_of_range(
                "gc-wasted-ratio",
                "(0, 1]",
                self.gc_wasted_ratio,
            ));
        }
        Ok(())
    }
}

/// The options of a [`Solver`]. Every solver owns its own options; there is no global
/// configuration.
#[derive(Debug)]
pub struct SolverOptions {
    pub restart_options: RestartOptions,
    pub learning_options: LearningOptions,
    pub conflict_analysis_options: ConflictAnalysisOptions,
    pub propagation_options: PropagationOptions,
    pub inprocessing_options: InprocessingOptions,
    /// The factor by which variable activities decay after every conflict.
    pub variable_decay: f64,
    /// The probability that a decision is made on a random variable.
    pub random_decision_frequency: f64,
    /// A random number generator which is used by the [`Solver`] to determine randomised values.
    pub random_generator: SmallRng,
    /// The proof log for the solver.
    pub proof_log: ProofLog,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            restart_options: RestartOptions::default(),
            learning_options: LearningOptions::default(),
            conflict_analysis_options: ConflictAnalysisOptions::default(),
            propagation_options: PropagationOptions::default(),
            inprocessing_options: InprocessingOptions::default(),
            variable_decay: 0.95,
            random_decision_frequency: 0.0,
            random_generator: SmallRng::seed_from_u64(42),
            proof_log: ProofLog::default(),
        }
    }
}

impl SolverOptions {
    /// Checks every option against its admissible range.
    pub fn validate(&self) -> Result<(), OptionError> {
        self.restart_options.validate()?;
        self.learning_options.validate()?;
        self.conflict_analysis_options.validate()?;
        self.propagation_options.validate()?;
        self.inprocessing_options.validate()?;

        if !(self.variable_decay > 0.0 && self.variable_decay < 1.0) {
            return Err(OptionError::out_of_range(
                "variable-decay",
                "(0, 1)",
                self.variable_decay,
            ));
        }
        if !(0.0..=1.0).contains(&self.random_decision_frequency) {
            return Err(OptionError::out_of_range(
                "random-decision-frequency",
                "[0, 1]",
                self.random_decision_frequency,
            ));
        }
        Ok(())
    }
}
