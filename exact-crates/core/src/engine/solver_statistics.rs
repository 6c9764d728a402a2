use crate::create_statistics_struct;
use crate::statistics::RunningMean;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

/// The statistics of the search, of conflict analysis and of inprocessing.
#[derive(Debug, Default)]
pub(crate) struct SolverStatistics {
    pub(crate) engine: EngineStatistics,
    pub(crate) conflict_analysis: ConflictAnalysisStatistics,
    pub(crate) inprocessing: InprocessingStatistics,
}

impl SolverStatistics {
    pub(crate) fn log(&self, statistic_logger: &StatisticLogger, verbose: bool) {
        self.engine.log(statistic_logger.attach_to_prefix("engine"));
        if verbose {
            self.conflict_analysis
                .log(statistic_logger.attach_to_prefix("analysis"));
            self.inprocessing
                .log(statistic_logger.attach_to_prefix("inprocessing"));
        }
    }
}

create_statistics_struct!(
    /// Counters of the search itself.
    EngineStatistics {
        num_decisions: u64,
        num_conflicts: u64,
        num_propagations: u64,
        num_restarts: u64,
        num_inprocessing_rounds: u64,
        /// The number of times a solution was found
        num_solutions: u64,
        /// The number of cores extracted under assumptions
        num_cores: u64,
        num_garbage_collections: u64,
        num_reductions: u64,
        num_removed_learned: u64,
    }
);

create_statistics_struct!(
    /// Counters of conflict analysis.
    ConflictAnalysisStatistics {
        num_learned: u64,
        /// The number of learned constraints which are clauses
        num_learned_clauses: u64,
        /// The number of learned constraints which are cardinality constraints
        num_learned_cardinalities: u64,
        num_resolutions: u64,
        num_self_subsumptions: u64,
        /// The number of times the conflict had to move to a wider coefficient type
        num_promotions: u64,
        /// The number of literals removed by minimisation
        num_minimised_literals: u64,
        average_learned_lbd: RunningMean,
        average_learned_size: RunningMean,
        average_core_size: RunningMean,
    }
);

create_statistics_struct!(
    /// Counters of the maintenance at the root.
    InprocessingStatistics {
        num_probed: u64,
        /// Units derived by probing, either failed literals or literals implied by both
        /// polarities
        num_probing_units: u64,
        num_implications: u64,
        num_equalities: u64,
        /// Literals fixed because their negation occurs in no constraint
        num_dominance_units: u64,
        /// Constraints removed or shrunk because of root assignments
        num_root_simplified: u64,
    }
);
