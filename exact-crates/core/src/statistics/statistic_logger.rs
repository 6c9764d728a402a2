use std::fmt::Display;

use super::statistic_logging::log_statistic;

/// Logs statistics under a name path such as `solver_engine_numConflicts`, where each nested
/// statistics struct adds one segment.
#[derive(Debug, Default, Clone)]
pub struct StatisticLogger {
    path: String,
}

impl StatisticLogger {
    pub fn new(root: impl Display) -> StatisticLogger {
        StatisticLogger {
            path: root.to_string(),
        }
    }

    /// A logger for the statistics nested under `segment`.
    pub fn attach_to_prefix(&self, segment: impl Display) -> StatisticLogger {
        StatisticLogger {
            path: format!("{}_{segment}", self.path),
        }
    }

    pub fn log_value(&self, value: impl Display) {
        log_statistic(&self.path, value);
    }
}
