use crate::basic_types::interval_sequence::IntervalSequence;
use crate::basic_types::interval_sequence::SequenceGeneratorType;
use crate::basic_types::OptionError;

/// When the search returns to the root, counted in conflicts since the previous restart.
///
/// The default schedule is the Luby sequence (M. Luby, A. Sinclair and D. Zuckerman, "Optimal
/// speedup of Las Vegas algorithms", 1993) times [`RestartOptions::base_interval`].
#[derive(Debug, Clone, Copy)]
pub struct RestartOptions {
    /// Whether the solver restarts at all.
    pub restarts: bool,
    pub sequence_generator_type: SequenceGeneratorType,
    /// The first interval, and the unit by which the Luby sequence is scaled.
    pub base_interval: u64,
    /// The growth factor of [`SequenceGeneratorType::Geometric`]; must exceed 1.
    pub geometric_coef: f64,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            restarts: true,
            sequence_generator_type: SequenceGeneratorType::Luby,
            base_interval: 100,
            geometric_coef: 1.5,
        }
    }
}

impl RestartOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if self.base_interval == 0 {
            return Err(OptionError::out_of_range(
                "restart-base-interval",
                "[1, inf)",
                self.base_interval,
            ));
        }
        if self.sequence_generator_type == SequenceGeneratorType::Geometric
            && self.geometric_coef <= 1.0
        {
            return Err(OptionError::out_of_range(
                "restart-geometric-coef",
                "(1, inf)",
                self.geometric_coef,
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct RestartStrategy {
    intervals: IntervalSequence,
    conflicts_since_restart: u64,
    restart_interval: u64,
    restarts: bool,
    number_of_restarts: u64,
}

impl Default for RestartStrategy {
    fn default() -> Self {
        RestartStrategy::new(RestartOptions::default())
    }
}

impl RestartStrategy {
    pub(crate) fn new(options: RestartOptions) -> Self {
        let mut intervals = IntervalSequence::new(
            options.sequence_generator_type,
            options.base_interval,
            options.geometric_coef,
        );
        let restart_interval = intervals.next_interval();

        RestartStrategy {
            intervals,
            conflicts_since_restart: 0,
            restart_interval,
            restarts: options.restarts,
            number_of_restarts: 0,
        }
    }

    pub(crate) fn should_restart(&self) -> bool {
        self.restarts && self.conflicts_since_restart >= self.restart_interval
    }

    pub(crate) fn notify_conflict(&mut self) {
        self.conflicts_since_restart += 1;
    }

    pub(crate) fn notify_restart(&mut self) {
        self.number_of_restarts += 1;
        self.conflicts_since_restart = 0;
        self.restart_interval = self.intervals.next_interval();
    }

    pub(crate) fn number_of_restarts(&self) -> u64 {
        self.number_of_restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflicts_between_restarts(options: RestartOptions, num_restarts: usize) -> Vec<u64> {
        let mut strategy = RestartStrategy::new(options);
        let mut intervals = vec![];
        let mut conflicts = 0;
        while intervals.len() < num_restarts {
            strategy.notify_conflict();
            conflicts += 1;
            if strategy.should_restart() {
                strategy.notify_restart();
                intervals.push(conflicts);
                conflicts = 0;
            }
        }
        intervals
    }

    #[test]
    fn luby_restarts() {
        let options = RestartOptions {
            base_interval: 10,
            ..Default::default()
        };
        assert_eq!(
            conflicts_between_restarts(options, 7),
            vec![10, 10, 20, 10, 10, 20, 40]
        );
    }

    #[test]
    fn constant_restarts() {
        let options = RestartOptions {
            sequence_generator_type: SequenceGeneratorType::Constant,
            base_interval: 3,
            ..Default::default()
        };
        assert_eq!(conflicts_between_restarts(options, 3), vec![3, 3, 3]);
    }

    #[test]
    fn disabled_restarts_never_trigger() {
        let mut strategy = RestartStrategy::new(RestartOptions {
            restarts: false,
            base_interval: 1,
            ..Default::default()
        });
        for _ in 0..100 {
            strategy.notify_conflict();
        }
        assert!(!strategy.should_restart());
        assert_eq!(strategy.number_of_restarts(), 0);
    }

    #[test]
    fn geometric_coefficient_is_validated() {
        let options = RestartOptions {
            sequence_generator_type: SequenceGeneratorType::Geometric,
            geometric_coef: 1.0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
