//! Statistic logging for the [`Solver`] and the [`OptimisationDriver`].
//!
//! Statistics are grouped into structs generated by [`create_statistics_struct!`], and are only
//! written once [`configure_statistic_logging`] has been called.
mod running_mean;
mod statistic_logger;
mod statistic_logging;

use std::fmt::Display;

pub(crate) use running_mean::RunningMean;
pub use statistic_logger::StatisticLogger;
pub use statistic_logging::configure_statistic_logging;
pub use statistic_logging::log_statistic;
pub use statistic_logging::log_statistic_postfix;
pub use statistic_logging::should_log_statistics;
pub use statistic_logging::StatisticOptions;

#[cfg(doc)]
use crate::optimisation::OptimisationDriver;
#[cfg(doc)]
use crate::Solver;

/// Something which can be written to a [`StatisticLogger`]: either a single value or a group of
/// named statistics.
pub(crate) trait Statistic {
    fn log(&self, statistic_logger: StatisticLogger);
}

impl<Value: Display> Statistic for Value {
    fn log(&self, statistic_logger: StatisticLogger) {
        statistic_logger.log_value(self);
    }
}

/// Declares a struct of counters and averages, each of which is logged under its field name.
#[macro_export]
#[doc(hidden)]
macro_rules! create_statistics_struct {
    ($(#[$doc:meta])* $name:ident { $($(#[$field_doc:meta])* $field:ident : $type:ty),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Default, Debug, Copy, Clone)]
        pub(crate) struct $name {
            $($(#[$field_doc])* pub(crate) $field: $type),+
        }

        impl $crate::statistics::Statistic for $name {
            fn log(&self, statistic_logger: $crate::statistics::StatisticLogger) {
                $(
                    $crate::statistics::Statistic::log(
                        &self.$field,
                        statistic_logger.attach_to_prefix(stringify!($field)),
                    );
                )+
            }
        }
    };
}
