//! The process-wide destination of the statistic lines.
//!
//! Every line has the form `{prefix} {name}={value}`, and a block of statistics may be closed by
//! a fixed line, which lets a caller embed the statistics in an output format such as the
//! comment lines of a solver competition.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::stdout;
use std::io::Write;
use std::sync::Mutex;
use std::sync::OnceLock;

use convert_case::Case;
use convert_case::Casing;

/// How and where statistics are written, fixed by [`configure_statistic_logging`].
pub struct StatisticOptions {
    line_prefix: &'static str,
    closing_line: Option<&'static str>,
    casing: Option<Case>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StatisticOptions {
    fn name(&self, name: impl Display) -> String {
        match self.casing {
            Some(casing) => name.to_string().to_case(casing),
            None => name.to_string(),
        }
    }

    fn write_line(&self, line: impl Display) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }
}

impl Debug for StatisticOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticOptions")
            .field("line_prefix", &self.line_prefix)
            .field("closing_line", &self.closing_line)
            .field("casing", &self.casing)
            .finish_non_exhaustive()
    }
}

static STATISTIC_OPTIONS: OnceLock<StatisticOptions> = OnceLock::new();

/// Enables statistic logging. Nothing is logged before the first call, and later calls are
/// ignored.
///
/// Statistics go to `writer`, or to stdout when it is `None`. With a `casing`, every statistic
/// name is converted to it first.
pub fn configure_statistic_logging(
    prefix: &'static str,
    after: Option<&'static str>,
    casing: Option<Case>,
    writer: Option<Box<dyn Write + Send>>,
) {
    let _ = STATISTIC_OPTIONS.get_or_init(|| StatisticOptions {
        line_prefix: prefix,
        closing_line: after,
        casing,
        writer: Mutex::new(writer.unwrap_or_else(|| Box::new(stdout()))),
    });
}

pub fn log_statistic(name: impl Display, value: impl Display) {
    if let Some(options) = STATISTIC_OPTIONS.get() {
        let name = options.name(name);
        options.write_line(format_args!("{} {name}={value}", options.line_prefix));
    }
}

/// Ends a block of statistics with the configured closing line, if there is one.
pub fn log_statistic_postfix() {
    if let Some(options) = STATISTIC_OPTIONS.get() {
        if let Some(closing_line) = options.closing_line {
            options.write_line(closing_line);
        }
    }
}

pub fn should_log_statistics() -> bool {
    STATISTIC_OPTIONS.get().is_some()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::statistics::RunningMean;
    use crate::statistics::Statistic;
    use crate::statistics::StatisticLogger;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("not poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    crate::create_statistics_struct!(ProbeStatistics {
        num_probed: u64,
        average_size: RunningMean,
    });

    // The only test in the crate that configures the global options.
    #[test]
    fn statistics_are_written_with_prefix_casing_and_closing_line() {
        let buffer = SharedBuffer::default();
        configure_statistic_logging(
            "c",
            Some("c end of statistics"),
            Some(Case::Camel),
            Some(Box::new(buffer.clone())),
        );
        assert!(should_log_statistics());

        let mut statistics = ProbeStatistics {
            num_probed: 3,
            ..Default::default()
        };
        statistics.average_size.record(5);
        statistics.log(StatisticLogger::new("solver").attach_to_prefix("inprocessing"));
        log_statistic_postfix();

        let written = String::from_utf8(buffer.0.lock().expect("not poisoned").clone())
            .expect("statistics are utf-8");
        assert_eq!(
            written.lines().collect::<Vec<_>>(),
            vec![
                "c solverInprocessingNumProbed=3",
                "c solverInprocessingAverageSize=5",
                "c end of statistics",
            ]
        );
    }
}
