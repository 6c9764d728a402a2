use std::fmt::Display;

/// The mean of every value recorded so far, e.g. the average LBD of the learned constraints.
#[derive(Default, Debug, Copy, Clone)]
pub(crate) struct RunningMean {
    total: u64,
    count: u64,
}

impl RunningMean {
    pub(crate) fn record(&mut self, value: u64) {
        self.total += value;
        self.count += 1;
    }

    /// Zero while nothing has been recorded.
    pub(crate) fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total as f64 / self.count as f64
    }
}

impl Display for RunningMean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_mean_of_nothing_is_zero() {
        assert_eq!(RunningMean::default().mean(), 0.0);
    }

    #[test]
    fn the_mean_covers_every_recorded_value() {
        let mut lbd = RunningMean::default();
        for value in [2, 3, 3, 8] {
            lbd.record(value);
        }
        assert_eq!(lbd.mean(), 4.0);
        assert_eq!(lbd.to_string(), "4");
    }
}
