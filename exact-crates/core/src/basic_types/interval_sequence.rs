//! The schedules of conflict intervals between restarts.

/// The shape of the sequence of restart intervals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SequenceGeneratorType {
    /// Every interval is the base interval.
    Constant,
    /// Every interval is the previous one times a growth factor, rounded down.
    Geometric,
    /// The intervals follow the Luby sequence times the base interval.
    #[default]
    Luby,
}

/// A stream of positive interval lengths, counted in conflicts.
#[derive(Clone, Copy, Debug)]
pub(crate) enum IntervalSequence {
    Constant { interval: u64 },
    Geometric { upcoming: u64, growth_factor: f64 },
    /// Knuth's "reluctant doubling" pair, which yields the Luby sequence
    /// `1, 1, 2, 1, 1, 2, 4, 1, ...` in constant time per element.
    Luby { base: u64, u: u64, v: u64 },
}

impl IntervalSequence {
    pub(crate) fn new(kind: SequenceGeneratorType, base: u64, growth_factor: f64) -> Self {
        match kind {
            SequenceGeneratorType::Constant => IntervalSequence::Constant { interval: base },
            SequenceGeneratorType::Geometric => IntervalSequence::Geometric {
                upcoming: base,
                growth_factor,
            },
            SequenceGeneratorType::Luby => IntervalSequence::Luby { base, u: 1, v: 1 },
        }
    }

    /// The next interval; never zero, and saturating at `u64::MAX`.
    pub(crate) fn next_interval(&mut self) -> u64 {
        let interval = match self {
            IntervalSequence::Constant { interval } => *interval,
            IntervalSequence::Geometric {
                upcoming,
                growth_factor,
            } => {
                let interval = *upcoming;
                // float to int casts saturate
                *upcoming = (*upcoming as f64 * *growth_factor) as u64;
                interval
            }
            IntervalSequence::Luby { base, u, v } => {
                let element = *v;
                if *u & u.wrapping_neg() == *v {
                    *u += 1;
                    *v = 1;
                } else {
                    *v *= 2;
                }
                element.saturating_mul(*base)
            }
        };
        interval.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(sequence: &mut IntervalSequence, len: usize) -> Vec<u64> {
        (0..len).map(|_| sequence.next_interval()).collect()
    }

    /// The i-th (1-based) element of the Luby sequence by its recursive definition.
    fn luby(i: u64) -> u64 {
        let k = u64::BITS - i.leading_zeros();
        if i == (1 << k) - 1 {
            1 << (k - 1)
        } else {
            luby(i - (1 << (k - 1)) + 1)
        }
    }

    #[test]
    fn geometric_intervals_are_rounded_down_at_every_step() {
        let mut sequence = IntervalSequence::new(SequenceGeneratorType::Geometric, 10, 1.5);
        assert_eq!(prefix(&mut sequence, 5), vec![10, 15, 22, 33, 49]);
    }

    #[test]
    fn luby_intervals_follow_the_recursive_definition() {
        let mut sequence = IntervalSequence::new(SequenceGeneratorType::Luby, 1, 0.0);
        assert_eq!(
            prefix(&mut sequence, 15),
            vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]
        );

        let mut scaled = IntervalSequence::new(SequenceGeneratorType::Luby, 100, 0.0);
        for i in 1..50_000 {
            assert_eq!(scaled.next_interval(), 100 * luby(i));
        }
    }

    #[test]
    fn intervals_are_never_zero() {
        let mut sequence = IntervalSequence::new(SequenceGeneratorType::Geometric, 1, 0.5);
        assert_eq!(prefix(&mut sequence, 3), vec![1, 1, 1]);
    }
}
