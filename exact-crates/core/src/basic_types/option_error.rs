use thiserror::Error;

/// Errors related to invalid solver configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    #[error("option `{name}` should be in {expected}, but was {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("`bits-reduced` ({reduced}) cannot exceed `bits-overflow` ({overflow})")]
    InconsistentBitWidths { reduced: u32, overflow: u32 },
    #[error("option `{name}` requires `{requires}`")]
    MissingRequirement {
        name: &'static str,
        requires: &'static str,
    },
}

impl OptionError {
    pub(crate) fn out_of_range(
        name: &'static str,
        expected: &'static str,
        value: impl ToString,
    ) -> OptionError {
        OptionError::OutOfRange {
            name,
            expected,
            value: value.to_string(),
        }
    }
}
