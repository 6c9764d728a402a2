//! Assertions gated by how expensive they are to check.
//!
//! Cheap checks (`simple`) are always on. Checks which walk a constraint or the trail
//! (`moderate`) only run in tests and with the `debug-checks` feature.

pub(crate) const SIMPLE: u8 = 1;
pub(crate) const MODERATE: u8 = 2;

#[cfg(not(any(test, feature = "debug-checks")))]
pub(crate) const ENABLED_LEVEL: u8 = SIMPLE;
#[cfg(any(test, feature = "debug-checks"))]
pub(crate) const ENABLED_LEVEL: u8 = MODERATE;

#[macro_export]
#[doc(hidden)]
macro_rules! exact_assert_simple {
    ($($arg:tt)*) => {
        if $crate::asserts::ENABLED_LEVEL >= $crate::asserts::SIMPLE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! exact_assert_moderate {
    ($($arg:tt)*) => {
        if $crate::asserts::ENABLED_LEVEL >= $crate::asserts::MODERATE {
            assert!($($arg)*);
        }
    };
}
