//! Flat containers indexed by variables, literals and constraint references.
mod key_value_heap;
mod keyed_vec;

use fnv::FnvBuildHasher;
pub(crate) use key_value_heap::*;
pub use keyed_vec::*;

/// A hash map with the FNV hasher, so that iteration order does not vary between runs.
pub type HashMap<K, V, Hasher = FnvBuildHasher> = std::collections::HashMap<K, V, Hasher>;
/// A hash set with the FNV hasher, so that iteration order does not vary between runs.
pub type HashSet<K, Hasher = FnvBuildHasher> = std::collections::HashSet<K, Hasher>;
