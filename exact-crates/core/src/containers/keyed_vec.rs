use std::marker::PhantomData;
use std::ops::Index;
use std::ops::IndexMut;

/// A type which maps one-to-one onto a dense range of `usize` slots.
///
/// Variables, literals and constraint references all have such an encoding, which lets per-variable
/// and per-literal data live in flat vectors instead of maps.
pub trait DenseKey: Clone {
    fn index(&self) -> usize;

    fn from_index(index: usize) -> Self;
}

impl DenseKey for usize {
    fn index(&self) -> usize {
        *self
    }

    fn from_index(index: usize) -> Self {
        index
    }
}

/// A flat vector which can only be indexed by `Key`, so that e.g. a table of literal levels cannot
/// accidentally be looked up with a variable.
#[derive(Debug, Hash, PartialEq, Eq)]
pub struct KeyedVec<Key, Value> {
    slots: Vec<Value>,
    key: PhantomData<Key>,
}

impl<Key, Value> Default for KeyedVec<Key, Value> {
    fn default() -> Self {
        KeyedVec {
            slots: Vec::new(),
            key: PhantomData,
        }
    }
}

// Derived `Clone` would require `Key: Clone` as well.
impl<Key, Value: Clone> Clone for KeyedVec<Key, Value> {
    fn clone(&self) -> Self {
        KeyedVec {
            slots: self.slots.clone(),
            key: PhantomData,
        }
    }
}

impl<Key: DenseKey, Value> KeyedVec<Key, Value> {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Appends `value` and returns the key of its slot.
    pub fn push(&mut self, value: Value) -> Key {
        let key = Key::from_index(self.slots.len());
        self.slots.push(value);
        key
    }

    pub fn iter(&self) -> impl Iterator<Item = &'_ Value> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &'_ mut Value> {
        self.slots.iter_mut()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = Key> {
        (0..self.slots.len()).map(Key::from_index)
    }

    pub(crate) fn into_values(self) -> impl Iterator<Item = Value> {
        self.slots.into_iter()
    }
}

impl<Key: DenseKey, Value: Clone> KeyedVec<Key, Value> {
    /// Grows the vector until `key` has a slot, filling the new slots with `fill`. Never shrinks.
    ///
    /// Called with the highest variable (or its negative literal) whenever new variables are
    /// introduced.
    pub(crate) fn grow_to_include(&mut self, key: Key, fill: Value) {
        let required = key.index() + 1;
        if self.slots.len() < required {
            self.slots.resize(required, fill);
        }
    }
}

impl<Key: DenseKey, Value> Index<Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, key: Key) -> &Value {
        &self.slots[key.index()]
    }
}

impl<Key: DenseKey, Value> Index<&Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, key: &Key) -> &Value {
        &self.slots[key.index()]
    }
}

impl<Key: DenseKey, Value> IndexMut<Key> for KeyedVec<Key, Value> {
    fn index_mut(&mut self, key: Key) -> &mut Value {
        &mut self.slots[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Var;

    #[test]
    fn growing_never_shrinks_or_overwrites() {
        let mut levels: KeyedVec<usize, u32> = KeyedVec::default();
        levels.grow_to_include(4, 7);
        assert_eq!(levels.len(), 5);

        levels[2] = 1;
        levels.grow_to_include(1, 9);
        assert_eq!(levels.len(), 5);
        assert_eq!(levels.iter().copied().collect::<Vec<_>>(), vec![7, 7, 1, 7, 7]);
    }

    #[test]
    fn pushing_hands_out_consecutive_keys() {
        let mut names: KeyedVec<Var, &str> = KeyedVec::default();
        names.grow_to_include(Var::from_index(0), "unused");
        let first = names.push("x1");
        let second = names.push("x2");

        assert_eq!(first.index() + 1, second.index());
        assert_eq!(names[first], "x1");
        assert_eq!(names.keys().last(), Some(second));
    }
}
