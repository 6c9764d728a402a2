//! The priority queue behind VSIDS: a max-heap over variables ordered by activity, where
//! assigned variables are taken out and put back on backtracking with their activity intact.
use std::ops::AddAssign;
use std::ops::DivAssign;

use super::KeyedVec;
use super::DenseKey;
use crate::exact_assert_moderate;

/// A max-heap of keys by priority.
///
/// Positions `0..size` form the heap proper; the removed keys are parked in `size..`, and so every
/// key always has a position and a priority.
#[derive(Debug, Clone)]
pub(crate) struct KeyValueHeap<Key, Value> {
    priorities: Vec<Value>,
    key_at: Vec<Key>,
    position_of: KeyedVec<Key, usize>,
    size: usize,
}

impl<Key, Value> Default for KeyValueHeap<Key, Value> {
    fn default() -> Self {
        KeyValueHeap {
            priorities: Vec::new(),
            key_at: Vec::new(),
            position_of: KeyedVec::default(),
            size: 0,
        }
    }
}

impl<Key, Value> KeyValueHeap<Key, Value>
where
    Key: DenseKey + Copy,
    Value: AddAssign<Value> + DivAssign<Value> + PartialOrd + Default + Copy,
{
    pub(crate) fn peek_max(&self) -> Option<(Key, Value)> {
        if self.is_empty() {
            None
        } else {
            Some((self.key_at[0], self.priorities[0]))
        }
    }

    pub(crate) fn get_value(&self, key: Key) -> Value {
        self.priorities[self.position_of[key]]
    }

    pub(crate) fn pop_max(&mut self) -> Option<Key> {
        let (best_key, _) = self.peek_max()?;
        self.delete_key(best_key);
        Some(best_key)
    }

    /// Increments the value of `key`. The key does not need to be present in the heap.
    pub(crate) fn increment(&mut self, key: Key, increment: Value) {
        let position = self.position_of[key];
        self.priorities[position] += increment;
        if self.is_key_present(key) {
            self.sift_up(position);
        }
    }

    /// Puts `key` back into the heap with the value it had when it was deleted.
    pub(crate) fn restore_key(&mut self, key: Key) {
        if !self.is_key_present(key) {
            let position = self.position_of[key];
            exact_assert_moderate!(position >= self.size);
            self.swap_positions(position, self.size);
            self.size += 1;
            self.sift_up(self.size - 1);
        }
    }

    /// Removes `key` from the heap; its value is kept for a later [`KeyValueHeap::restore_key`].
    pub(crate) fn delete_key(&mut self, key: Key) {
        if self.is_key_present(key) {
            let position = self.position_of[key];
            self.swap_positions(position, self.size - 1);
            self.size -= 1;
            if position < self.size {
                self.sift_down(position);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn num_keys(&self) -> usize {
        self.priorities.len()
    }

    pub(crate) fn is_key_present(&self, key: Key) -> bool {
        self.position_of[key] < self.size
    }

    /// Adds the next key to the heap. Keys have to be added in the order of their index.
    pub(crate) fn grow(&mut self, key: Key, value: Value) {
        let parked = self.priorities.len();
        exact_assert_moderate!(key.index() == parked);

        self.priorities.push(value);
        self.key_at.push(key);
        let _ = self.position_of.push(parked);
        // the first parked key (if any) moves to the back
        self.swap_positions(self.size, parked);
        self.size += 1;
        self.sift_up(self.size - 1);
    }

    /// Divides all values by `divisor`, including the values of deleted keys.
    pub(crate) fn divide_values(&mut self, divisor: Value) {
        for value in self.priorities.iter_mut() {
            *value /= divisor;
        }
    }

    /// The key stored at the given heap position; used for random selection.
    pub(crate) fn key_at_position(&self, position: usize) -> Key {
        self.key_at[position]
    }

    fn swap_positions(&mut self, first: usize, second: usize) {
        self.priorities.swap(first, second);
        self.key_at.swap(first, second);
        let (first_key, second_key) = (self.key_at[first], self.key_at[second]);
        self.position_of[first_key] = first;
        self.position_of[second_key] = second;
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.priorities[parent] >= self.priorities[position] {
                break;
            }
            self.swap_positions(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        exact_assert_moderate!(position < self.size);

        while let Some(largest_child) = self.largest_child_position(position) {
            if self.priorities[position] >= self.priorities[largest_child] {
                break;
            }
            self.swap_positions(position, largest_child);
            position = largest_child;
        }
    }

    fn largest_child_position(&self, position: usize) -> Option<usize> {
        let left = 2 * position + 1;
        let right = left + 1;
        match (left < self.size, right < self.size) {
            (false, _) => None,
            (true, true) if self.priorities[right] > self.priorities[left] => Some(right),
            (true, _) => Some(left),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::KeyValueHeap;

    fn heap_with_values(values: &[f64]) -> KeyValueHeap<usize, f64> {
        let mut heap = KeyValueHeap::default();
        for (key, value) in values.iter().enumerate() {
            heap.grow(key, *value);
        }
        heap
    }

    #[test]
    fn pops_in_decreasing_order() {
        let mut heap = heap_with_values(&[5.0, 1.0, 9.0, 3.0, 7.0]);

        let order = std::iter::from_fn(|| heap.pop_max()).collect::<Vec<_>>();
        assert_eq!(order, vec![2, 4, 0, 3, 1]);
        assert!(heap.is_empty());
    }

    #[test]
    fn restored_keys_keep_their_value() {
        let mut heap = heap_with_values(&[5.0, 1.0, 9.0]);

        heap.delete_key(2);
        assert_eq!(heap.peek_max(), Some((0, 5.0)));
        heap.increment(1, 10.0);
        assert_eq!(heap.peek_max(), Some((1, 11.0)));

        heap.restore_key(2);
        assert_eq!(heap.pop_max(), Some(1));
        assert_eq!(heap.pop_max(), Some(2));
        assert_eq!(heap.get_value(2), 9.0);
    }

    #[test]
    fn increment_of_absent_key_is_remembered() {
        let mut heap = heap_with_values(&[1.0, 2.0]);

        heap.delete_key(0);
        heap.increment(0, 5.0);
        assert_eq!(heap.peek_max(), Some((1, 2.0)));

        heap.restore_key(0);
        assert_eq!(heap.peek_max(), Some((0, 6.0)));
    }

    #[test]
    fn dividing_preserves_order() {
        let mut heap = heap_with_values(&[4.0, 8.0, 2.0]);
        heap.divide_values(2.0);

        assert_eq!(heap.peek_max(), Some((1, 4.0)));
        assert_eq!(heap.len(), 3);
    }
}
