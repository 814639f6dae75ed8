//! Checkpointing primitives shared by all stateful objects.
//!
//! - [Checkpoint]: the store/restore protocol driven by the sampler.
//! - [Epoch] and [EpochClock]: version stamps used to decide whether a cached value is stale.
//! - [Journaled]: a vector with an undo journal, so checkpoints cost O(changed entries).
//! - [Memo]: a shared cached value tagged with the epochs it was computed from.

use std::rc::Rc;

// =#========================================================================#=
// CHECKPOINT (Trait)
// =#========================================================================#=
/// Store/restore protocol of the sampler.
///
/// After a proposal the driver either calls [Checkpoint::store] (accept) or
/// [Checkpoint::restore] (reject). `restore` brings the object back to exactly the
/// state of the last `store`.
pub trait Checkpoint {
    /// Marks the current state as the one to return to on the next `restore`.
    fn store(&mut self);

    /// Rolls back every change made since the last `store`.
    fn restore(&mut self);
}

// =#========================================================================#=
// EPOCH
// =#========================================================================#=
/// Opaque version stamp issued by an [EpochClock].
///
/// Two epochs issued by the same clock are equal if and only if they describe the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch of a freshly constructed object.
    pub const INITIAL: Epoch = Epoch(0);
}

/// Issues epochs for one stateful object.
///
/// `current` identifies the present state. `issued` only ever grows: rolling back
/// with [Checkpoint::restore] brings `current` back to the stored epoch, but the next
/// [EpochClock::advance] still yields a stamp that was never used before. Caches keyed
/// on epochs can therefore never mistake a new state for an older one.
#[derive(Debug, Clone)]
pub struct EpochClock {
    current: Epoch,
    stored: Epoch,
    issued: u64,
}

impl EpochClock {
    /// Creates a clock positioned at [Epoch::INITIAL].
    pub fn new() -> Self {
        Self {
            current: Epoch::INITIAL,
            stored: Epoch::INITIAL,
            issued: 0,
        }
    }

    /// Returns the epoch of the present state.
    #[inline]
    pub fn current(&self) -> Epoch {
        self.current
    }

    /// Issues a never-seen epoch and makes it current.
    pub fn advance(&mut self) -> Epoch {
        self.issued += 1;
        self.current = Epoch(self.issued);
        self.current
    }
}

impl Default for EpochClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkpoint for EpochClock {
    fn store(&mut self) {
        self.stored = self.current;
    }

    fn restore(&mut self) {
        self.current = self.stored;
    }
}

// =#========================================================================#=
// JOURNALED
// =#========================================================================#=
/// A fixed-length vector that records the prior value of every entry it overwrites.
///
/// Only the first write to an index after a `store` is journaled, so the journal
/// never holds more than one entry per index and `restore` replays it in
/// O(touched entries).
///
/// # Example
/// ```
/// use reticulate::checkpoint::{Checkpoint, Journaled};
///
/// let mut heights = Journaled::new(vec![0.0, 1.0, 2.0]);
/// heights.store();
/// heights.set(1, 5.0);
/// heights.set(1, 6.0);
/// assert_eq!(heights[1], 6.0);
///
/// heights.restore();
/// assert_eq!(heights[1], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Journaled<T: Clone> {
    values: Vec<T>,
    saved: Vec<(usize, T)>,
    touched: Vec<bool>,
}

impl<T: Clone> Journaled<T> {
    /// Wraps `values` with an empty journal.
    pub fn new(values: Vec<T>) -> Self {
        let touched = vec![false; values.len()];
        Self {
            values,
            saved: Vec::new(),
            touched,
        }
    }

    /// Creates a journaled vector of `len` copies of `value`.
    pub fn filled(value: T, len: usize) -> Self {
        Self::new(vec![value; len])
    }

    /// Appends an entry. Growth is not journaled, so only use this while constructing.
    pub fn push(&mut self, value: T) {
        self.values.push(value);
        self.touched.push(false);
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a reference to entry `index`.
    #[inline]
    pub fn get(&self, index: usize) -> &T {
        &self.values[index]
    }

    /// Overwrites entry `index`, journaling its prior value if needed.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.touch(index);
        self.values[index] = value;
    }

    /// Returns a mutable reference to entry `index`, journaling its prior value if needed.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        self.touch(index);
        &mut self.values[index]
    }

    /// Returns all entries as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Returns an iterator over all entries.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Returns the number of entries changed since the last `store`.
    pub fn num_changed(&self) -> usize {
        self.saved.len()
    }

    #[inline]
    fn touch(&mut self, index: usize) {
        if !self.touched[index] {
            self.touched[index] = true;
            self.saved.push((index, self.values[index].clone()));
        }
    }
}

impl<T: Clone> Checkpoint for Journaled<T> {
    fn store(&mut self) {
        for (index, _) in self.saved.drain(..) {
            self.touched[index] = false;
        }
    }

    fn restore(&mut self) {
        for (index, value) in self.saved.drain(..).rev() {
            self.values[index] = value;
            self.touched[index] = false;
        }
    }
}

impl<T: Clone> std::ops::Index<usize> for Journaled<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

// =#========================================================================#=
// MEMO
// =#========================================================================#=
/// A cached value together with the epochs of the state it was computed from.
///
/// The value lives behind an [Rc], so `store` and `restore` only swap pointers.
#[derive(Debug)]
pub struct Memo<T> {
    current: Option<(Vec<Epoch>, Rc<T>)>,
    stored: Option<(Vec<Epoch>, Rc<T>)>,
}

impl<T> Memo<T> {
    /// Creates an empty memo; the first lookup always computes.
    pub fn new() -> Self {
        Self {
            current: None,
            stored: None,
        }
    }

    /// Returns the cached value if it was computed from exactly `dependencies`.
    pub fn get(&self, dependencies: &[Epoch]) -> Option<&Rc<T>> {
        match &self.current {
            Some((epochs, value)) if epochs.as_slice() == dependencies => Some(value),
            _ => None,
        }
    }

    /// Returns the cached value regardless of staleness.
    pub fn latest(&self) -> Option<&Rc<T>> {
        self.current.as_ref().map(|(_, value)| value)
    }

    /// Replaces the cached value.
    pub fn put(&mut self, dependencies: &[Epoch], value: Rc<T>) {
        self.current = Some((dependencies.to_vec(), value));
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            stored: self.stored.clone(),
        }
    }
}

impl<T> Checkpoint for Memo<T> {
    fn store(&mut self) {
        self.stored = self.current.clone();
    }

    fn restore(&mut self) {
        self.current = self.stored.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_never_reissues_after_restore() {
        let mut clock = EpochClock::new();
        clock.store();
        let first = clock.advance();
        clock.restore();
        assert_eq!(clock.current(), Epoch::INITIAL);

        let second = clock.advance();
        assert_ne!(first, second);
    }

    #[test]
    fn test_journal_only_keeps_first_write() {
        let mut values = Journaled::new(vec![1, 2, 3]);
        values.store();
        values.set(0, 10);
        values.set(0, 20);
        *values.get_mut(2) = 30;
        assert_eq!(values.num_changed(), 2);

        values.restore();
        assert_eq!(values.as_slice(), &[1, 2, 3]);
        assert_eq!(values.num_changed(), 0);
    }

    #[test]
    fn test_journal_store_commits() {
        let mut values = Journaled::filled(0.0, 2);
        values.set(1, 4.0);
        values.store();
        values.restore();
        assert_eq!(values[1], 4.0);
    }

    #[test]
    fn test_memo_validity() {
        let mut memo = Memo::new();
        let deps = [Epoch::INITIAL];
        assert!(memo.get(&deps).is_none());

        memo.put(&deps, Rc::new(7));
        assert_eq!(memo.get(&deps).map(|v| **v), Some(7));

        let mut clock = EpochClock::new();
        let newer = [clock.advance()];
        assert!(memo.get(&newer).is_none());

        memo.store();
        memo.put(&newer, Rc::new(8));
        memo.restore();
        assert_eq!(memo.get(&deps).map(|v| **v), Some(7));
    }
}
