//! Reassembly buffer that releases items strictly in sequence order.

use std::collections::BTreeMap;

/// Holds out-of-order arrivals until every earlier sequence number has been
/// released. Sequence numbers start at zero.
#[derive(Debug)]
pub struct SequencedBuffer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Default for SequencedBuffer<T> {
    fn default() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<T> SequencedBuffer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an item. Returns `false` (and drops it) if `seq` was already
    /// released or is already buffered.
    pub fn push(&mut self, seq: u64, item: T) -> bool {
        if seq < self.next || self.pending.contains_key(&seq) {
            return false;
        }
        self.pending.insert(seq, item);
        true
    }

    /// Releases the next item if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Sequence number the buffer is waiting for.
    #[must_use]
    pub fn next_expected(&self) -> u64 {
        self.next
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
