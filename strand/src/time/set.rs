use super::entry::TimerEvent;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::mem;
use std::time::Instant;

/// Timer events sharing one remaining-time key, fired together.
pub(crate) type Chain = Vec<TimerEvent>;

/// Deadline-ordered timer container.
///
/// Entries are keyed by remaining time in milliseconds and each key holds
/// at most one entry. Inserting an event whose key already exists appends
/// it to that entry's chain instead of creating a second entry, so timers
/// sharing a deadline cost one sleep and one wake-up.
#[derive(Default)]
pub(crate) struct TimerSet {
    entries: BTreeMap<u64, Chain>,
}

impl TimerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts one event, merging it into an existing chain with the same key.
    pub(crate) fn insert(&mut self, key: u64, event: TimerEvent) {
        self.entries.entry(key).or_default().push(event);
    }

    /// Re-inserts a whole chain, merging with events that arrived under the
    /// same key while it was out of the set.
    pub(crate) fn insert_chain(&mut self, key: u64, chain: Chain) {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(chain);
            }
            Entry::Occupied(mut slot) => {
                slot.get_mut().extend(chain);
            }
        }
    }

    /// Removes the entry with the smallest remaining time.
    pub(crate) fn pop_first(&mut self) -> Option<(u64, Chain)> {
        self.entries.pop_first()
    }

    /// Subtracts `millis` from every key, clamping at zero.
    ///
    /// Keys that clamp to zero are merged into a single chain.
    pub(crate) fn advance(&mut self, millis: u64) {
        if millis == 0 {
            return;
        }

        for (key, chain) in mem::take(&mut self.entries) {
            self.insert_chain(key.saturating_sub(millis), chain);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of events across all chains.
    pub(crate) fn events(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// The instant at which every event of `chain` is due.
pub(crate) fn chain_deadline(chain: &Chain) -> Option<Instant> {
    chain.iter().map(|event| event.deadline).max()
}
