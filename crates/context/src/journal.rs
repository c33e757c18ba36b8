//! Append-only undo log over the mutable state of a [`crate::StateDb`].
mod access_list;
mod entry;

pub use access_list::AccessList;
pub use entry::JournalEntry;

use primitives::{Address, HashMap, Log};
use state::StateObject;
use std::collections::BTreeMap;

/// The part of the state database that the journal can roll back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournaledState {
    /// Working copies of every account touched in this block, ordered by address.
    pub objects: BTreeMap<Address, StateObject>,
    /// Gas refund counter.
    pub refund: u64,
    /// Logs emitted by the running transaction.
    pub logs: Vec<Log>,
    /// Access list of the running transaction.
    pub access_list: AccessList,
}

impl JournaledState {
    /// Returns the object at `address`.
    ///
    /// # Panics
    ///
    /// Panics if the object was never loaded. Journal entries only reference loaded objects.
    pub(crate) fn object_mut(&mut self, address: Address) -> &mut StateObject {
        self.objects
            .get_mut(&address)
            .expect("journal entry refers to an unloaded state object")
    }
}

/// Append-only list of [`JournalEntry`] with per-address dirty counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    dirties: HashMap<Address, usize>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    #[inline]
    pub fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.dirtied() {
            *self.dirties.entry(address).or_default() += 1;
        }
        self.entries.push(entry);
    }

    /// Number of entries, the value handed out as a snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the journal has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns true if the address has at least one outstanding entry.
    pub fn is_dirty(&self, address: &Address) -> bool {
        self.dirties.contains_key(address)
    }

    /// Dirty addresses in ascending order.
    pub fn sorted_dirties(&self) -> Vec<Address> {
        let mut dirties: Vec<_> = self.dirties.keys().copied().collect();
        dirties.sort_unstable();
        dirties
    }

    /// Undoes every entry appended since `snapshot`, newest first.
    ///
    /// # Panics
    ///
    /// Panics if `snapshot` is beyond the end of the journal. Such a snapshot was never
    /// handed out, continuing would apply divergent state.
    pub fn revert(&mut self, state: &mut JournaledState, snapshot: usize) {
        assert!(
            snapshot <= self.entries.len(),
            "revert to snapshot {snapshot} beyond journal length {}",
            self.entries.len()
        );
        let Self { entries, dirties } = self;
        for entry in entries.drain(snapshot..).rev() {
            if let Some(address) = entry.dirtied() {
                if let Some(count) = dirties.get_mut(&address) {
                    *count -= 1;
                    if *count == 0 {
                        dirties.remove(&address);
                    }
                }
            }
            entry.revert(state);
        }
    }

    /// Drops all entries without reverting them.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirties.clear();
    }
}
