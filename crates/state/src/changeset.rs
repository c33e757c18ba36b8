//! Flattened, ordered set of writes produced by a state commit.
use crate::{AccountInfo, Storage};
use primitives::{Address, Bytes, B256};

/// Change to a single account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountChange {
    /// Account was self-destructed, or emptied under EIP-161; its record and storage are removed.
    Delete,
    /// Account record is written, together with new code and changed slots.
    Update {
        /// New account record.
        info: AccountInfo,
        /// New code, if it changed.
        code: Option<(B256, Bytes)>,
        /// Changed slots. A zero value deletes the slot.
        storage: Storage,
    },
}

/// All account writes of one commit, sorted by address.
///
/// A keeper must apply a changeset completely or not at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateChangeset {
    /// Account changes in ascending address order.
    pub accounts: Vec<(Address, AccountChange)>,
}

impl StateChangeset {
    /// Returns true if there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Number of changed accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }
}
