//! Journal entries.
//!
//! Every mutation of the [`JournaledState`] appends exactly one entry holding enough data to
//! restore the prior value. Entries are independent of each other, reverting one never
//! assumes another one was already undone.
use super::JournaledState;
use primitives::{Address, Bytes, StorageKey, StorageValue, B256, U256};
use state::StateObject;

/// Journal entries that are used to track changes to the state and are used to revert it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    /// A new state object was inserted for an account unknown to the keeper.
    /// Action: insert object.
    /// Revert: remove object.
    CreateObject {
        /// Address of the created object.
        address: Address,
    },
    /// An existing object was replaced by a fresh one (account re-creation).
    /// Action: replace object.
    /// Revert: restore the previous object.
    ResetObject {
        /// Object as it was before the reset.
        prev: Box<StateObject>,
    },
    /// Account was marked as self-destructed and its balance cleared.
    /// Action: mark suicided, zero the balance.
    /// Revert: restore the flag and the balance.
    Suicide {
        /// Address of the destructed account.
        address: Address,
        /// Suicide flag before the change.
        prev: bool,
        /// Balance before the change.
        prev_balance: U256,
    },
    /// Balance changed.
    /// Action: set balance.
    /// Revert: restore previous balance.
    BalanceChange {
        /// Address of the account.
        address: Address,
        /// Previous balance.
        prev: U256,
    },
    /// Nonce changed.
    /// Action: set nonce.
    /// Revert: restore previous nonce.
    NonceChange {
        /// Address of the account.
        address: Address,
        /// Previous nonce.
        prev: u64,
    },
    /// Storage slot written.
    /// Action: write dirty slot.
    /// Revert: restore the previous dirty value, or drop the dirty value if there was none.
    StorageChange {
        /// Address of the account.
        address: Address,
        /// Slot key.
        key: StorageKey,
        /// Dirty value before the write.
        prev: Option<StorageValue>,
    },
    /// Code replaced.
    /// Action: set code and hash.
    /// Revert: restore previous code, hash and dirty flag.
    CodeChange {
        /// Address of the account.
        address: Address,
        /// Code before the change.
        prev_code: Option<Bytes>,
        /// Code hash before the change.
        prev_hash: B256,
        /// Dirty-code flag before the change.
        prev_dirty: bool,
    },
    /// Refund counter changed.
    /// Action: set counter.
    /// Revert: restore previous counter.
    RefundChange {
        /// Previous refund counter.
        prev: u64,
    },
    /// Log appended.
    /// Action: push log.
    /// Revert: pop log.
    AddLog,
    /// Address added to the access list.
    /// Action: add address.
    /// Revert: remove address.
    AccessListAddAccount {
        /// Added address.
        address: Address,
    },
    /// Slot added to the access list.
    /// Action: add slot.
    /// Revert: remove slot.
    AccessListAddSlot {
        /// Address owning the slot.
        address: Address,
        /// Added slot.
        slot: StorageKey,
    },
}

impl JournalEntry {
    /// Address whose state object this entry modifies, if any.
    ///
    /// Refund, log and access list entries do not dirty an account.
    pub fn dirtied(&self) -> Option<Address> {
        match self {
            Self::CreateObject { address }
            | Self::Suicide { address, .. }
            | Self::BalanceChange { address, .. }
            | Self::NonceChange { address, .. }
            | Self::StorageChange { address, .. }
            | Self::CodeChange { address, .. } => Some(*address),
            Self::ResetObject { prev } => Some(prev.address),
            Self::RefundChange { .. }
            | Self::AddLog
            | Self::AccessListAddAccount { .. }
            | Self::AccessListAddSlot { .. } => None,
        }
    }

    /// Undoes this entry.
    ///
    /// # Panics
    ///
    /// Panics if the object the entry refers to is missing. Entries are reverted strictly
    /// newest to oldest, so the object must still be present.
    pub(crate) fn revert(self, state: &mut JournaledState) {
        match self {
            Self::CreateObject { address } => {
                state.objects.remove(&address);
            }
            Self::ResetObject { prev } => {
                state.objects.insert(prev.address, *prev);
            }
            Self::Suicide {
                address,
                prev,
                prev_balance,
            } => {
                let object = state.object_mut(address);
                object.suicided = prev;
                object.set_balance(prev_balance);
            }
            Self::BalanceChange { address, prev } => {
                state.object_mut(address).set_balance(prev);
            }
            Self::NonceChange { address, prev } => {
                state.object_mut(address).set_nonce(prev);
            }
            Self::StorageChange { address, key, prev } => {
                let object = state.object_mut(address);
                match prev {
                    Some(value) => object.set_state(key, value),
                    None => object.clear_dirty(&key),
                }
            }
            Self::CodeChange {
                address,
                prev_code,
                prev_hash,
                prev_dirty,
            } => {
                let object = state.object_mut(address);
                object.account.code_hash = prev_hash;
                object.code = prev_code;
                object.dirty_code = prev_dirty;
            }
            Self::RefundChange { prev } => {
                state.refund = prev;
            }
            Self::AddLog => {
                state.logs.pop();
            }
            Self::AccessListAddAccount { address } => {
                state.access_list.delete_address(&address);
            }
            Self::AccessListAddSlot { address, slot } => {
                state.access_list.delete_slot(&address, &slot);
            }
        }
    }
}
