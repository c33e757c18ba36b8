//! Keeper and key/value store interfaces.
//!
//! The [`Keeper`] is the persistent backing of account records, code and storage slots. The
//! [`KvStore`] is the persistent byte store the aspect registry lives in. Both are external
//! collaborators: the execution core only reads through them and hands them complete,
//! ordered change sets to apply.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use core::convert::Infallible;

use auto_impl::auto_impl;
use primitives::{Address, Bytes, StorageKey, StorageValue, B256};
use state::{AccountInfo, StateChangeset};
use std::collections::BTreeMap;

pub mod empty_db;

pub use empty_db::{EmptyKeeper, EmptyKeeperTyped};

/// Keeper error marker is needed to implement From conversion for Error type.
pub trait DBErrorMarker: core::error::Error + Send + Sync + 'static {}

/// Implement marker for `()`.
impl DBErrorMarker for Infallible {}

/// Persistent account, code and storage backing.
#[auto_impl(&mut, Box)]
pub trait Keeper {
    /// The keeper error type.
    type Error: DBErrorMarker;

    /// Gets the account record, `None` if the account does not exist.
    fn account(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error>;

    /// Gets code by its hash.
    fn code(&mut self, code_hash: B256) -> Result<Option<Bytes>, Self::Error>;

    /// Gets the committed value of a storage slot.
    fn storage(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, Self::Error>;

    /// Applies a change set.
    ///
    /// Implementations must be atomic: either every change is applied or, on error, none is.
    fn apply(&mut self, changes: &StateChangeset) -> Result<(), Self::Error>;
}

/// Ordered set of key/value writes, `None` deleting the key.
pub type KvBatch = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Persistent byte key/value store.
#[auto_impl(&mut, Box)]
pub trait KvStore {
    /// The store error type.
    type Error: DBErrorMarker;

    /// Gets the value stored under `key`.
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Writes `value` under `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error>;

    /// Applies a batch of writes.
    ///
    /// Implementations must be atomic: either every write is applied or, on error, none is.
    fn apply(&mut self, batch: &KvBatch) -> Result<(), Self::Error>;

    /// Returns true if a value is stored under `key`.
    #[inline]
    fn has(&mut self, key: &[u8]) -> Result<bool, Self::Error> {
        self.get(key).map(|value| value.is_some())
    }
}
