//! Keeper and key/value store that fail on demand, used to exercise commit atomicity.
use crate::{InMemoryKeeper, MemoryKvStore};
use database_interface::{DBErrorMarker, Keeper, KvBatch, KvStore};
use primitives::{Address, Bytes, StorageKey, StorageValue, B256};
use state::{AccountInfo, StateChangeset};

/// Error returned by [`FaultyKeeper`] when a failure is armed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("injected keeper failure: {0}")]
pub struct FaultyStoreError(pub &'static str);

impl DBErrorMarker for FaultyStoreError {}

/// An in-memory keeper whose next [`Keeper::apply`] can be made to fail.
///
/// A failing apply writes nothing, as the [`Keeper`] contract requires.
#[derive(Clone, Debug, Default)]
pub struct FaultyKeeper {
    /// Backing state.
    pub db: InMemoryKeeper,
    /// Fail the next apply.
    pub fail_next_apply: bool,
    /// Number of successful applies.
    pub applied: usize,
}

impl FaultyKeeper {
    /// Wraps an in-memory keeper.
    pub fn new(db: InMemoryKeeper) -> Self {
        Self {
            db,
            fail_next_apply: false,
            applied: 0,
        }
    }
}

impl Keeper for FaultyKeeper {
    type Error = FaultyStoreError;

    fn account(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.db.account(address).unwrap_or_else(|e| match e {}))
    }

    fn code(&mut self, code_hash: B256) -> Result<Option<Bytes>, Self::Error> {
        Ok(self.db.code(code_hash).unwrap_or_else(|e| match e {}))
    }

    fn storage(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, Self::Error> {
        Ok(self.db.storage(address, key).unwrap_or_else(|e| match e {}))
    }

    fn apply(&mut self, changes: &StateChangeset) -> Result<(), Self::Error> {
        if core::mem::take(&mut self.fail_next_apply) {
            return Err(FaultyStoreError("apply"));
        }
        self.db.apply(changes).unwrap_or_else(|e| match e {});
        self.applied += 1;
        Ok(())
    }
}

/// An in-memory [`KvStore`] whose writes can be made to fail.
///
/// Reads always succeed. A failing write or batch leaves the store untouched.
#[derive(Clone, Debug, Default)]
pub struct FaultyKvStore {
    /// Backing entries.
    pub store: MemoryKvStore,
    /// Fail every write.
    pub fail_writes: bool,
}

impl FaultyKvStore {
    fn check(&self) -> Result<(), FaultyStoreError> {
        if self.fail_writes {
            return Err(FaultyStoreError("kv write"));
        }
        Ok(())
    }
}

impl KvStore for FaultyKvStore {
    type Error = FaultyStoreError;

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.store.get(key).unwrap_or_else(|e| match e {}))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        self.store.set(key, value).unwrap_or_else(|e| match e {});
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        self.store.delete(key).unwrap_or_else(|e| match e {});
        Ok(())
    }

    fn apply(&mut self, batch: &KvBatch) -> Result<(), Self::Error> {
        self.check()?;
        self.store.apply(batch).unwrap_or_else(|e| match e {});
        Ok(())
    }
}
