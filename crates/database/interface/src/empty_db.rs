//! Empty keeper implementation.
use crate::{DBErrorMarker, Keeper, KvBatch, KvStore};
use core::{convert::Infallible, fmt, marker::PhantomData};
use primitives::{Address, Bytes, StorageKey, StorageValue, B256};
use state::{AccountInfo, StateChangeset};

/// An empty keeper that always returns default values when queried.
pub type EmptyKeeper = EmptyKeeperTyped<Infallible>;

/// An empty keeper that always returns default values when queried and drops every write.
///
/// This is generic over a type which is used as the keeper error type.
pub struct EmptyKeeperTyped<E> {
    _phantom: PhantomData<E>,
}

// Don't derive traits, because the type parameter is unused.
impl<E> Clone for EmptyKeeperTyped<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EmptyKeeperTyped<E> {}

impl<E> Default for EmptyKeeperTyped<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EmptyKeeperTyped<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyKeeper").finish_non_exhaustive()
    }
}

impl<E> EmptyKeeperTyped<E> {
    /// Create a new empty keeper.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<E: DBErrorMarker> Keeper for EmptyKeeperTyped<E> {
    type Error = E;

    #[inline]
    fn account(&mut self, _address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(None)
    }

    #[inline]
    fn code(&mut self, _code_hash: B256) -> Result<Option<Bytes>, Self::Error> {
        Ok(None)
    }

    #[inline]
    fn storage(
        &mut self,
        _address: Address,
        _key: StorageKey,
    ) -> Result<StorageValue, Self::Error> {
        Ok(StorageValue::ZERO)
    }

    #[inline]
    fn apply(&mut self, _changes: &StateChangeset) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<E: DBErrorMarker> KvStore for EmptyKeeperTyped<E> {
    type Error = E;

    #[inline]
    fn get(&mut self, _key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(None)
    }

    #[inline]
    fn set(&mut self, _key: &[u8], _value: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    #[inline]
    fn delete(&mut self, _key: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    #[inline]
    fn apply(&mut self, _batch: &KvBatch) -> Result<(), Self::Error> {
        Ok(())
    }
}
