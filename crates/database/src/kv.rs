//! Byte key/value stores.
use core::convert::Infallible;
use database_interface::{KvBatch, KvStore};
use std::collections::BTreeMap;

/// A [KvStore] kept entirely in memory, ordered by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryKvStore {
    /// Stored entries.
    pub entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKvStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries whose key starts with `prefix`.
    pub fn iter_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
    }
}

impl KvStore for MemoryKvStore {
    type Error = Infallible;

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.entries.remove(key);
        Ok(())
    }

    fn apply(&mut self, batch: &KvBatch) -> Result<(), Self::Error> {
        for (key, value) in batch {
            match value {
                Some(value) => self.entries.insert(key.clone(), value.clone()),
                None => self.entries.remove(key),
            };
        }
        Ok(())
    }
}

/// A [KvStore] overlay buffering writes until [`CacheKvStore::flush`].
///
/// Dropping the overlay discards every buffered write.
#[derive(Clone, Debug, Default)]
pub struct CacheKvStore<S> {
    /// Buffered writes, `None` marks a deletion.
    pub writes: KvBatch,
    /// The wrapped store.
    pub inner: S,
}

impl<S> CacheKvStore<S> {
    /// Creates an empty overlay over `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            writes: KvBatch::new(),
            inner,
        }
    }

    /// Returns true if no write is buffered.
    pub fn is_clean(&self) -> bool {
        self.writes.is_empty()
    }

    /// Drops every buffered write.
    pub fn discard(&mut self) {
        self.writes.clear();
    }
}

impl<S: KvStore> CacheKvStore<S> {
    /// Writes buffered entries into the wrapped store as one batch.
    ///
    /// On error the wrapped store is untouched and the writes stay buffered.
    pub fn flush(&mut self) -> Result<(), S::Error> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.inner.apply(&self.writes)?;
        self.writes.clear();
        Ok(())
    }

    /// Returns the batch restoring the wrapped store to its current content once the buffered
    /// writes are flushed.
    pub fn undo_batch(&mut self) -> Result<KvBatch, S::Error> {
        let inner = &mut self.inner;
        self.writes
            .keys()
            .map(|key| Ok((key.clone(), inner.get(key)?)))
            .collect()
    }
}

impl<S: KvStore> KvStore for CacheKvStore<S> {
    type Error = S::Error;

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.inner.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn apply(&mut self, batch: &KvBatch) -> Result<(), Self::Error> {
        self.writes
            .extend(batch.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }
}
