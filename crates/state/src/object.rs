//! Mutable per-account working copy.
use crate::{AccountInfo, Storage};
use primitives::{Address, Bytes, StorageKey, StorageValue, B256, U256};

/// Mutable working copy of one account within a block.
///
/// `origin_storage` caches committed slot values read from the keeper, `dirty_storage` holds the
/// writes made since the object was loaded. A dirty value always wins over the origin value
/// for the same key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateObject {
    /// Address of the account.
    pub address: Address,
    /// Current account record.
    pub account: AccountInfo,
    /// Code of the account, if loaded or set.
    pub code: Option<Bytes>,
    /// Committed storage values that were read through this object.
    pub origin_storage: Storage,
    /// Uncommitted storage writes.
    pub dirty_storage: Storage,
    /// Code was replaced and must be written back.
    pub dirty_code: bool,
    /// Account was self-destructed in this block.
    pub suicided: bool,
    /// Account was created in this block and has no committed storage.
    pub created: bool,
}

impl StateObject {
    /// Creates an object for an account that already exists in the keeper.
    pub fn new(address: Address, account: AccountInfo) -> Self {
        Self {
            address,
            account,
            ..Default::default()
        }
    }

    /// Creates a fresh object for an account that is not known to the keeper.
    pub fn new_created(address: Address) -> Self {
        Self {
            address,
            created: true,
            ..Default::default()
        }
    }

    /// Balance of the account.
    #[inline]
    pub fn balance(&self) -> U256 {
        self.account.balance
    }

    /// Nonce of the account.
    #[inline]
    pub fn nonce(&self) -> u64 {
        self.account.nonce
    }

    /// Code hash of the account.
    #[inline]
    pub fn code_hash(&self) -> B256 {
        self.account.code_hash
    }

    /// Returns true if the account is empty per EIP-161.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.account.is_empty()
    }

    /// Sets balance without journaling.
    #[inline]
    pub fn set_balance(&mut self, balance: U256) {
        self.account.balance = balance;
    }

    /// Sets nonce without journaling.
    #[inline]
    pub fn set_nonce(&mut self, nonce: u64) {
        self.account.nonce = nonce;
    }

    /// Replaces code and code hash without journaling.
    pub fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.account.code_hash = code_hash;
        self.code = Some(code);
        self.dirty_code = true;
    }

    /// Writes a slot value without journaling. The empty value marks a deletion.
    #[inline]
    pub fn set_state(&mut self, key: StorageKey, value: StorageValue) {
        self.dirty_storage.insert(key, value);
    }

    /// Removes a dirty slot value, exposing the origin value again.
    #[inline]
    pub fn clear_dirty(&mut self, key: &StorageKey) {
        self.dirty_storage.remove(key);
    }

    /// Returns the uncommitted value of a slot, if one was written.
    #[inline]
    pub fn dirty_state(&self, key: &StorageKey) -> Option<StorageValue> {
        self.dirty_storage.get(key).copied()
    }

    /// Returns the cached committed value of a slot, if it was read before.
    ///
    /// Created accounts have no committed storage, every slot reads as zero.
    #[inline]
    pub fn origin_state(&self, key: &StorageKey) -> Option<StorageValue> {
        if self.created {
            return Some(StorageValue::ZERO);
        }
        self.origin_storage.get(key).copied()
    }

    /// Caches a committed slot value read from the keeper.
    #[inline]
    pub fn cache_origin(&mut self, key: StorageKey, value: StorageValue) {
        self.origin_storage.insert(key, value);
    }

    /// Returns the effective value of a slot if it is known without a keeper read.
    pub fn known_state(&self, key: &StorageKey) -> Option<StorageValue> {
        self.dirty_state(key).or_else(|| self.origin_state(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::address;

    #[test]
    fn dirty_wins_over_origin() {
        let mut object = StateObject::new(
            address!("0x1000000000000000000000000000000000000001"),
            AccountInfo::default(),
        );
        let key = U256::from(7);
        object.cache_origin(key, U256::from(1));
        assert_eq!(object.known_state(&key), Some(U256::from(1)));

        object.set_state(key, U256::from(2));
        assert_eq!(object.known_state(&key), Some(U256::from(2)));

        object.clear_dirty(&key);
        assert_eq!(object.known_state(&key), Some(U256::from(1)));
    }

    #[test]
    fn created_object_reads_zero() {
        let object =
            StateObject::new_created(address!("0x1000000000000000000000000000000000000002"));
        assert_eq!(object.known_state(&U256::from(1)), Some(U256::ZERO));
    }
}
