//! [EIP-2929](https://eips.ethereum.org/EIPS/eip-2929) access list.
use primitives::{Address, StorageKey};
use std::collections::{BTreeMap, BTreeSet};

/// Warm addresses and slots of the running transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessList {
    addresses: BTreeMap<Address, BTreeSet<StorageKey>>,
}

impl AccessList {
    /// Returns true if the address is warm.
    #[inline]
    pub fn contains_address(&self, address: &Address) -> bool {
        self.addresses.contains_key(address)
    }

    /// Returns whether the address and the slot are warm.
    pub fn contains(&self, address: &Address, slot: &StorageKey) -> (bool, bool) {
        match self.addresses.get(address) {
            Some(slots) => (true, slots.contains(slot)),
            None => (false, false),
        }
    }

    /// Adds an address. Returns true if it was not present.
    pub fn add_address(&mut self, address: Address) -> bool {
        if self.addresses.contains_key(&address) {
            return false;
        }
        self.addresses.insert(address, BTreeSet::new());
        true
    }

    /// Adds a slot, adding its address as well. Returns which of the two were newly added.
    pub fn add_slot(&mut self, address: Address, slot: StorageKey) -> (bool, bool) {
        let address_added = self.add_address(address);
        let slots = self
            .addresses
            .get_mut(&address)
            .expect("address was just inserted");
        (address_added, slots.insert(slot))
    }

    /// Removes an address.
    ///
    /// # Panics
    ///
    /// Panics if the address still has slots; slot additions are always newer than the
    /// address addition and are reverted first.
    pub fn delete_address(&mut self, address: &Address) {
        if let Some(slots) = self.addresses.remove(address) {
            assert!(
                slots.is_empty(),
                "access list address reverted before its slots"
            );
        }
    }

    /// Removes a slot.
    pub fn delete_slot(&mut self, address: &Address, slot: &StorageKey) {
        if let Some(slots) = self.addresses.get_mut(address) {
            slots.remove(slot);
        }
    }

    /// Number of warm addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true if nothing is warm.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
