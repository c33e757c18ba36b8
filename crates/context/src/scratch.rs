//! Per-transaction aspect key/value scratch space.
use parking_lot::RwLock;
use primitives::{Address, Bytes};
use std::collections::BTreeMap;

type Namespace = BTreeMap<String, Bytes>;

/// Scratch values shared by the hooks of one transaction, namespaced by `(contract, aspect)`.
///
/// One instance is owned by each transaction context and dropped with it. Hooks may read
/// concurrently from query paths running on cache copies, writes take the lock exclusively.
#[derive(Debug, Default)]
pub struct AspectScratch {
    entries: RwLock<BTreeMap<(Address, Address), Namespace>>,
}

impl AspectScratch {
    /// Creates an empty scratch space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a value.
    pub fn get(&self, contract: Address, aspect: Address, key: &str) -> Option<Bytes> {
        self.entries
            .read()
            .get(&(contract, aspect))
            .and_then(|namespace| namespace.get(key))
            .cloned()
    }

    /// Writes a value, returning the previous one.
    pub fn set(
        &self,
        contract: Address,
        aspect: Address,
        key: &str,
        value: Bytes,
    ) -> Option<Bytes> {
        self.entries
            .write()
            .entry((contract, aspect))
            .or_default()
            .insert(key.to_owned(), value)
    }

    /// Removes a value.
    pub fn remove(&self, contract: Address, aspect: Address, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.write();
        let namespace = entries.get_mut(&(contract, aspect))?;
        let value = namespace.remove(key);
        if namespace.is_empty() {
            entries.remove(&(contract, aspect));
        }
        value
    }

    /// Drops every namespace of `contract`.
    pub fn clear_contract(&self, contract: Address) {
        self.entries
            .write()
            .retain(|(owner, _), _| *owner != contract);
    }

    /// Returns true if no value is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::{address, bytes};

    const CONTRACT: Address = address!("0x2000000000000000000000000000000000000001");
    const OTHER: Address = address!("0x2000000000000000000000000000000000000002");
    const ASPECT: Address = address!("0x3000000000000000000000000000000000000001");

    #[test]
    fn namespaces_are_isolated() {
        let scratch = AspectScratch::new();
        scratch.set(CONTRACT, ASPECT, "k", bytes!("01"));
        assert_eq!(scratch.get(CONTRACT, ASPECT, "k"), Some(bytes!("01")));
        assert_eq!(scratch.get(OTHER, ASPECT, "k"), None);
    }

    #[test]
    fn clear_contract_keeps_others() {
        let scratch = AspectScratch::new();
        scratch.set(CONTRACT, ASPECT, "k", bytes!("01"));
        scratch.set(OTHER, ASPECT, "k", bytes!("02"));
        scratch.clear_contract(CONTRACT);
        assert_eq!(scratch.get(CONTRACT, ASPECT, "k"), None);
        assert_eq!(scratch.get(OTHER, ASPECT, "k"), Some(bytes!("02")));

        scratch.remove(OTHER, ASPECT, "k");
        assert!(scratch.is_empty());
    }
}
