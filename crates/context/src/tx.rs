//! Message being applied.
use primitives::{Address, Bytes, StorageKey, TxKind, B256, U256};

/// Legacy transaction type.
pub const LEGACY_TX_TYPE: u8 = 0;
/// EIP-2930 access list transaction type.
pub const ACCESS_LIST_TX_TYPE: u8 = 1;
/// EIP-1559 dynamic fee transaction type.
pub const DYNAMIC_FEE_TX_TYPE: u8 = 2;

/// One entry of an EIP-2930 access list.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessListItem {
    /// Accessed address.
    pub address: Address,
    /// Accessed slots.
    pub storage_keys: Vec<StorageKey>,
}

/// A decoded Ethereum transaction, ready to be applied.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Sender nonce.
    pub nonce: u64,
    /// Transferred value.
    pub value: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Effective gas price.
    pub gas_price: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// EIP-2930 access list.
    pub access_list: Vec<AccessListItem>,
    /// Envelope type.
    pub tx_type: u8,
    /// The sender is authorized by a verifier aspect instead of a signature.
    pub custom_verification: bool,
    /// Data handed to the verifier aspect when `custom_verification` is set.
    pub validation_data: Bytes,
    /// Transaction hash.
    pub hash: B256,
}

impl Message {
    /// Returns the kind of the message.
    #[inline]
    pub fn kind(&self) -> TxKind {
        match self.to {
            Some(to) => TxKind::Call(to),
            None => TxKind::Create,
        }
    }

    /// Returns true for contract creation.
    #[inline]
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Access list as address/slots pairs.
    pub fn access_list_pairs(&self) -> impl Iterator<Item = (Address, Vec<StorageKey>)> + '_ {
        self.access_list
            .iter()
            .map(|item| (item.address, item.storage_keys.clone()))
    }

    /// Number of addresses and slots in the access list.
    pub fn access_list_counts(&self) -> (u64, u64) {
        let accounts = self.access_list.len() as u64;
        let slots = self
            .access_list
            .iter()
            .map(|item| item.storage_keys.len() as u64)
            .sum();
        (accounts, slots)
    }
}
