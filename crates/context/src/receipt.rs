//! Transaction receipt.
use primitives::{Address, Log, B256};

/// Outcome of an applied transaction as seen by aspects and the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Envelope type of the transaction.
    pub tx_type: u8,
    /// True if execution did not revert or fail.
    pub status: bool,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction.
    pub gas_used: u64,
    /// Emitted logs.
    pub logs: Vec<Log>,
    /// Transaction hash.
    pub tx_hash: B256,
    /// Address of the created contract, for creations.
    pub contract_address: Option<Address>,
    /// Block hash.
    pub block_hash: B256,
    /// Block number.
    pub block_number: u64,
    /// Index of the transaction in the block.
    pub transaction_index: u64,
}
