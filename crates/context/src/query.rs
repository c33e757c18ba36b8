//! Typed context keys that aspects can query.
use core::{fmt, str::FromStr};
use primitives::{Address, Bytes, B256, U256};

/// A value of the execution context an aspect can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKey {
    /// Envelope type.
    TxType,
    /// Chain ID the transaction is for.
    TxChainId,
    /// Sender nonce.
    TxNonce,
    /// Gas limit.
    TxGas,
    /// Gas price.
    TxGasPrice,
    /// Sender.
    TxFrom,
    /// Recipient, empty for creations.
    TxTo,
    /// Transferred value.
    TxValue,
    /// Call data.
    TxData,
    /// Transaction hash.
    TxHash,
    /// Index of the transaction in the block.
    TxIndex,
    /// Number of access list entries.
    TxAccessListCount,
    /// Block number.
    BlockNumber,
    /// Block timestamp.
    BlockTimestamp,
    /// Block proposer.
    BlockCoinbase,
    /// Block hash.
    BlockHash,
    /// Parent block hash.
    BlockParentHash,
    /// Block gas limit.
    BlockGasLimit,
    /// Block base fee.
    BlockBaseFee,
    /// Active hardfork name.
    EnvSpec,
    /// Chain ID of the chain.
    EnvChainId,
    /// Receipt status, available after execution.
    ReceiptStatus,
    /// Gas used by the transaction, available after execution.
    ReceiptGasUsed,
    /// Cumulative gas used, available after execution.
    ReceiptCumulativeGasUsed,
    /// Number of emitted logs, available after execution.
    ReceiptLogCount,
}

impl ContextKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 25] = [
        Self::TxType,
        Self::TxChainId,
        Self::TxNonce,
        Self::TxGas,
        Self::TxGasPrice,
        Self::TxFrom,
        Self::TxTo,
        Self::TxValue,
        Self::TxData,
        Self::TxHash,
        Self::TxIndex,
        Self::TxAccessListCount,
        Self::BlockNumber,
        Self::BlockTimestamp,
        Self::BlockCoinbase,
        Self::BlockHash,
        Self::BlockParentHash,
        Self::BlockGasLimit,
        Self::BlockBaseFee,
        Self::EnvSpec,
        Self::EnvChainId,
        Self::ReceiptStatus,
        Self::ReceiptGasUsed,
        Self::ReceiptCumulativeGasUsed,
        Self::ReceiptLogCount,
    ];

    /// Name the aspect runtime uses for this key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TxType => "tx.type",
            Self::TxChainId => "tx.chainId",
            Self::TxNonce => "tx.nonce",
            Self::TxGas => "tx.gas",
            Self::TxGasPrice => "tx.gasPrice",
            Self::TxFrom => "tx.from",
            Self::TxTo => "tx.to",
            Self::TxValue => "tx.value",
            Self::TxData => "tx.data",
            Self::TxHash => "tx.hash",
            Self::TxIndex => "tx.index",
            Self::TxAccessListCount => "tx.accessList.count",
            Self::BlockNumber => "block.header.number",
            Self::BlockTimestamp => "block.header.timestamp",
            Self::BlockCoinbase => "block.header.coinbase",
            Self::BlockHash => "block.header.hash",
            Self::BlockParentHash => "block.header.parentHash",
            Self::BlockGasLimit => "block.header.gasLimit",
            Self::BlockBaseFee => "block.header.baseFee",
            Self::EnvSpec => "env.spec",
            Self::EnvChainId => "env.chainId",
            Self::ReceiptStatus => "receipt.status",
            Self::ReceiptGasUsed => "receipt.gasUsed",
            Self::ReceiptCumulativeGasUsed => "receipt.cumulativeGasUsed",
            Self::ReceiptLogCount => "receipt.logs.count",
        }
    }

    /// Returns true for keys that only resolve once the receipt exists.
    pub const fn needs_receipt(self) -> bool {
        matches!(
            self,
            Self::ReceiptStatus
                | Self::ReceiptGasUsed
                | Self::ReceiptCumulativeGasUsed
                | Self::ReceiptLogCount
        )
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a context key name is not known.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown context key: {0}")]
pub struct UnknownContextKey(pub String);

impl FromStr for ContextKey {
    type Err = UnknownContextKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| UnknownContextKey(s.to_owned()))
    }
}

/// A resolved context value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextValue {
    /// Boolean.
    Bool(bool),
    /// Unsigned integer.
    U64(u64),
    /// 256-bit integer.
    U256(U256),
    /// Address.
    Address(Address),
    /// Hash.
    B256(B256),
    /// Raw bytes.
    Bytes(Bytes),
    /// Text.
    Str(&'static str),
}

impl ContextValue {
    /// Big-endian byte encoding handed to the aspect runtime.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Bool(value) => Bytes::from(vec![*value as u8]),
            Self::U64(value) => Bytes::copy_from_slice(&value.to_be_bytes()),
            Self::U256(value) => Bytes::copy_from_slice(&value.to_be_bytes::<32>()),
            Self::Address(value) => Bytes::copy_from_slice(value.as_slice()),
            Self::B256(value) => Bytes::copy_from_slice(value.as_slice()),
            Self::Bytes(value) => value.clone(),
            Self::Str(value) => Bytes::from_static(value.as_bytes()),
        }
    }
}
