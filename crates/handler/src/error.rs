//! Permanent errors of message application.
use aspect::{DispatchError, StoreError};
use context::StateDbError;
use primitives::{Address, U256};

/// Failure that rejects a message as a whole.
///
/// Reverts and out of gas inside execution are not errors; they are reported through
/// [`ExecutionResponse::vm_error`](crate::ExecutionResponse::vm_error).
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<DBError> {
    /// Governance disabled contract creation.
    #[error("contract creation is disabled")]
    CreateDisabled,
    /// Governance disabled plain calls.
    #[error("contract calls are disabled")]
    CallDisabled,
    /// The gas limit does not cover the intrinsic gas.
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas {
        /// Gas limit of the message.
        have: u64,
        /// Intrinsic gas.
        want: u64,
    },
    /// The sender nonce cannot be incremented.
    #[error("nonce {0} has reached its maximum")]
    NonceOverflow(u64),
    /// Gas accounting overflowed.
    #[error("gas accounting overflow")]
    GasOverflow,
    /// Chain parameters are malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The verifier aspect of the sender rejected the message.
    #[error("transaction verification failed: {0}")]
    Verification(String),
    /// A balance change went below zero.
    #[error("insufficient funds of {address}: have {balance}, want {amount}")]
    InsufficientFunds {
        /// Debited account.
        address: Address,
        /// Its balance.
        balance: U256,
        /// Amount debited.
        amount: U256,
    },
    /// The keeper failed.
    #[error("keeper error: {0}")]
    Database(DBError),
    /// The aspect registry failed.
    #[error("aspect store error: {0}")]
    Store(StoreError),
    /// A registry value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(StoreError),
    /// An aspect binding is broken.
    #[error(transparent)]
    Dispatch(DispatchError),
    /// Gas estimation found no gas limit under the cap that succeeds.
    #[error("gas required exceeds allowance ({0})")]
    GasAllowanceExceeded(u64),
    /// Gas estimation failed for a reason other than gas.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// A traced execution ran past its deadline.
    #[error("execution timeout")]
    DeadlineExceeded,
}

impl<DBError> From<StateDbError<DBError>> for TransactionError<DBError> {
    fn from(err: StateDbError<DBError>) -> Self {
        match err {
            StateDbError::Database(err) => Self::Database(err),
            StateDbError::BalanceUnderflow {
                address,
                balance,
                amount,
            } => Self::InsufficientFunds {
                address,
                balance,
                amount,
            },
        }
    }
}

impl<DBError> From<StoreError> for TransactionError<DBError> {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization { .. } => Self::Serialization(err),
            err => Self::Store(err),
        }
    }
}

impl<DBError> From<DispatchError> for TransactionError<DBError> {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Store(err) => err.into(),
            DispatchError::NoVerifier(_) => Self::Verification(err.to_string()),
            err => Self::Dispatch(err),
        }
    }
}

impl<DBError> TransactionError<DBError> {
    /// Returns true if the error comes from a failing keeper or registry rather than from
    /// the message itself.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Store(_) | Self::Serialization(_) | Self::Dispatch(_)
        )
    }
}
