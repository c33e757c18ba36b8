//! The aspect native contract.
//!
//! Calls to [`primitives::ASPECT_NATIVE_CONTRACT_ADDRESS`] never reach the bytecode engine.
//! They are decoded by selector and served here, against a private write buffer over the
//! registry that is flushed only when the call succeeds and the message is committed.
pub mod gas;
mod methods;
pub mod ownership;
#[cfg(test)]
mod tests;

pub use gas::GasMeter;
pub use ownership::{CallResult, ContractCaller};

use crate::{
    dispatcher::DispatchError,
    join_point::InvalidJoinPoint,
    runtime::{AspectError, AspectRuntime},
    store::{AspectStore, StoreError},
};
use alloy_sol_types::{Revert, SolError};
use context::ExecutionContext;
use database::CacheKvStore;
use database_interface::KvStore;
use methods::Methods;
use primitives::{Address, Bytes, U256};
use tracing::debug;

/// Failure of a native contract call.
///
/// Returned with the gas left at the point of failure, never with a full refund.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    /// Input is not a known method or is badly encoded.
    #[error("invalid input: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    /// Value was sent to the native contract.
    #[error("native contract does not accept value")]
    ValueTransfer,
    /// Gas ran out.
    #[error("out of gas")]
    OutOfGas,
    /// A user property list contains a reserved key.
    #[error("property key {0} is reserved")]
    ReservedProperty(String),
    /// The declared deployer is not the sender.
    #[error("account {account} does not match sender {sender}")]
    AccountMismatch {
        /// Declared account.
        account: Address,
        /// Transaction sender.
        sender: Address,
    },
    /// An aspect with the derived id exists.
    #[error("aspect {0} is already deployed")]
    AlreadyDeployed(Address),
    /// The aspect was never deployed.
    #[error("aspect {0} is not deployed")]
    NotDeployed(Address),
    /// The requested version does not exist.
    #[error("aspect {id} has no version {version}")]
    VersionNotFound {
        /// Aspect id.
        id: Address,
        /// Requested version.
        version: U256,
    },
    /// The join point mask is invalid.
    #[error(transparent)]
    InvalidJoinPoint(#[from] InvalidJoinPoint),
    /// The module interpreter rejected the code.
    #[error("invalid aspect code: {0}")]
    InvalidCode(String),
    /// The sender does not own the target contract or account.
    #[error("{sender} is not the owner of {target}")]
    NotTargetOwner {
        /// Contract or account.
        target: Address,
        /// Transaction sender.
        sender: Address,
    },
    /// The aspect did not confirm the sender as its owner.
    #[error("{sender} is not the owner of aspect {id}")]
    NotAspectOwner {
        /// Aspect id.
        id: Address,
        /// Transaction sender.
        sender: Address,
    },
    /// Binding to a contract needs a transaction-level join point.
    #[error("aspect {0} declares no transaction-level join point")]
    MissingTxJoinPoint(Address),
    /// Binding to an account needs the verifier join point.
    #[error("aspect {0} does not declare verifyTx")]
    MissingVerifyJoinPoint(Address),
    /// Entrypoint needs the operation join point.
    #[error("aspect {0} does not declare operation")]
    MissingOperation(Address),
    /// Accounts carry a single verifier.
    #[error("account {0} already has a verifier")]
    VerifierAlreadyBound(Address),
    /// The aspect is not bound to the target.
    #[error("aspect {id} is not bound to {target}")]
    NotBound {
        /// Aspect id.
        id: Address,
        /// Contract or account.
        target: Address,
    },
    /// An aspect entry point failed.
    #[error("aspect {id} failed: {error}")]
    Hook {
        /// Aspect id.
        id: Address,
        /// Failure.
        error: AspectError,
    },
    /// The contract caller failed.
    #[error("contract call failed: {0}")]
    Caller(String),
    /// Registry access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Aspect dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A call to the native contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeCall {
    /// Transaction sender.
    pub sender: Address,
    /// ABI encoded method call.
    pub input: Bytes,
    /// Transferred value.
    pub value: U256,
    /// Gas available.
    pub gas: u64,
    /// Registry writes are kept on success.
    pub commit: bool,
}

/// Outcome of a native contract call.
#[derive(Debug)]
pub struct NativeOutcome {
    /// ABI encoded return data, or `Error(string)` revert data on failure.
    pub ret: Bytes,
    /// Gas left.
    pub gas_left: u64,
    /// Failure, if any.
    pub error: Option<NativeError>,
}

impl NativeOutcome {
    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Serves a native contract call.
///
/// Method failures come back inside the outcome. Only a failure to flush the write buffer
/// into `store` is returned as an error.
pub fn execute<S, R, C>(
    store: &mut S,
    runtime: &mut R,
    caller: &mut C,
    ctx: &mut ExecutionContext,
    call: NativeCall,
) -> Result<NativeOutcome, StoreError>
where
    S: KvStore,
    R: AspectRuntime,
    C: ContractCaller + ?Sized,
{
    let mut scoped = AspectStore::new(CacheKvStore::new(&mut *store));
    let mut meter = GasMeter::new(call.gas);
    let result = if call.value.is_zero() {
        Methods {
            store: &mut scoped,
            runtime,
            caller,
            ctx,
            meter: &mut meter,
            sender: call.sender,
        }
        .dispatch(&call.input)
    } else {
        Err(NativeError::ValueTransfer)
    };

    match result {
        Ok(ret) => {
            if call.commit {
                scoped
                    .into_inner()
                    .flush()
                    .map_err(|e| StoreError::Kv(Box::new(e)))?;
            }
            debug!(
                target: "aspect::native",
                sender = %call.sender,
                gas_used = meter.spent(),
                "native call succeeded"
            );
            Ok(NativeOutcome {
                ret,
                gas_left: meter.remaining(),
                error: None,
            })
        }
        Err(error) => {
            debug!(
                target: "aspect::native",
                sender = %call.sender,
                gas_used = meter.spent(),
                %error,
                "native call failed"
            );
            let ret = Revert {
                reason: error.to_string(),
            }
            .abi_encode();
            Ok(NativeOutcome {
                ret: ret.into(),
                gas_left: meter.remaining(),
                error: Some(error),
            })
        }
    }
}
