//! Transaction state machine.
//!
//! [`Evm`] applies messages end to end: governance guards, intrinsic gas, aspect
//! verification, access list priming, dispatch to the aspect native contract or the
//! bytecode engine with the transaction-level aspect hooks around it, refunds, commit and
//! response assembly. It also runs the block-level hooks and the read-only query paths.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
mod call_hooks;
mod caller;
pub mod error;
pub mod evm;
pub mod execution;
pub mod gas;
pub mod post_execution;
pub mod query;
pub mod validation;
pub mod vm;

pub use error::TransactionError;
pub use evm::{EventAttribute, Evm, TxResult};
pub use execution::{apply_message, MessageEnv};
pub use post_execution::ExecutionResponse;
pub use query::TraceResult;
pub use vm::{
    CallHooks, Vm, VmCall, VmCreate, VmEnv, VmOutcome, EXECUTION_REVERTED, OUT_OF_GAS,
};
