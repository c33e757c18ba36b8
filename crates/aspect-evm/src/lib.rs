//! EVM state transition core with programmable aspects.
//!
//! Re-exports the crates of the workspace under one roof:
//!
//! - [`primitives`]: alloy types, hardforks and protocol constants.
//! - [`state`]: account records and state objects.
//! - [`database_interface`] and [`database`]: keeper and key/value store interfaces and
//!   in-memory implementations.
//! - [`context`]: the journaled state database and the execution context.
//! - [`aspect`]: the aspect registry, dispatcher and native contract.
//! - [`handler`]: the transaction state machine.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub use aspect;
pub use context;
pub use database;
pub use database_interface;
pub use handler;
pub use primitives;
pub use state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aspect::{
    AspectMeta, AspectRuntime, AspectStore, Dispatcher, HostApi, JoinPoint, JoinPointKind,
};
pub use context::{BlockContext, ChainParams, EvmConfig, ExecutionContext, Message, StateDb};
pub use database::{CacheKeeper, InMemoryKeeper, MemoryKvStore};
pub use database_interface::{Keeper, KvStore};
pub use handler::{Evm, ExecutionResponse, TransactionError, TxResult, Vm};
