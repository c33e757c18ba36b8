//! Aspects: versioned modules bound to contracts and accounts that run at lifecycle hooks.
//!
//! [`AspectStore`] persists code, versions, properties and bindings. [`Dispatcher`] runs the
//! hooks of bound aspects through an [`AspectRuntime`]. [`native`] serves the system contract
//! aspects are deployed and bound through.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod abi;
pub mod dispatcher;
pub mod host;
pub mod join_point;
pub mod keys;
pub mod meta;
pub mod native;
pub mod runtime;
pub mod store;

pub use dispatcher::{DispatchError, Dispatcher, HookOutcome};
pub use host::{AspectHost, HostApi, HostError};
pub use join_point::{InvalidJoinPoint, JoinPoint, JoinPointKind};
pub use meta::AspectMeta;
pub use native::{CallResult, ContractCaller, NativeCall, NativeError, NativeOutcome};
pub use runtime::{
    AspectError, AspectMethod, AspectOutput, AspectRequest, AspectRuntime, CallInfo, HookInput,
    OUT_OF_GAS_SENTINEL,
};
pub use store::{AspectStore, BindingKind, StoreError};
