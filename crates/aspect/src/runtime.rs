//! Seam to the aspect module interpreter.
use crate::{host::HostApi, join_point::JoinPointKind};
use auto_impl::auto_impl;
use core::fmt;
use primitives::{Address, Bytes, U256};

/// Revert message an aspect uses to report that it ran out of gas.
pub const OUT_OF_GAS_SENTINEL: &str = "out of gas";

/// Entry point of an aspect module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AspectMethod {
    /// A lifecycle hook.
    JoinPoint(JoinPointKind),
    /// Ownership check used by `upgrade` and `changeVersion`.
    IsOwner,
    /// Initializer run once on deployment.
    Init,
}

impl AspectMethod {
    /// Name of the entry point.
    pub const fn name(self) -> &'static str {
        match self {
            Self::JoinPoint(kind) => kind.name(),
            Self::IsOwner => "isOwner",
            Self::Init => "init",
        }
    }

    /// Returns true if the entry point may write aspect state.
    pub const fn is_writable(self) -> bool {
        !matches!(
            self,
            Self::IsOwner | Self::JoinPoint(JoinPointKind::VerifyTx)
        )
    }
}

impl fmt::Display for AspectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A call observed by contract-level hooks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallInfo {
    /// Caller.
    pub from: Address,
    /// Callee.
    pub to: Address,
    /// Call data.
    pub input: Bytes,
    /// Transferred value.
    pub value: U256,
    /// Gas made available to the call.
    pub gas: u64,
    /// Return data, set for post-call hooks.
    pub output: Bytes,
    /// Failure reason, set for post-call hooks of failed calls.
    pub error: Option<String>,
}

/// Input handed to an aspect entry point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HookInput {
    /// Everything is read through the host.
    #[default]
    Empty,
    /// Opaque bytes: validation data, operation arguments or init data.
    Data(Bytes),
    /// Account whose ownership is checked.
    Owner(Address),
    /// Call observed by a contract-level hook.
    Call(CallInfo),
}

/// One invocation of an aspect module.
#[derive(Clone, Debug)]
pub struct AspectRequest<'a> {
    /// Aspect id.
    pub aspect_id: Address,
    /// Version being run.
    pub version: U256,
    /// Module code of that version.
    pub code: &'a Bytes,
    /// Entry point.
    pub method: AspectMethod,
    /// Entry point input.
    pub input: HookInput,
    /// Gas available.
    pub gas: u64,
}

/// Failure of an aspect entry point.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AspectError {
    /// The aspect reverted with a reason.
    #[error("aspect reverted: {0}")]
    Revert(String),
    /// The aspect ran out of gas.
    #[error("out of gas")]
    OutOfGas,
    /// The module could not be run.
    #[error("aspect runtime error: {0}")]
    Runtime(String),
}

impl AspectError {
    /// Maps a revert reason, turning the out-of-gas sentinel into [`AspectError::OutOfGas`].
    pub fn revert(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason == OUT_OF_GAS_SENTINEL {
            Self::OutOfGas
        } else {
            Self::Revert(reason)
        }
    }
}

/// Result of an aspect entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AspectOutput {
    /// Return data or failure.
    pub result: Result<Bytes, AspectError>,
    /// Gas left.
    pub gas_left: u64,
}

impl AspectOutput {
    /// Successful output.
    pub fn success(ret: Bytes, gas_left: u64) -> Self {
        Self {
            result: Ok(ret),
            gas_left,
        }
    }

    /// Failed output.
    pub fn failure(error: AspectError, gas_left: u64) -> Self {
        Self {
            result: Err(error),
            gas_left,
        }
    }
}

/// Interpreter of aspect modules.
#[auto_impl(&mut, Box)]
pub trait AspectRuntime {
    /// Checks that `code` is a loadable module.
    fn validate(&mut self, code: &[u8]) -> Result<(), String> {
        let _ = code;
        Ok(())
    }

    /// Runs an entry point.
    fn run(&mut self, request: AspectRequest<'_>, host: &mut dyn HostApi) -> AspectOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_maps_to_out_of_gas() {
        assert_eq!(AspectError::revert("out of gas"), AspectError::OutOfGas);
        assert_eq!(
            AspectError::revert("nope"),
            AspectError::Revert("nope".into())
        );
    }
}
