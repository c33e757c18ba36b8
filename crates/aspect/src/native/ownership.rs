//! Ownership checks against bound contracts.
use super::{gas::GasMeter, NativeError};
use crate::abi::IOwnable;
use alloy_sol_types::{SolCall, SolValue};
use auto_impl::auto_impl;
use primitives::{Address, Bytes};
use tracing::trace;

/// Result of a read-only call made by the native contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallResult {
    /// The call did not revert or fail.
    pub success: bool,
    /// Return data.
    pub output: Bytes,
    /// Gas left.
    pub gas_left: u64,
}

/// Access the native contract has to ordinary contracts.
#[auto_impl(&mut, Box)]
pub trait ContractCaller {
    /// Returns true if code is deployed at `address`.
    fn is_contract(&mut self, address: Address) -> Result<bool, String>;

    /// Makes a read-only call.
    fn static_call(&mut self, from: Address, to: Address, input: Bytes, gas: u64) -> CallResult;
}

/// Checks that `sender` owns `contract`.
///
/// Asks `isOwner(sender)` first and falls back to comparing `owner()` when the contract does
/// not answer the first call. Gas of both calls is charged to `meter`.
pub(crate) fn is_contract_owner<C: ContractCaller + ?Sized>(
    caller: &mut C,
    meter: &mut GasMeter,
    contract: Address,
    sender: Address,
) -> Result<bool, NativeError> {
    let input = IOwnable::isOwnerCall { sender }.abi_encode();
    let result = caller.static_call(sender, contract, input.into(), meter.remaining());
    meter.settle(result.gas_left);
    if result.success {
        if let Ok(owner) = bool::abi_decode(&result.output) {
            trace!(target: "aspect::native", %contract, %sender, owner, "isOwner answered");
            return Ok(owner);
        }
    }
    if meter.remaining() == 0 {
        return Err(NativeError::OutOfGas);
    }

    let input = IOwnable::ownerCall {}.abi_encode();
    let result = caller.static_call(sender, contract, input.into(), meter.remaining());
    meter.settle(result.gas_left);
    if !result.success {
        return Ok(false);
    }
    let owner = Address::abi_decode(&result.output).ok();
    trace!(target: "aspect::native", %contract, %sender, ?owner, "owner answered");
    Ok(owner == Some(sender))
}
