//! Checks that reject a message before any state is touched.
use crate::{error::TransactionError, gas::message_intrinsic_gas};
use context::{ChainParams, Message};
use primitives::hardfork::SpecId;

/// Rejects messages needing a capability governance disabled, and malformed parameters.
pub fn validate_message<DBError>(
    msg: &Message,
    params: &ChainParams,
) -> Result<(), TransactionError<DBError>> {
    if !params.min_gas_multiplier.is_valid() {
        return Err(TransactionError::InvalidConfig(format!(
            "min gas multiplier {}/{} is not within [0, 1]",
            params.min_gas_multiplier.numerator, params.min_gas_multiplier.denominator
        )));
    }
    if msg.is_create() && !params.enable_create {
        return Err(TransactionError::CreateDisabled);
    }
    if !msg.is_create() && !params.enable_call {
        return Err(TransactionError::CallDisabled);
    }
    Ok(())
}

/// Returns the intrinsic gas of the message, failing if its gas limit does not cover it.
pub fn validate_initial_tx_gas<DBError>(
    msg: &Message,
    spec: SpecId,
    params: &ChainParams,
) -> Result<u64, TransactionError<DBError>> {
    let intrinsic =
        message_intrinsic_gas(msg, spec, params).ok_or(TransactionError::GasOverflow)?;
    if msg.gas_limit < intrinsic {
        return Err(TransactionError::IntrinsicGas {
            have: msg.gas_limit,
            want: intrinsic,
        });
    }
    Ok(intrinsic)
}
