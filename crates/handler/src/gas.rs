//! Intrinsic gas, refunds and the gas used floor.
use context::{ChainParams, Message, Ratio};
use primitives::{
    hardfork::SpecId, ACCESS_LIST_ADDRESS, ACCESS_LIST_STORAGE_KEY, INITCODE_WORD_COST,
    MAX_REFUND_QUOTIENT, MAX_REFUND_QUOTIENT_EIP3529, TX_DATA_NON_ZERO_GAS_EIP2028,
    TX_DATA_NON_ZERO_GAS_FRONTIER, TX_DATA_ZERO_GAS, TX_GAS, TX_GAS_CONTRACT_CREATION,
};

/// Initial gas that is deducted for transaction to be included.
/// Initial gas contains initial stipend gas, gas for access list and input data.
///
/// Returns `None` on overflow.
pub fn intrinsic_gas(
    spec: SpecId,
    input: &[u8],
    is_create: bool,
    access_list_accounts: u64,
    access_list_storages: u64,
) -> Option<u64> {
    let mut gas = if is_create && spec.is_enabled_in(SpecId::HOMESTEAD) {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let zero_data_len = input.iter().filter(|v| **v == 0).count() as u64;
    let non_zero_data_len = input.len() as u64 - zero_data_len;
    // EIP-2028: Transaction data gas cost reduction
    let non_zero_data_cost = if spec.is_enabled_in(SpecId::ISTANBUL) {
        TX_DATA_NON_ZERO_GAS_EIP2028
    } else {
        TX_DATA_NON_ZERO_GAS_FRONTIER
    };
    gas = gas.checked_add(non_zero_data_len.checked_mul(non_zero_data_cost)?)?;
    gas = gas.checked_add(zero_data_len.checked_mul(TX_DATA_ZERO_GAS)?)?;

    // EIP-3860: Limit and meter initcode
    if is_create && spec.is_enabled_in(SpecId::SHANGHAI) {
        let words = (input.len() as u64).div_ceil(32);
        gas = gas.checked_add(words.checked_mul(INITCODE_WORD_COST)?)?;
    }

    gas = gas.checked_add(access_list_accounts.checked_mul(ACCESS_LIST_ADDRESS)?)?;
    gas = gas.checked_add(access_list_storages.checked_mul(ACCESS_LIST_STORAGE_KEY)?)?;
    Some(gas)
}

/// Intrinsic gas of a message, including the verification surcharge of messages authorized
/// by a verifier aspect.
pub fn message_intrinsic_gas(msg: &Message, spec: SpecId, params: &ChainParams) -> Option<u64> {
    let (accounts, storages) = msg.access_list_counts();
    let gas = intrinsic_gas(spec, &msg.data, msg.is_create(), accounts, storages)?;
    if msg.custom_verification {
        gas.checked_add(params.aspect_verification_gas)
    } else {
        Some(gas)
    }
}

/// Refund granted at the end of a message.
///
/// If spec is set to london, it will decrease the maximum refund amount to 5th part of
/// gas spend. (Before london it was 2th part of gas spend)
pub fn capped_refund(spec: SpecId, gas_used: u64, refund: u64) -> u64 {
    let quotient = if spec.is_enabled_in(SpecId::LONDON) {
        MAX_REFUND_QUOTIENT_EIP3529
    } else {
        MAX_REFUND_QUOTIENT
    };
    refund.min(gas_used / quotient)
}

/// Gas used reported for a message: at least `multiplier * gas_limit`.
///
/// Returns `None` if the multiplier is malformed.
pub fn floor_gas_used(gas_limit: u64, gas_used: u64, multiplier: Ratio) -> Option<u64> {
    if !multiplier.is_valid() {
        return None;
    }
    Some(multiplier.apply_to(gas_limit)?.max(gas_used))
}
