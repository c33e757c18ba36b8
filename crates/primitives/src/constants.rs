//! Protocol constants.
use alloy_primitives::{address, b256, Address, B256};

/// Address of the aspect native contract. Calls to it are intercepted before bytecode dispatch.
pub const ASPECT_NATIVE_CONTRACT_ADDRESS: Address =
    address!("0x0000000000000000000000000000000000A27E14");

/// keccak256 of the empty byte string.
pub const KECCAK_EMPTY: B256 =
    b256!("0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Base cost of a message call transaction.
pub const TX_GAS: u64 = 21_000;

/// Base cost of a contract creation transaction since Homestead.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Calldata cost of a zero byte.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Calldata cost of a non zero byte before Istanbul.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;

/// Calldata cost of a non zero byte adjusted by
/// [EIP-2028](https://eips.ethereum.org/EIPS/eip-2028).
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// Cost of an address in the access list ([EIP-2930](https://eips.ethereum.org/EIPS/eip-2930)).
pub const ACCESS_LIST_ADDRESS: u64 = 2_400;

/// Cost of a storage key in the access list ([EIP-2930](https://eips.ethereum.org/EIPS/eip-2930)).
pub const ACCESS_LIST_STORAGE_KEY: u64 = 1_900;

/// EIP-3860: per word cost of initcode.
pub const INITCODE_WORD_COST: u64 = 2;

/// EIP-170: contract code size limit.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// EIP-3860: initcode size limit.
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Maximum refund quotient before London: refund is capped at `gas_used / 2`.
pub const MAX_REFUND_QUOTIENT: u64 = 2;

/// [EIP-3529](https://eips.ethereum.org/EIPS/eip-3529) refund quotient: refund is capped at
/// `gas_used / 5`.
pub const MAX_REFUND_QUOTIENT_EIP3529: u64 = 5;

/// Extra intrinsic gas charged to messages that are authorized by an aspect instead of a signature.
pub const DEFAULT_ASPECT_VERIFICATION_GAS: u64 = 100_000;

/// Returns the address of the precompile with the given index.
#[inline]
pub const fn precompile_address(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = index;
    Address::new(bytes)
}
