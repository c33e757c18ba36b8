//! # aspect-evm-primitives
//!
//! Primitive types, hardfork identifiers and protocol constants shared by every aspect-evm crate.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod constants;
pub mod hardfork;

pub use alloy_primitives::{
    self, address, b256, bytes, hex, keccak256,
    map::{HashMap, HashSet},
    Address, Bytes, FixedBytes, Log, LogData, TxKind, B256, I256, U256,
};
pub use constants::*;

/// Storage key of an account slot.
pub type StorageKey = U256;

/// Storage value of an account slot.
pub type StorageValue = U256;
