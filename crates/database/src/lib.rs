//! Keeper and key/value store implementations.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod faulty;
pub mod in_memory_db;
pub mod kv;

pub use database_interface::*;
pub use faulty::{FaultyKeeper, FaultyKvStore, FaultyStoreError};
pub use in_memory_db::{CacheKeeper, CachedAccount, InMemoryKeeper};
pub use kv::{CacheKvStore, MemoryKvStore};
