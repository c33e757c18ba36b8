//! Account and storage state.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod account_info;
mod changeset;
mod object;
mod storage;

pub use account_info::{code_hash, AccountInfo};
pub use changeset::{AccountChange, StateChangeset};
pub use object::StateObject;
pub use primitives;
pub use storage::Storage;
