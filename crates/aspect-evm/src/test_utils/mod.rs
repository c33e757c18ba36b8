//! Test utilities: a scripted bytecode engine, a recording aspect runtime and fixtures.

mod evm;
mod native;
mod runtime;
mod vm;

pub use evm::*;
pub use native::*;
pub use runtime::*;
pub use vm::*;
