//! Journaled state database and execution context.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod block;
pub mod cfg;
pub mod context;
pub mod journal;
pub mod query;
pub mod receipt;
pub mod scratch;
pub mod statedb;
pub mod tracer;
pub mod tx;

pub use block::BlockContext;
pub use cfg::{ChainParams, ChainParamsProvider, EvmConfig, Ratio, StaticChainParams};
pub use context::{ExecutionContext, TxContext, TxScope};
pub use journal::{Journal, JournalEntry, JournaledState};
pub use query::{ContextKey, ContextValue, UnknownContextKey};
pub use receipt::Receipt;
pub use scratch::AspectScratch;
pub use statedb::{StateDb, StateDbError, TxConfig};
pub use tracer::{CallTracer, DeadlineTracer, NoopTracer, SharedTracer, Tracer};
pub use tx::{AccessListItem, Message};
