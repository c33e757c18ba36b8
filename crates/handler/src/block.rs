//! Block-level aspect hooks.
use crate::{error::TransactionError, evm::Evm, vm::Vm};
use aspect::{AspectRuntime, AspectStore, Dispatcher, HookOutcome, JoinPointKind, StoreError};
use context::{BlockContext, ChainParamsProvider};
use database::CacheKvStore;
use database_interface::{Keeper, KvStore};
use primitives::Address;
use tracing::debug;

impl<K, S, V, R, P> Evm<K, S, V, R, P>
where
    K: Keeper,
    S: KvStore,
    V: Vm,
    R: AspectRuntime,
    P: ChainParamsProvider,
{
    /// Starts a block and runs `onBlockInitialize` of every block-level aspect.
    pub fn begin_block(
        &mut self,
        block: BlockContext,
    ) -> Result<Vec<(Address, HookOutcome)>, TransactionError<K::Error>> {
        self.ctx.begin_block(block);
        self.block_gas_used = 0;
        self.tx_index = 0;
        self.log_index = 0;
        self.run_block_hooks(JoinPointKind::OnBlockInitialize)
    }

    /// Runs `onBlockFinalize` of every block-level aspect and ends the block.
    pub fn end_block(&mut self) -> Result<Vec<(Address, HookOutcome)>, TransactionError<K::Error>> {
        let outcomes = self.run_block_hooks(JoinPointKind::OnBlockFinalize);
        self.ctx.end_block();
        outcomes
    }

    fn run_block_hooks(
        &mut self,
        kind: JoinPointKind,
    ) -> Result<Vec<(Address, HookOutcome)>, TransactionError<K::Error>> {
        let gas = self.params.block_gas_limit();
        let mut store = AspectStore::new(CacheKvStore::new(&mut self.store));
        let mut dispatcher = Dispatcher::new(&mut store, &mut self.runtime);
        let outcomes = match kind {
            JoinPointKind::OnBlockInitialize => dispatcher.on_block_initialize(&mut self.ctx, gas)?,
            _ => dispatcher.on_block_finalize(&mut self.ctx, gas)?,
        };
        for (id, outcome) in &outcomes {
            if let Some(error) = &outcome.error {
                debug!(target: "handler", aspect_id = %id, %kind, %error, "block hook failed");
            }
        }
        store
            .inner_mut()
            .flush()
            .map_err(|err| StoreError::Kv(Box::new(err)))?;
        Ok(outcomes)
    }
}
