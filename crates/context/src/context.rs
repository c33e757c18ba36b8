//! Block and transaction scoped execution context.
use crate::{
    block::BlockContext,
    cfg::EvmConfig,
    query::{ContextKey, ContextValue},
    receipt::Receipt,
    scratch::AspectScratch,
    tracer::SharedTracer,
    tx::Message,
};
use core::ops::{Deref, DerefMut};
use primitives::Bytes;
use std::{collections::BTreeMap, sync::Arc};
use tracing::trace;

/// Everything known about the transaction being applied.
#[derive(Debug)]
pub struct TxContext {
    /// Decoded message.
    pub message: Message,
    /// EVM configuration of the block.
    pub config: EvmConfig,
    /// Index of the transaction in the block.
    pub tx_index: u64,
    /// Changes are committed at the end of the message.
    pub commit: bool,
    /// Receipt, set once execution finished.
    pub receipt: Option<Receipt>,
    /// Active tracer.
    pub tracer: Option<SharedTracer>,
    /// Free-form values hooks of this transaction pass to each other.
    pub properties: BTreeMap<String, Bytes>,
    scratch: Arc<AspectScratch>,
}

impl TxContext {
    /// Aspect scratch space of this transaction.
    pub fn scratch(&self) -> &Arc<AspectScratch> {
        &self.scratch
    }
}

/// Context threaded through the transaction state machine and the aspect dispatcher.
///
/// The block scope lives from [`ExecutionContext::begin_block`] to
/// [`ExecutionContext::end_block`]. The transaction scope lives as long as the [`TxScope`]
/// returned by [`ExecutionContext::begin_tx`].
#[derive(Debug, Default)]
pub struct ExecutionContext {
    block: Option<BlockContext>,
    tx: Option<TxContext>,
}

impl ExecutionContext {
    /// Creates a context with no active block or transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a block.
    pub fn begin_block(&mut self, block: BlockContext) {
        trace!(target: "handler", height = block.height, "begin block context");
        self.block = Some(block);
    }

    /// Ends the block, clearing the block scope.
    pub fn end_block(&mut self) {
        self.block = None;
    }

    /// Current block, if one is active.
    pub fn block(&self) -> Option<&BlockContext> {
        self.block.as_ref()
    }

    /// Starts a transaction scope.
    ///
    /// Every transient field (receipt, tracer, properties, scratch space) starts out empty,
    /// even when a previous scope was leaked by the caller.
    pub fn begin_tx(
        &mut self,
        message: Message,
        config: EvmConfig,
        tx_index: u64,
        commit: bool,
        tracer: Option<SharedTracer>,
    ) -> TxScope<'_> {
        trace!(target: "handler", tx_hash = %message.hash, tx_index, commit, "begin tx context");
        self.tx = Some(TxContext {
            message,
            config,
            tx_index,
            commit,
            receipt: None,
            tracer,
            properties: BTreeMap::new(),
            scratch: Arc::new(AspectScratch::new()),
        });
        TxScope { ctx: self }
    }

    fn end_tx(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Some(to) = tx.message.to {
                tx.scratch.clear_contract(to);
            }
            trace!(target: "handler", tx_hash = %tx.message.hash, "end tx context");
        }
    }

    /// Returns true while a transaction scope is active.
    pub fn has_tx(&self) -> bool {
        self.tx.is_some()
    }

    /// Current transaction, if one is active.
    pub fn try_tx(&self) -> Option<&TxContext> {
        self.tx.as_ref()
    }

    /// Current transaction.
    ///
    /// # Panics
    ///
    /// Panics outside of a transaction scope.
    pub fn tx(&self) -> &TxContext {
        self.tx
            .as_ref()
            .expect("execution context has no active transaction")
    }

    /// Current transaction, mutably.
    ///
    /// # Panics
    ///
    /// Panics outside of a transaction scope.
    pub fn tx_mut(&mut self) -> &mut TxContext {
        self.tx
            .as_mut()
            .expect("execution context has no active transaction")
    }

    /// Resolves a context key. `None` if the value is not available yet.
    pub fn query(&self, key: ContextKey) -> Option<ContextValue> {
        use ContextValue as V;
        if let Some(tx) = &self.tx {
            let msg = &tx.message;
            let value = match key {
                ContextKey::TxType => Some(V::U64(msg.tx_type as u64)),
                ContextKey::TxChainId | ContextKey::EnvChainId => {
                    Some(V::U64(tx.config.chain_id))
                }
                ContextKey::TxNonce => Some(V::U64(msg.nonce)),
                ContextKey::TxGas => Some(V::U64(msg.gas_limit)),
                ContextKey::TxGasPrice => Some(V::U256(msg.gas_price)),
                ContextKey::TxFrom => Some(V::Address(msg.from)),
                ContextKey::TxTo => Some(
                    msg.to
                        .map(V::Address)
                        .unwrap_or(V::Bytes(Bytes::new())),
                ),
                ContextKey::TxValue => Some(V::U256(msg.value)),
                ContextKey::TxData => Some(V::Bytes(msg.data.clone())),
                ContextKey::TxHash => Some(V::B256(msg.hash)),
                ContextKey::TxIndex => Some(V::U64(tx.tx_index)),
                ContextKey::TxAccessListCount => Some(V::U64(msg.access_list.len() as u64)),
                ContextKey::EnvSpec => Some(V::Str(tx.config.spec.into())),
                ContextKey::ReceiptStatus => tx.receipt.as_ref().map(|r| V::Bool(r.status)),
                ContextKey::ReceiptGasUsed => tx.receipt.as_ref().map(|r| V::U64(r.gas_used)),
                ContextKey::ReceiptCumulativeGasUsed => tx
                    .receipt
                    .as_ref()
                    .map(|r| V::U64(r.cumulative_gas_used)),
                ContextKey::ReceiptLogCount => {
                    tx.receipt.as_ref().map(|r| V::U64(r.logs.len() as u64))
                }
                _ => None,
            };
            if value.is_some() {
                return value;
            }
        }
        let block = self.block.as_ref()?;
        match key {
            ContextKey::BlockNumber => Some(V::U64(block.height)),
            ContextKey::BlockTimestamp => Some(V::U64(block.time)),
            ContextKey::BlockCoinbase => Some(V::Address(block.proposer)),
            ContextKey::BlockHash => Some(V::B256(block.hash)),
            ContextKey::BlockParentHash => Some(V::B256(block.parent_hash)),
            ContextKey::BlockGasLimit => Some(V::U64(block.gas_limit)),
            ContextKey::BlockBaseFee => Some(V::U256(block.base_fee)),
            _ => None,
        }
    }
}

/// Guard of an active transaction scope.
///
/// Dropping the guard ends the scope on every exit path, including early returns and
/// unwinding.
#[derive(Debug)]
pub struct TxScope<'a> {
    ctx: &'a mut ExecutionContext,
}

impl Deref for TxScope<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for TxScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for TxScope<'_> {
    fn drop(&mut self) {
        self.ctx.end_tx();
    }
}
