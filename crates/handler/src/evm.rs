//! The execution engine of a chain: keeper, aspect registry, bytecode engine and aspect
//! runtime behind one handle.
use crate::{
    error::TransactionError,
    execution::{apply_message, MessageEnv},
    post_execution::ExecutionResponse,
    vm::Vm,
};
use aspect::AspectRuntime;
use context::{
    ChainParamsProvider, EvmConfig, ExecutionContext, Message, Receipt, SharedTracer,
};
use database_interface::{Keeper, KvStore};
use tracing::debug;

/// Event attribute carrying the hash of an applied transaction.
pub const ATTRIBUTE_KEY_ETHEREUM_TX_HASH: &str = "ethereumTxHash";
/// Event attribute carrying the gas used by an applied transaction.
pub const ATTRIBUTE_KEY_TX_GAS_USED: &str = "txGasUsed";
/// Event attribute carrying the envelope type of an applied transaction.
pub const ATTRIBUTE_KEY_TX_TYPE: &str = "txType";
/// Event attribute carrying the failure reason of a failed transaction.
pub const ATTRIBUTE_KEY_ETHEREUM_TX_FAILED: &str = "ethereumTxFailed";

/// A key/value pair emitted for the event indexer of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: &'static str,
    /// Attribute value.
    pub value: String,
}

impl EventAttribute {
    fn new(key: &'static str, value: impl ToString) -> Self {
        Self {
            key,
            value: value.to_string(),
        }
    }
}

/// Result of [`Evm::apply_transaction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResult {
    /// Response of the message.
    pub response: ExecutionResponse,
    /// Receipt of the transaction.
    pub receipt: Receipt,
    /// Event attributes of the transaction.
    pub attributes: Vec<EventAttribute>,
}

/// Execution engine.
///
/// Transactions of a block are applied one after the other between
/// [`Evm::begin_block`] and [`Evm::end_block`].
#[derive(Debug)]
pub struct Evm<K, S, V, R, P> {
    /// Account, code and storage backing.
    pub keeper: K,
    /// Aspect registry backing.
    pub store: S,
    /// Bytecode engine.
    pub vm: V,
    /// Aspect module interpreter.
    pub runtime: R,
    /// Chain parameters.
    pub params: P,
    /// Execution context threaded through every message.
    pub ctx: ExecutionContext,
    pub(crate) block_gas_used: u64,
    pub(crate) tx_index: u64,
    pub(crate) log_index: u64,
}

type Result<T, E> = core::result::Result<T, TransactionError<E>>;

impl<K, S, V, R, P> Evm<K, S, V, R, P>
where
    K: Keeper,
    S: KvStore,
    V: Vm,
    R: AspectRuntime,
    P: ChainParamsProvider,
{
    /// Creates an engine with no active block.
    pub fn new(keeper: K, store: S, vm: V, runtime: R, params: P) -> Self {
        Self {
            keeper,
            store,
            vm,
            runtime,
            params,
            ctx: ExecutionContext::new(),
            block_gas_used: 0,
            tx_index: 0,
            log_index: 0,
        }
    }

    /// Gas used by the transactions applied in the current block.
    pub fn block_gas_used(&self) -> u64 {
        self.block_gas_used
    }

    /// EVM configuration of the current block.
    pub fn config(&self) -> EvmConfig {
        let (height, coinbase) = self
            .ctx
            .block()
            .map(|block| (block.height, block.proposer))
            .unwrap_or_default();
        EvmConfig::from_provider(&self.params, height, coinbase)
    }

    pub(crate) fn message_env(
        &self,
        config: EvmConfig,
        tracer: Option<SharedTracer>,
        commit: bool,
    ) -> MessageEnv {
        MessageEnv {
            config,
            params: self.params.params(),
            tracer,
            commit,
            refund: false,
            tx_index: self.tx_index,
            log_index: self.log_index,
            cumulative_gas_used: self.block_gas_used,
        }
    }

    /// Applies a message under the configuration of the current block.
    pub fn apply_message(
        &mut self,
        msg: Message,
        tracer: Option<SharedTracer>,
        commit: bool,
    ) -> Result<ExecutionResponse, K::Error> {
        let config = self.config();
        self.apply_message_with_config(msg, tracer, commit, config)
    }

    /// Applies a message under an explicit configuration.
    pub fn apply_message_with_config(
        &mut self,
        msg: Message,
        tracer: Option<SharedTracer>,
        commit: bool,
        config: EvmConfig,
    ) -> Result<ExecutionResponse, K::Error> {
        let env = self.message_env(config, tracer, commit);
        apply_message(
            &mut self.keeper,
            &mut self.store,
            &mut self.vm,
            &mut self.runtime,
            &mut self.ctx,
            msg,
            env,
        )
    }

    /// Applies a transaction of the current block and commits it.
    ///
    /// Unused gas is refunded to the sender at the message gas price, in the same commit as
    /// the message. Fees were charged before the transaction reached the engine.
    pub fn apply_transaction(&mut self, msg: Message) -> Result<TxResult, K::Error> {
        let env = MessageEnv {
            refund: true,
            ..self.message_env(self.config(), None, true)
        };
        let response = apply_message(
            &mut self.keeper,
            &mut self.store,
            &mut self.vm,
            &mut self.runtime,
            &mut self.ctx,
            msg.clone(),
            env,
        )?;

        self.block_gas_used = self
            .block_gas_used
            .checked_add(response.gas_used)
            .ok_or(TransactionError::GasOverflow)?;
        let (block_hash, block_number) = self
            .ctx
            .block()
            .map(|block| (block.hash, block.height))
            .unwrap_or_default();
        let receipt = Receipt {
            tx_type: msg.tx_type,
            status: !response.failed(),
            cumulative_gas_used: self.block_gas_used,
            gas_used: response.gas_used,
            logs: response.logs.clone(),
            tx_hash: msg.hash,
            contract_address: response.contract_address,
            block_hash,
            block_number,
            transaction_index: self.tx_index,
        };
        self.tx_index += 1;
        self.log_index += response.logs.len() as u64;

        let mut attributes = vec![
            EventAttribute::new(ATTRIBUTE_KEY_ETHEREUM_TX_HASH, msg.hash),
            EventAttribute::new(ATTRIBUTE_KEY_TX_GAS_USED, response.gas_used),
            EventAttribute::new(ATTRIBUTE_KEY_TX_TYPE, msg.tx_type),
        ];
        if let Some(error) = &response.vm_error {
            attributes.push(EventAttribute::new(ATTRIBUTE_KEY_ETHEREUM_TX_FAILED, error));
        }
        debug!(
            target: "handler",
            tx_hash = %msg.hash,
            gas_used = response.gas_used,
            block_gas_used = self.block_gas_used,
            failed = response.failed(),
            "transaction applied"
        );

        Ok(TxResult {
            response,
            receipt,
            attributes,
        })
    }
}
