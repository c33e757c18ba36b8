//! Response and receipt of an applied message.
use crate::vm::OUT_OF_GAS;
use context::{ExecutionContext, Message, Receipt};
use primitives::{Address, Bytes, Log, B256};

/// Result of applying one message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResponse {
    /// Gas charged, after refunds and the gas used floor.
    pub gas_used: u64,
    /// Why execution failed, `None` on success.
    pub vm_error: Option<String>,
    /// Return data.
    pub ret: Bytes,
    /// Emitted logs.
    pub logs: Vec<Log>,
    /// Transaction hash.
    pub hash: B256,
    /// Created contract.
    pub contract_address: Option<Address>,
}

impl ExecutionResponse {
    /// Returns true if execution failed.
    #[inline]
    pub fn failed(&self) -> bool {
        self.vm_error.is_some()
    }

    /// Returns true if execution ran out of gas.
    pub fn is_out_of_gas(&self) -> bool {
        self.vm_error.as_deref() == Some(OUT_OF_GAS)
    }
}

/// Builds the receipt hooks observe for `msg`.
pub(crate) fn build_receipt(
    ctx: &ExecutionContext,
    msg: &Message,
    success: bool,
    gas_used: u64,
    cumulative_gas_used: u64,
    logs: Vec<Log>,
    contract_address: Option<Address>,
) -> Receipt {
    let (block_hash, block_number) = ctx
        .block()
        .map(|block| (block.hash, block.height))
        .unwrap_or_default();
    Receipt {
        tx_type: msg.tx_type,
        status: success,
        cumulative_gas_used: cumulative_gas_used.saturating_add(gas_used),
        gas_used,
        logs,
        tx_hash: msg.hash,
        contract_address,
        block_hash,
        block_number,
        transaction_index: ctx.try_tx().map(|tx| tx.tx_index).unwrap_or_default(),
    }
}
