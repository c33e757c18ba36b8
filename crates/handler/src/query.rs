//! Read-only execution: calls, gas estimation and tracing.
//!
//! Every path runs against a cache over the keeper and the aspect registry that is dropped
//! afterwards, so nothing reaches persistent state.
use crate::{
    error::TransactionError,
    evm::Evm,
    execution::apply_message,
    post_execution::ExecutionResponse,
    vm::Vm,
};
use aspect::AspectRuntime;
use context::{CallTracer, ChainParamsProvider, DeadlineTracer, Message, SharedTracer, Tracer};
use database::{CacheKeeper, CacheKvStore};
use database_interface::{Keeper, KvStore};
use parking_lot::Mutex;
use primitives::TX_GAS;
use std::{sync::Arc, time::Instant};
use tracing::debug;

type Result<T, E> = core::result::Result<T, TransactionError<E>>;

/// Result of [`Evm::trace_tx`].
#[derive(Clone, Debug)]
pub struct TraceResult {
    /// Response of the message.
    pub response: ExecutionResponse,
    /// Call tree and hooks.
    pub trace: CallTracer,
}

impl<K, S, V, R, P> Evm<K, S, V, R, P>
where
    K: Keeper,
    S: KvStore,
    V: Vm,
    R: AspectRuntime,
    P: ChainParamsProvider,
{
    fn simulate(
        &mut self,
        msg: Message,
        tracer: Option<SharedTracer>,
    ) -> Result<ExecutionResponse, K::Error> {
        let env = self.message_env(self.config(), tracer, false);
        apply_message(
            CacheKeeper::new(&mut self.keeper),
            CacheKvStore::new(&mut self.store),
            &mut self.vm,
            &mut self.runtime,
            &mut self.ctx,
            msg,
            env,
        )
    }

    /// Executes a message without persisting anything.
    pub fn eth_call(&mut self, msg: Message) -> Result<ExecutionResponse, K::Error> {
        self.simulate(msg, None)
    }

    /// Runs `msg` with `gas` as its gas limit. Returns whether it failed.
    fn executable(
        &mut self,
        msg: &Message,
        gas: u64,
    ) -> Result<(bool, Option<ExecutionResponse>), K::Error> {
        let mut msg = msg.clone();
        msg.gas_limit = gas;
        match self.simulate(msg, None) {
            Ok(response) => Ok((response.failed(), Some(response))),
            Err(TransactionError::IntrinsicGas { .. }) => Ok((true, None)),
            Err(err) => Err(err),
        }
    }

    /// Finds the lowest gas limit `msg` succeeds with.
    ///
    /// Searches between the intrinsic cost of a transfer and `gas_cap`, or the block gas
    /// limit when no cap is given.
    pub fn estimate_gas(&mut self, msg: Message, gas_cap: Option<u64>) -> Result<u64, K::Error> {
        let cap = gas_cap.unwrap_or_else(|| self.params.block_gas_limit());
        let mut hi = if msg.gas_limit >= TX_GAS {
            msg.gas_limit.min(cap)
        } else {
            cap
        };
        let cap = hi;
        let mut lo = TX_GAS - 1;

        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            let (failed, _) = self.executable(&msg, mid)?;
            if failed {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        if hi == cap {
            let (failed, response) = self.executable(&msg, hi)?;
            if failed {
                return Err(match response {
                    Some(response) if !response.is_out_of_gas() => {
                        TransactionError::ExecutionFailed(response.vm_error.unwrap_or_default())
                    }
                    _ => TransactionError::GasAllowanceExceeded(cap),
                });
            }
        }
        debug!(target: "handler", gas = hi, "gas estimated");
        Ok(hi)
    }

    /// Traces a message, stopping the tracer once `deadline` passes.
    pub fn trace_tx(&mut self, msg: Message, deadline: Instant) -> Result<TraceResult, K::Error> {
        let tracer = Arc::new(Mutex::new(DeadlineTracer::new(CallTracer::default(), deadline)));
        let shared: SharedTracer = tracer.clone();
        let response = self.simulate(msg, Some(shared))?;

        let mut tracer = tracer.lock();
        if tracer.is_stopped() {
            return Err(TransactionError::DeadlineExceeded);
        }
        let trace = core::mem::replace(
            &mut *tracer,
            DeadlineTracer::new(CallTracer::default(), deadline),
        )
        .into_inner();
        Ok(TraceResult { response, trace })
    }
}
