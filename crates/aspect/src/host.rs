//! Host callbacks available to a running aspect.
use crate::store::{AspectStore, StoreError};
use context::{ContextKey, ContextValue, ExecutionContext, UnknownContextKey};
use database_interface::KvStore;
use primitives::{Address, Bytes};

/// Error returned by host callbacks.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Registry access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The context key name is not known.
    #[error(transparent)]
    UnknownKey(#[from] UnknownContextKey),
    /// The entry point may not write.
    #[error("write not allowed in this entry point")]
    ReadOnly,
    /// The callback needs a contract, the hook has none.
    #[error("no contract in scope")]
    NoContract,
    /// The callback needs a transaction, the hook has none.
    #[error("no transaction in scope")]
    NoTransaction,
}

/// Callbacks an aspect module can make into the chain.
pub trait HostApi {
    /// Id of the running aspect.
    fn aspect_id(&self) -> Address;

    /// Contract the hook runs for, if any.
    fn contract(&self) -> Option<Address>;

    /// Resolves a context value. `None` if it is not available at this join point.
    fn query(&self, key: ContextKey) -> Option<ContextValue>;

    /// Resolves a context value by its runtime name.
    fn query_by_name(&self, name: &str) -> Result<Option<ContextValue>, HostError> {
        Ok(self.query(name.parse()?))
    }

    /// Reads a property of the running aspect.
    fn property(&mut self, key: &[u8]) -> Result<Option<Bytes>, HostError>;

    /// Reads aspect state of the contract in scope.
    fn state(&mut self, key: &[u8]) -> Result<Option<Bytes>, HostError>;

    /// Writes aspect state of the contract in scope.
    fn set_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError>;

    /// Reads from the transaction scratch space.
    fn scratch(&self, key: &str) -> Result<Option<Bytes>, HostError>;

    /// Writes to the transaction scratch space.
    fn set_scratch(&mut self, key: &str, value: Bytes) -> Result<(), HostError>;

    /// Reads a value another hook of this transaction left.
    fn tx_property(&self, key: &str) -> Result<Option<Bytes>, HostError>;

    /// Leaves a value for later hooks of this transaction.
    fn set_tx_property(&mut self, key: &str, value: Bytes) -> Result<(), HostError>;
}

/// [`HostApi`] over explicit handles to the execution context and the registry.
#[derive(Debug)]
pub struct AspectHost<'a, S> {
    ctx: &'a mut ExecutionContext,
    store: &'a mut AspectStore<S>,
    aspect_id: Address,
    contract: Option<Address>,
    writable: bool,
}

impl<'a, S: KvStore> AspectHost<'a, S> {
    /// Creates a host for one aspect invocation.
    pub fn new(
        ctx: &'a mut ExecutionContext,
        store: &'a mut AspectStore<S>,
        aspect_id: Address,
        contract: Option<Address>,
        writable: bool,
    ) -> Self {
        Self {
            ctx,
            store,
            aspect_id,
            contract,
            writable,
        }
    }

    fn scratch_contract(&self) -> Result<Address, HostError> {
        self.contract.ok_or(HostError::NoContract)
    }
}

impl<S: KvStore> HostApi for AspectHost<'_, S> {
    fn aspect_id(&self) -> Address {
        self.aspect_id
    }

    fn contract(&self) -> Option<Address> {
        self.contract
    }

    fn query(&self, key: ContextKey) -> Option<ContextValue> {
        self.ctx.query(key)
    }

    fn property(&mut self, key: &[u8]) -> Result<Option<Bytes>, HostError> {
        Ok(self.store.get_property(self.aspect_id, key)?)
    }

    fn state(&mut self, key: &[u8]) -> Result<Option<Bytes>, HostError> {
        let contract = self.contract.ok_or(HostError::NoContract)?;
        Ok(self.store.get_state(self.aspect_id, contract, key)?)
    }

    fn set_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }
        let contract = self.contract.ok_or(HostError::NoContract)?;
        Ok(self.store.set_state(self.aspect_id, contract, key, value)?)
    }

    fn scratch(&self, key: &str) -> Result<Option<Bytes>, HostError> {
        let contract = self.scratch_contract()?;
        let tx = self.ctx.try_tx().ok_or(HostError::NoTransaction)?;
        Ok(tx.scratch().get(contract, self.aspect_id, key))
    }

    fn set_scratch(&mut self, key: &str, value: Bytes) -> Result<(), HostError> {
        let contract = self.scratch_contract()?;
        let tx = self.ctx.try_tx().ok_or(HostError::NoTransaction)?;
        tx.scratch().set(contract, self.aspect_id, key, value);
        Ok(())
    }

    fn tx_property(&self, key: &str) -> Result<Option<Bytes>, HostError> {
        let tx = self.ctx.try_tx().ok_or(HostError::NoTransaction)?;
        Ok(tx.properties.get(key).cloned())
    }

    fn set_tx_property(&mut self, key: &str, value: Bytes) -> Result<(), HostError> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }
        if !self.ctx.has_tx() {
            return Err(HostError::NoTransaction);
        }
        self.ctx.tx_mut().properties.insert(key.to_owned(), value);
        Ok(())
    }
}
