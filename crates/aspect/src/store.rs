//! Persistent aspect registry.
use crate::{
    join_point::JoinPoint,
    keys::{self, ACCOUNT_PROPERTY_KEY, PROOF_PROPERTY_KEY},
    meta::AspectMeta,
};
use database_interface::KvStore;
use primitives::{Address, Bytes, U256};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Error returned by [`AspectStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key/value store failed.
    #[error("kv store error: {0}")]
    Kv(#[source] Box<dyn core::error::Error + Send + Sync>),
    /// A stored value could not be decoded or encoded.
    #[error("malformed {what}: {source}")]
    Serialization {
        /// Value kind.
        what: &'static str,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored version is wider than 256 bits.
    #[error("malformed version of aspect {0}")]
    MalformedVersion(Address),
    /// A stored join point mask is not eight bytes.
    #[error("malformed join points of aspect {0}")]
    MalformedJoinPoints(Address),
    /// Version counter is exhausted.
    #[error("version overflow of aspect {0}")]
    VersionOverflow(Address),
    /// No code is stored for the version.
    #[error("aspect {id} has no code at version {version}")]
    CodeNotFound {
        /// Aspect id.
        id: Address,
        /// Requested version.
        version: U256,
    },
    /// The aspect is already bound to the target.
    #[error("aspect {id} is already bound to {target}")]
    AlreadyBound {
        /// Aspect id.
        id: Address,
        /// Bound contract or account.
        target: Address,
    },
    /// The aspect is not bound to the target.
    #[error("aspect {id} is not bound to {target}")]
    NotBound {
        /// Aspect id.
        id: Address,
        /// Contract or account.
        target: Address,
    },
}

/// Kind of binding list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// Transaction-level hooks of a contract.
    Contract,
    /// Transaction verifier of an account.
    Verifier,
}

impl BindingKind {
    fn key(self, target: Address) -> Vec<u8> {
        match self {
            Self::Contract => keys::contract_bind_key(target),
            Self::Verifier => keys::verifier_bind_key(target),
        }
    }
}

/// Aspect code, versions, properties, bindings and state over a [`KvStore`].
#[derive(Debug, Default)]
pub struct AspectStore<S> {
    store: S,
}

type Result<T, E = StoreError> = core::result::Result<T, E>;

impl<S: KvStore> AspectStore<S> {
    /// Wraps a key/value store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Returns the wrapped store mutably.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the registry, returning the wrapped store.
    pub fn into_inner(self) -> S {
        self.store
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(key).map_err(|e| StoreError::Kv(Box::new(e)))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store
            .set(key, value)
            .map_err(|e| StoreError::Kv(Box::new(e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.store.delete(key).map_err(|e| StoreError::Kv(Box::new(e)))
    }

    fn get_json<T: DeserializeOwned + Default>(
        &mut self,
        key: &[u8],
        what: &'static str,
    ) -> Result<T> {
        match self.get(key)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map_err(|source| StoreError::Serialization { what, source }),
            None => Ok(T::default()),
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &[u8], value: &T, what: &'static str) -> Result<()> {
        let raw = serde_json::to_vec(value)
            .map_err(|source| StoreError::Serialization { what, source })?;
        self.set(key, &raw)
    }

    /// Latest deployed version, zero if the aspect was never deployed.
    pub fn get_version(&mut self, id: Address) -> Result<U256> {
        match self.get(&keys::version_key(id))? {
            Some(raw) => U256::try_from_be_slice(&raw).ok_or(StoreError::MalformedVersion(id)),
            None => Ok(U256::ZERO),
        }
    }

    /// Allocates the next version of an aspect and persists it as the latest one.
    pub fn bump_version(&mut self, id: Address) -> Result<U256> {
        let version = self
            .get_version(id)?
            .checked_add(U256::from(1))
            .ok_or(StoreError::VersionOverflow(id))?;
        self.set(&keys::version_key(id), &keys::version_bytes(version))?;
        debug!(target: "aspect::store", aspect_id = %id, %version, "bumped version");
        Ok(version)
    }

    /// Stores code under a version. The code is not validated.
    pub fn store_code(&mut self, id: Address, version: U256, code: &[u8]) -> Result<()> {
        self.set(&keys::code_key(id, version), code)
    }

    /// Code of a version.
    pub fn get_code(&mut self, id: Address, version: U256) -> Result<Option<Bytes>> {
        Ok(self.get(&keys::code_key(id, version))?.map(Bytes::from))
    }

    /// Stores the join points declared by a version.
    pub fn store_join_points(
        &mut self,
        id: Address,
        version: U256,
        join_points: JoinPoint,
    ) -> Result<()> {
        self.set(
            &keys::join_point_key(id, version),
            &join_points.bits().to_be_bytes(),
        )
    }

    /// Join points declared by a version, empty if none were stored.
    pub fn get_join_points(&mut self, id: Address, version: U256) -> Result<JoinPoint> {
        let Some(raw) = self.get(&keys::join_point_key(id, version))? else {
            return Ok(JoinPoint::empty());
        };
        let bits = <[u8; 8]>::try_from(raw.as_slice())
            .map(u64::from_be_bytes)
            .map_err(|_| StoreError::MalformedJoinPoints(id))?;
        Ok(JoinPoint::from_bits_truncate(bits))
    }

    /// Writes a property.
    pub fn set_property(&mut self, id: Address, key: &[u8], value: &[u8]) -> Result<()> {
        self.set(&keys::property_key(id, key), value)
    }

    /// Reads a property.
    pub fn get_property(&mut self, id: Address, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.get(&keys::property_key(id, key))?.map(Bytes::from))
    }

    /// Records the deployer account and proof under the reserved property keys.
    pub fn set_deployer(&mut self, id: Address, account: Address, proof: &[u8]) -> Result<()> {
        self.set_property(id, ACCOUNT_PROPERTY_KEY.as_bytes(), account.as_slice())?;
        self.set_property(id, PROOF_PROPERTY_KEY.as_bytes(), proof)
    }

    /// Deployer account recorded at deployment.
    pub fn get_deployer(&mut self, id: Address) -> Result<Option<Address>> {
        Ok(self
            .get_property(id, ACCOUNT_PROPERTY_KEY.as_bytes())?
            .and_then(|raw| Address::try_from(raw.as_ref()).ok()))
    }

    /// Binding list of a target, in hook order.
    pub fn bindings(&mut self, kind: BindingKind, target: Address) -> Result<Vec<AspectMeta>> {
        let mut bindings: Vec<AspectMeta> = self.get_json(&kind.key(target), "binding list")?;
        bindings.sort();
        Ok(bindings)
    }

    /// Contract-level bindings of a contract, in hook order.
    pub fn contract_bindings(&mut self, contract: Address) -> Result<Vec<AspectMeta>> {
        self.bindings(BindingKind::Contract, contract)
    }

    /// Verifier bindings of an account, in hook order.
    pub fn verifier_bindings(&mut self, account: Address) -> Result<Vec<AspectMeta>> {
        self.bindings(BindingKind::Verifier, account)
    }

    fn save_bindings(
        &mut self,
        kind: BindingKind,
        target: Address,
        bindings: &[AspectMeta],
    ) -> Result<()> {
        if bindings.is_empty() {
            return self.delete(&kind.key(target));
        }
        self.set_json(&kind.key(target), &bindings, "binding list")
    }

    /// Binds an aspect version to a contract's transaction-level hooks.
    pub fn bind_contract(
        &mut self,
        contract: Address,
        id: Address,
        version: U256,
        priority: i64,
    ) -> Result<()> {
        self.bind(BindingKind::Contract, contract, AspectMeta::new(id, version, priority))
    }

    /// Binds an aspect version as transaction verifier of an account.
    pub fn bind_verifier(
        &mut self,
        account: Address,
        id: Address,
        version: U256,
        priority: i64,
    ) -> Result<()> {
        self.bind(BindingKind::Verifier, account, AspectMeta::new(id, version, priority))
    }

    fn bind(&mut self, kind: BindingKind, target: Address, meta: AspectMeta) -> Result<()> {
        if self.get_code(meta.id, meta.version)?.is_none() {
            return Err(StoreError::CodeNotFound {
                id: meta.id,
                version: meta.version,
            });
        }
        let mut bindings = self.bindings(kind, target)?;
        if bindings.iter().any(|bound| bound.id == meta.id) {
            return Err(StoreError::AlreadyBound { id: meta.id, target });
        }
        debug!(
            target: "aspect::store",
            aspect_id = %meta.id,
            version = %meta.version,
            priority = meta.priority,
            %target,
            ?kind,
            "bind"
        );
        let id = meta.id;
        let position = bindings.partition_point(|bound| bound < &meta);
        bindings.insert(position, meta);
        self.save_bindings(kind, target, &bindings)?;
        self.add_ref(id, target)
    }

    fn remove_binding(&mut self, kind: BindingKind, target: Address, id: Address) -> Result<bool> {
        let mut bindings = self.bindings(kind, target)?;
        let before = bindings.len();
        bindings.retain(|bound| bound.id != id);
        if bindings.len() == before {
            return Ok(false);
        }
        self.save_bindings(kind, target, &bindings)?;
        Ok(true)
    }

    /// Removes an aspect from both binding lists of a target.
    pub fn unbind(&mut self, target: Address, id: Address) -> Result<()> {
        let contract = self.remove_binding(BindingKind::Contract, target, id)?;
        let verifier = self.remove_binding(BindingKind::Verifier, target, id)?;
        if !contract && !verifier {
            return Err(StoreError::NotBound { id, target });
        }
        debug!(target: "aspect::store", aspect_id = %id, %target, "unbind");
        self.remove_ref(id, target)
    }

    /// Changes the bound version of an aspect.
    ///
    /// Returns `Ok(false)` without writing anything if the aspect is not bound to `target`.
    pub fn change_version(&mut self, target: Address, id: Address, version: U256) -> Result<bool> {
        let mut changed = false;
        for kind in [BindingKind::Contract, BindingKind::Verifier] {
            let mut bindings = self.bindings(kind, target)?;
            let Some(bound) = bindings.iter_mut().find(|bound| bound.id == id) else {
                continue;
            };
            bound.version = version;
            self.save_bindings(kind, target, &bindings)?;
            changed = true;
        }
        debug!(
            target: "aspect::store",
            aspect_id = %id,
            %target,
            %version,
            changed,
            "change version"
        );
        Ok(changed)
    }

    /// Returns the binding of `id` to `target`, if any.
    pub fn binding_of(&mut self, target: Address, id: Address) -> Result<Option<AspectMeta>> {
        for kind in [BindingKind::Contract, BindingKind::Verifier] {
            if let Some(meta) = self.bindings(kind, target)?.into_iter().find(|m| m.id == id) {
                return Ok(Some(meta));
            }
        }
        Ok(None)
    }

    fn refs(&mut self, id: Address) -> Result<BTreeSet<String>> {
        self.get_json(&keys::aspect_ref_key(id), "aspect references")
    }

    fn add_ref(&mut self, id: Address, target: Address) -> Result<()> {
        let mut refs = self.refs(id)?;
        if refs.insert(target.to_checksum(None)) {
            self.set_json(&keys::aspect_ref_key(id), &refs, "aspect references")?;
        }
        Ok(())
    }

    fn remove_ref(&mut self, id: Address, target: Address) -> Result<()> {
        let mut refs = self.refs(id)?;
        if refs.remove(&target.to_checksum(None)) {
            self.set_json(&keys::aspect_ref_key(id), &refs, "aspect references")?;
        }
        Ok(())
    }

    /// Addresses the aspect is bound to, ascending.
    pub fn bound_addresses(&mut self, id: Address) -> Result<Vec<Address>> {
        let mut addresses: Vec<Address> = self
            .refs(id)?
            .iter()
            .filter_map(|raw| raw.parse().ok())
            .collect();
        addresses.sort_unstable();
        Ok(addresses)
    }

    /// Block-level aspects with the height they were registered at.
    pub fn block_level_aspects(&mut self) -> Result<BTreeMap<Address, u64>> {
        let raw: BTreeMap<String, u64> =
            self.get_json(&keys::block_key(), "block level registrations")?;
        Ok(raw
            .into_iter()
            .filter_map(|(id, height)| Some((id.parse().ok()?, height)))
            .collect())
    }

    fn save_block_level(&mut self, aspects: &BTreeMap<Address, u64>) -> Result<()> {
        let raw: BTreeMap<String, u64> = aspects
            .iter()
            .map(|(id, height)| (id.to_checksum(None), *height))
            .collect();
        self.set_json(&keys::block_key(), &raw, "block level registrations")
    }

    /// Registers or deregisters a block-level aspect from the join points of its latest version.
    pub fn update_block_level(
        &mut self,
        id: Address,
        join_points: JoinPoint,
        height: u64,
    ) -> Result<()> {
        let mut aspects = self.block_level_aspects()?;
        let changed = if join_points.is_block_level() {
            aspects.insert(id, height) != Some(height)
        } else {
            aspects.remove(&id).is_some()
        };
        if changed {
            debug!(
                target: "aspect::store",
                aspect_id = %id,
                block_level = join_points.is_block_level(),
                height,
                "block level registration"
            );
            self.save_block_level(&aspects)?;
        }
        Ok(())
    }

    /// Reads aspect state of a contract.
    pub fn get_state(
        &mut self,
        id: Address,
        contract: Address,
        key: &[u8],
    ) -> Result<Option<Bytes>> {
        Ok(self.get(&keys::state_key(id, contract, key))?.map(Bytes::from))
    }

    /// Writes aspect state of a contract. An empty value removes the entry.
    pub fn set_state(
        &mut self,
        id: Address,
        contract: Address,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let key = keys::state_key(id, contract, key);
        if value.is_empty() {
            return self.delete(&key);
        }
        self.set(&key, value)
    }
}
