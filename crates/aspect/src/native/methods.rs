use super::{
    gas::{GasMeter, CODE_BYTE_GAS, NATIVE_BASE_GAS, STORE_READ_GAS},
    ownership::{is_contract_owner, ContractCaller},
    NativeError,
};
use crate::{
    abi::IAspectNative::{self, IAspectNativeCalls},
    dispatcher::Dispatcher,
    join_point::{JoinPoint, JoinPointKind},
    keys::is_reserved_property,
    meta::AspectMeta,
    runtime::AspectRuntime,
    store::AspectStore,
};
use alloy_sol_types::{SolInterface, SolValue};
use context::ExecutionContext;
use database_interface::KvStore;
use primitives::{Address, Bytes, U256};
use tracing::debug;

type Result<T, E = NativeError> = core::result::Result<T, E>;

/// One native contract call in flight.
pub(super) struct Methods<'a, K, R, C: ?Sized> {
    pub(super) store: &'a mut AspectStore<K>,
    pub(super) runtime: &'a mut R,
    pub(super) caller: &'a mut C,
    pub(super) ctx: &'a mut ExecutionContext,
    pub(super) meter: &'a mut GasMeter,
    pub(super) sender: Address,
}

impl<K, R, C> Methods<'_, K, R, C>
where
    K: KvStore,
    R: AspectRuntime,
    C: ContractCaller + ?Sized,
{
    pub(super) fn dispatch(mut self, input: &[u8]) -> Result<Bytes> {
        self.meter.charge(NATIVE_BASE_GAS)?;
        let ret = match IAspectNativeCalls::abi_decode(input)? {
            IAspectNativeCalls::deploy(call) => self.deploy(call)?,
            IAspectNativeCalls::upgrade(call) => self.upgrade(call)?,
            IAspectNativeCalls::bind(call) => self.bind(call)?,
            IAspectNativeCalls::unbind(call) => self.unbind(call)?,
            IAspectNativeCalls::changeVersion(call) => self.change_version(call)?,
            IAspectNativeCalls::versionOf(call) => self.version_of(call)?,
            IAspectNativeCalls::aspectsOf(call) => self.aspects_of(call)?,
            IAspectNativeCalls::boundAddressesOf(call) => self.bound_addresses_of(call)?,
            IAspectNativeCalls::entrypoint(call) => self.entrypoint(call)?,
        };
        Ok(ret.into())
    }

    fn latest_version(&mut self, id: Address) -> Result<U256> {
        self.meter.charge(STORE_READ_GAS)?;
        let version = self.store.get_version(id)?;
        if version.is_zero() {
            return Err(NativeError::NotDeployed(id));
        }
        Ok(version)
    }

    fn join_points(&mut self, id: Address, version: U256) -> Result<JoinPoint> {
        self.meter.charge(STORE_READ_GAS)?;
        Ok(self.store.get_join_points(id, version)?)
    }

    fn is_contract(&mut self, address: Address) -> Result<bool> {
        self.meter.charge(STORE_READ_GAS)?;
        self.caller.is_contract(address).map_err(NativeError::Caller)
    }

    /// Contracts prove ownership through the ownership calls, accounts by being the sender.
    fn ensure_target_owner(&mut self, target: Address, is_contract: bool) -> Result<()> {
        let owner = if is_contract {
            is_contract_owner(&mut *self.caller, self.meter, target, self.sender)?
        } else {
            target == self.sender
        };
        if !owner {
            return Err(NativeError::NotTargetOwner {
                target,
                sender: self.sender,
            });
        }
        Ok(())
    }

    fn ensure_aspect_owner(&mut self, id: Address, version: U256) -> Result<()> {
        let meta = AspectMeta::new(id, version, 0);
        let sender = self.sender;
        let gas = self.meter.remaining();
        let (owner, gas_left) = Dispatcher::new(&mut *self.store, &mut *self.runtime)
            .is_owner(&mut *self.ctx, &meta, sender, gas)?;
        self.meter.settle(gas_left);
        if !owner {
            return Err(NativeError::NotAspectOwner { id, sender });
        }
        Ok(())
    }

    fn check_properties(properties: &[IAspectNative::KVPair]) -> Result<()> {
        match properties.iter().find(|kv| is_reserved_property(&kv.key)) {
            Some(kv) => Err(NativeError::ReservedProperty(
                String::from_utf8_lossy(&kv.key).into_owned(),
            )),
            None => Ok(()),
        }
    }

    /// Allocates a version and stores code, join points and properties under it.
    fn store_version(
        &mut self,
        id: Address,
        code: &[u8],
        properties: &[IAspectNative::KVPair],
        join_points: JoinPoint,
    ) -> Result<U256> {
        self.meter.charge_write(32)?;
        let version = self.store.bump_version(id)?;

        self.meter.charge_write(0)?;
        self.meter
            .charge((code.len() as u64).saturating_mul(CODE_BYTE_GAS))?;
        self.store.store_code(id, version, code)?;

        self.meter.charge_write(8)?;
        self.store.store_join_points(id, version, join_points)?;

        for kv in properties {
            self.meter.charge_write(kv.key.len() + kv.value.len())?;
            self.store.set_property(id, &kv.key, &kv.value)?;
        }

        let height = self.ctx.block().map(|block| block.height).unwrap_or_default();
        self.meter.charge_write(32)?;
        self.store.update_block_level(id, join_points, height)?;
        Ok(version)
    }

    fn deploy(&mut self, call: IAspectNative::deployCall) -> Result<Vec<u8>> {
        if call.account != self.sender {
            return Err(NativeError::AccountMismatch {
                account: call.account,
                sender: self.sender,
            });
        }
        Self::check_properties(&call.properties)?;
        let join_points = JoinPoint::from_u256(call.joinPoints)?;
        self.runtime
            .validate(&call.code)
            .map_err(NativeError::InvalidCode)?;

        let nonce = self.ctx.try_tx().map(|tx| tx.message.nonce).unwrap_or_default();
        let id = self.sender.create(nonce);
        self.meter.charge(STORE_READ_GAS)?;
        if !self.store.get_version(id)?.is_zero() {
            return Err(NativeError::AlreadyDeployed(id));
        }

        let version = self.store_version(id, &call.code, &call.properties, join_points)?;
        self.meter
            .charge_write(core::mem::size_of::<Address>() + call.proof.len())?;
        self.store.set_deployer(id, self.sender, &call.proof)?;

        if !call.initdata.is_empty() {
            let meta = AspectMeta::new(id, version, 0);
            let gas = self.meter.remaining();
            let output = Dispatcher::new(&mut *self.store, &mut *self.runtime)
                .init(&mut *self.ctx, &meta, call.initdata, gas)?;
            self.meter.settle(output.gas_left);
            output
                .result
                .map_err(|error| NativeError::Hook { id, error })?;
        }
        debug!(
            target: "aspect::native",
            aspect_id = %id,
            %version,
            join_points = join_points.bits(),
            "deployed"
        );
        Ok(Vec::new())
    }

    fn upgrade(&mut self, call: IAspectNative::upgradeCall) -> Result<Vec<u8>> {
        let id = call.aspectId;
        Self::check_properties(&call.properties)?;
        let join_points = JoinPoint::from_u256(call.joinPoints)?;
        let latest = self.latest_version(id)?;
        self.ensure_aspect_owner(id, latest)?;
        self.runtime
            .validate(&call.code)
            .map_err(NativeError::InvalidCode)?;

        let version = self.store_version(id, &call.code, &call.properties, join_points)?;
        debug!(
            target: "aspect::native",
            aspect_id = %id,
            %version,
            join_points = join_points.bits(),
            "upgraded"
        );
        Ok(Vec::new())
    }

    fn bind(&mut self, call: IAspectNative::bindCall) -> Result<Vec<u8>> {
        let id = call.aspectId;
        let target = call.contractAddr;
        let latest = self.latest_version(id)?;
        let version = if call.aspectVersion.is_zero() {
            latest
        } else {
            call.aspectVersion
        };
        if version > latest {
            return Err(NativeError::VersionNotFound { id, version });
        }
        let join_points = self.join_points(id, version)?;
        let priority = i64::from(call.priority);

        if self.is_contract(target)? {
            if !join_points.is_tx_level() {
                return Err(NativeError::MissingTxJoinPoint(id));
            }
            self.ensure_target_owner(target, true)?;
            self.meter.charge_write(64)?;
            self.store.bind_contract(target, id, version, priority)?;
        } else {
            if !join_points.is_verifier() {
                return Err(NativeError::MissingVerifyJoinPoint(id));
            }
            self.ensure_target_owner(target, false)?;
            self.meter.charge(STORE_READ_GAS)?;
            if !self.store.verifier_bindings(target)?.is_empty() {
                return Err(NativeError::VerifierAlreadyBound(target));
            }
            self.meter.charge_write(64)?;
            self.store.bind_verifier(target, id, version, priority)?;
        }
        debug!(target: "aspect::native", aspect_id = %id, %version, %target, priority, "bound");
        Ok(Vec::new())
    }

    fn unbind(&mut self, call: IAspectNative::unbindCall) -> Result<Vec<u8>> {
        let id = call.aspectId;
        let target = call.contractAddr;
        self.latest_version(id)?;
        let is_contract = self.is_contract(target)?;
        self.ensure_target_owner(target, is_contract)?;

        self.meter.charge(STORE_READ_GAS)?;
        if self.store.binding_of(target, id)?.is_none() {
            return Err(NativeError::NotBound { id, target });
        }
        self.meter.charge_write(64)?;
        self.store.unbind(target, id)?;
        debug!(target: "aspect::native", aspect_id = %id, %target, "unbound");
        Ok(Vec::new())
    }

    fn change_version(&mut self, call: IAspectNative::changeVersionCall) -> Result<Vec<u8>> {
        let id = call.aspectId;
        let target = call.contractAddr;
        let version = U256::from(call.version);
        let latest = self.latest_version(id)?;
        if version.is_zero() || version > latest {
            return Err(NativeError::VersionNotFound { id, version });
        }
        let is_contract = self.is_contract(target)?;
        self.ensure_target_owner(target, is_contract)?;
        self.ensure_aspect_owner(id, latest)?;

        self.meter.charge(STORE_READ_GAS)?;
        if self.store.binding_of(target, id)?.is_none() {
            return Err(NativeError::NotBound { id, target });
        }
        self.meter.charge_write(64)?;
        self.store.change_version(target, id, version)?;
        debug!(target: "aspect::native", aspect_id = %id, %target, %version, "version changed");
        Ok(Vec::new())
    }

    fn version_of(&mut self, call: IAspectNative::versionOfCall) -> Result<Vec<u8>> {
        self.meter.charge(STORE_READ_GAS)?;
        let version = self.store.get_version(call.aspectId)?;
        Ok(saturating_u64(version).abi_encode())
    }

    fn aspects_of(&mut self, call: IAspectNative::aspectsOfCall) -> Result<Vec<u8>> {
        let target = call.contractAddr;
        self.meter.charge(2 * STORE_READ_GAS)?;
        let mut bound = self.store.contract_bindings(target)?;
        for verifier in self.store.verifier_bindings(target)? {
            if !bound.iter().any(|meta| meta.id == verifier.id) {
                bound.push(verifier);
            }
        }
        let infos: Vec<IAspectNative::AspectBoundInfo> = bound
            .into_iter()
            .map(|meta| IAspectNative::AspectBoundInfo {
                aspectId: meta.id,
                version: saturating_u64(meta.version),
                priority: meta.priority.clamp(i8::MIN.into(), i8::MAX.into()) as i8,
            })
            .collect();
        Ok(infos.abi_encode())
    }

    fn bound_addresses_of(&mut self, call: IAspectNative::boundAddressesOfCall) -> Result<Vec<u8>> {
        self.meter.charge(STORE_READ_GAS)?;
        Ok(self.store.bound_addresses(call.aspectId)?.abi_encode())
    }

    fn entrypoint(&mut self, call: IAspectNative::entrypointCall) -> Result<Vec<u8>> {
        let id = call.aspectId;
        let version = self.latest_version(id)?;
        if !self.join_points(id, version)?.has(JoinPointKind::Operation) {
            return Err(NativeError::MissingOperation(id));
        }
        let meta = AspectMeta::new(id, version, 0);
        let gas = self.meter.remaining();
        let output = Dispatcher::new(&mut *self.store, &mut *self.runtime)
            .operation(&mut *self.ctx, &meta, call.optArgs, gas)?;
        self.meter.settle(output.gas_left);
        let ret = output
            .result
            .map_err(|error| NativeError::Hook { id, error })?;
        Ok(ret.abi_encode())
    }
}

fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
