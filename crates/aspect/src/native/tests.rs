use super::*;
use crate::{
    abi::{IAspectNative, IOwnable},
    host::HostApi,
    join_point::JoinPoint,
    keys,
    runtime::{AspectMethod, AspectOutput, AspectRequest, HookInput},
};
use alloy_sol_types::{SolCall, SolValue};
use context::{EvmConfig, Message};
use database::MemoryKvStore;
use primitives::{address, bytes};
use std::collections::BTreeMap;

const OWNER: Address = address!("0x1000000000000000000000000000000000000001");
const STRANGER: Address = address!("0x1000000000000000000000000000000000000002");
const CONTRACT: Address = address!("0x2000000000000000000000000000000000000001");
const OWNABLE: Address = address!("0x2000000000000000000000000000000000000002");
const GAS: u64 = 10_000_000;

/// Aspect module double: owned by `owner`, echoes operation arguments.
#[derive(Debug, Default)]
struct TestRuntime {
    owner: Address,
    calls: Vec<AspectMethod>,
}

impl AspectRuntime for TestRuntime {
    fn validate(&mut self, code: &[u8]) -> Result<(), String> {
        if code.is_empty() {
            return Err("empty module".into());
        }
        Ok(())
    }

    fn run(&mut self, request: AspectRequest<'_>, _host: &mut dyn HostApi) -> AspectOutput {
        self.calls.push(request.method);
        let gas_left = request.gas - 100;
        match request.input {
            HookInput::Owner(sender) => {
                AspectOutput::success(Bytes::from(vec![(sender == self.owner) as u8]), gas_left)
            }
            HookInput::Data(data) => AspectOutput::success(data, gas_left),
            _ => AspectOutput::success(Bytes::new(), gas_left),
        }
    }
}

#[derive(Debug)]
enum Ownership {
    IsOwner(Address),
    Ownable(Address),
}

#[derive(Debug, Default)]
struct TestCaller {
    contracts: BTreeMap<Address, Ownership>,
}

impl TestCaller {
    fn new() -> Self {
        let mut contracts = BTreeMap::new();
        contracts.insert(CONTRACT, Ownership::IsOwner(OWNER));
        contracts.insert(OWNABLE, Ownership::Ownable(OWNER));
        Self { contracts }
    }
}

impl ContractCaller for TestCaller {
    fn is_contract(&mut self, address: Address) -> Result<bool, String> {
        Ok(self.contracts.contains_key(&address))
    }

    fn static_call(&mut self, from: Address, to: Address, input: Bytes, gas: u64) -> CallResult {
        let gas_left = gas - 500;
        let selector = &input[..4];
        let output = match self.contracts.get(&to) {
            Some(Ownership::IsOwner(owner)) if selector == IOwnable::isOwnerCall::SELECTOR => {
                Some((from == *owner).abi_encode())
            }
            Some(Ownership::Ownable(owner)) if selector == IOwnable::ownerCall::SELECTOR => {
                Some(owner.abi_encode())
            }
            _ => None,
        };
        CallResult {
            success: output.is_some(),
            output: output.unwrap_or_default().into(),
            gas_left,
        }
    }
}

struct Harness {
    kv: MemoryKvStore,
    runtime: TestRuntime,
    caller: TestCaller,
    ctx: ExecutionContext,
}

impl Harness {
    fn new() -> Self {
        Self {
            kv: MemoryKvStore::new(),
            runtime: TestRuntime {
                owner: OWNER,
                ..Default::default()
            },
            caller: TestCaller::new(),
            ctx: ExecutionContext::new(),
        }
    }

    fn call(&mut self, sender: Address, nonce: u64, input: Vec<u8>, commit: bool) -> NativeOutcome {
        let message = Message {
            from: sender,
            nonce,
            ..Default::default()
        };
        let mut scope = self.ctx.begin_tx(message, EvmConfig::default(), 0, commit, None);
        execute(
            &mut self.kv,
            &mut self.runtime,
            &mut self.caller,
            &mut scope,
            NativeCall {
                sender,
                input: input.into(),
                value: U256::ZERO,
                gas: GAS,
                commit,
            },
        )
        .unwrap()
    }

    fn deploy(&mut self, nonce: u64, join_points: JoinPoint) -> Address {
        let outcome = self.call(OWNER, nonce, deploy_call(vec![], join_points), true);
        assert!(outcome.is_success(), "{:?}", outcome.error);
        OWNER.create(nonce)
    }

    fn store(&mut self) -> AspectStore<&mut MemoryKvStore> {
        AspectStore::new(&mut self.kv)
    }
}

fn kv(key: &str, value: &str) -> IAspectNative::KVPair {
    IAspectNative::KVPair {
        key: Bytes::copy_from_slice(key.as_bytes()),
        value: Bytes::copy_from_slice(value.as_bytes()),
    }
}

fn deploy_call(properties: Vec<IAspectNative::KVPair>, join_points: JoinPoint) -> Vec<u8> {
    IAspectNative::deployCall {
        code: bytes!("0061736d"),
        initdata: Bytes::new(),
        properties,
        account: OWNER,
        proof: bytes!("01"),
        joinPoints: U256::from(join_points.bits()),
    }
    .abi_encode()
}

fn bind_call(id: Address, target: Address, priority: i8) -> Vec<u8> {
    IAspectNative::bindCall {
        aspectId: id,
        aspectVersion: U256::ZERO,
        contractAddr: target,
        priority,
    }
    .abi_encode()
}

#[test]
fn deploy_stores_version_code_and_deployer() {
    let mut h = Harness::new();
    let id = h.deploy(0, JoinPoint::PRE_TX_EXECUTE);

    let mut store = h.store();
    assert_eq!(store.get_version(id).unwrap(), U256::from(1));
    assert_eq!(
        store.get_code(id, U256::from(1)).unwrap(),
        Some(bytes!("0061736d"))
    );
    assert_eq!(store.get_deployer(id).unwrap(), Some(OWNER));
    assert_eq!(
        store.get_join_points(id, U256::from(1)).unwrap(),
        JoinPoint::PRE_TX_EXECUTE
    );

    let out = h.call(
        STRANGER,
        0,
        IAspectNative::versionOfCall { aspectId: id }.abi_encode(),
        false,
    );
    assert_eq!(u64::abi_decode(&out.ret).unwrap(), 1);
}

#[rstest::rstest]
#[case(keys::ACCOUNT_PROPERTY_KEY)]
#[case(keys::PROOF_PROPERTY_KEY)]
fn reserved_property_rejected(#[case] key: &str) {
    let mut h = Harness::new();
    let outcome = h.call(
        OWNER,
        0,
        deploy_call(vec![kv("ok", "1"), kv(key, "x")], JoinPoint::PRE_TX_EXECUTE),
        true,
    );
    assert!(matches!(
        outcome.error,
        Some(NativeError::ReservedProperty(_))
    ));
    assert!(h.kv.is_empty());
    assert!(outcome.gas_left < GAS);
}

#[test]
fn deploy_account_must_be_sender() {
    let mut h = Harness::new();
    let outcome = h.call(STRANGER, 0, deploy_call(vec![], JoinPoint::PRE_TX_EXECUTE), true);
    assert!(matches!(
        outcome.error,
        Some(NativeError::AccountMismatch { .. })
    ));
    assert!(h.kv.is_empty());
}

#[test]
fn bind_checks_contract_ownership() {
    let mut h = Harness::new();
    let id = h.deploy(0, JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE);

    let denied = h.call(STRANGER, 0, bind_call(id, CONTRACT, 0), true);
    assert!(matches!(
        denied.error,
        Some(NativeError::NotTargetOwner { .. })
    ));

    let bound = h.call(OWNER, 1, bind_call(id, CONTRACT, 3), true);
    assert!(bound.is_success(), "{:?}", bound.error);
    let fallback = h.call(OWNER, 2, bind_call(id, OWNABLE, -1), true);
    assert!(fallback.is_success(), "{:?}", fallback.error);

    let out = h.call(
        STRANGER,
        0,
        IAspectNative::aspectsOfCall {
            contractAddr: CONTRACT,
        }
        .abi_encode(),
        false,
    );
    let infos = Vec::<IAspectNative::AspectBoundInfo>::abi_decode(&out.ret).unwrap();
    assert_eq!(
        infos,
        vec![IAspectNative::AspectBoundInfo {
            aspectId: id,
            version: 1,
            priority: 3
        }]
    );

    let out = h.call(
        STRANGER,
        0,
        IAspectNative::boundAddressesOfCall { aspectId: id }.abi_encode(),
        false,
    );
    assert_eq!(
        Vec::<Address>::abi_decode(&out.ret).unwrap(),
        vec![CONTRACT, OWNABLE]
    );
}

#[test]
fn bind_checks_join_point_category() {
    let mut h = Harness::new();
    let verifier = h.deploy(0, JoinPoint::VERIFY_TX);
    let hook = h.deploy(1, JoinPoint::PRE_TX_EXECUTE);

    let out = h.call(OWNER, 2, bind_call(verifier, CONTRACT, 0), true);
    assert!(matches!(
        out.error,
        Some(NativeError::MissingTxJoinPoint(_))
    ));
    let out = h.call(OWNER, 2, bind_call(hook, OWNER, 0), true);
    assert!(matches!(
        out.error,
        Some(NativeError::MissingVerifyJoinPoint(_))
    ));

    let out = h.call(OWNER, 2, bind_call(verifier, OWNER, 0), true);
    assert!(out.is_success(), "{:?}", out.error);
    assert_eq!(h.store().verifier_bindings(OWNER).unwrap().len(), 1);

    let another = h.deploy(3, JoinPoint::VERIFY_TX);
    let out = h.call(OWNER, 4, bind_call(another, OWNER, 0), true);
    assert!(matches!(
        out.error,
        Some(NativeError::VerifierAlreadyBound(_))
    ));
}

#[test]
fn upgrade_requires_aspect_ownership() {
    let mut h = Harness::new();
    let id = h.deploy(0, JoinPoint::PRE_TX_EXECUTE);
    let upgrade = |properties| {
        IAspectNative::upgradeCall {
            aspectId: id,
            code: bytes!("0061736d01"),
            properties,
            joinPoints: U256::from(JoinPoint::ON_BLOCK_FINALIZE.bits()),
        }
        .abi_encode()
    };

    let denied = h.call(STRANGER, 0, upgrade(vec![]), true);
    assert!(matches!(
        denied.error,
        Some(NativeError::NotAspectOwner { .. })
    ));
    assert_eq!(h.store().get_version(id).unwrap(), U256::from(1));

    let reserved = h.call(OWNER, 1, upgrade(vec![kv(keys::PROOF_PROPERTY_KEY, "x")]), true);
    assert!(matches!(
        reserved.error,
        Some(NativeError::ReservedProperty(_))
    ));
    assert_eq!(h.store().get_version(id).unwrap(), U256::from(1));

    let ok = h.call(OWNER, 1, upgrade(vec![kv("k", "v")]), true);
    assert!(ok.is_success(), "{:?}", ok.error);
    let mut store = h.store();
    assert_eq!(store.get_version(id).unwrap(), U256::from(2));
    assert_eq!(store.get_property(id, b"k").unwrap(), Some(bytes!("76")));
    assert!(store.block_level_aspects().unwrap().contains_key(&id));
}

#[test]
fn change_version_requires_binding() {
    let mut h = Harness::new();
    let id = h.deploy(0, JoinPoint::PRE_TX_EXECUTE);
    let change = IAspectNative::changeVersionCall {
        aspectId: id,
        contractAddr: CONTRACT,
        version: 1,
    }
    .abi_encode();

    let out = h.call(OWNER, 1, change.clone(), true);
    assert!(matches!(out.error, Some(NativeError::NotBound { .. })));

    assert!(h.call(OWNER, 1, bind_call(id, CONTRACT, 0), true).is_success());
    let out = h.call(OWNER, 2, change, true);
    assert!(out.is_success(), "{:?}", out.error);

    let too_new = IAspectNative::changeVersionCall {
        aspectId: id,
        contractAddr: CONTRACT,
        version: 2,
    }
    .abi_encode();
    let out = h.call(OWNER, 3, too_new, true);
    assert!(matches!(
        out.error,
        Some(NativeError::VersionNotFound { .. })
    ));
}

#[test]
fn uncommitted_call_leaves_no_trace() {
    let mut h = Harness::new();
    let outcome = h.call(OWNER, 0, deploy_call(vec![], JoinPoint::PRE_TX_EXECUTE), false);
    assert!(outcome.is_success());
    assert!(h.kv.is_empty());
}

#[test]
fn entrypoint_runs_operation() {
    let mut h = Harness::new();
    let id = h.deploy(0, JoinPoint::OPERATION);
    let out = h.call(
        STRANGER,
        0,
        IAspectNative::entrypointCall {
            aspectId: id,
            optArgs: bytes!("cafe"),
        }
        .abi_encode(),
        false,
    );
    assert!(out.is_success(), "{:?}", out.error);
    assert_eq!(Bytes::abi_decode(&out.ret).unwrap(), bytes!("cafe"));

    let hook = h.deploy(1, JoinPoint::PRE_TX_EXECUTE);
    let out = h.call(
        STRANGER,
        0,
        IAspectNative::entrypointCall {
            aspectId: hook,
            optArgs: Bytes::new(),
        }
        .abi_encode(),
        false,
    );
    assert!(matches!(out.error, Some(NativeError::MissingOperation(_))));
}

#[test]
fn unknown_selector_and_value_fail() {
    let mut h = Harness::new();
    let out = h.call(OWNER, 0, vec![1, 2, 3, 4], true);
    assert!(matches!(out.error, Some(NativeError::Decode(_))));
    assert_eq!(out.gas_left, GAS - gas::NATIVE_BASE_GAS);
}
