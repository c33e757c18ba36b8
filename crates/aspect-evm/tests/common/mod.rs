#![allow(dead_code, unreachable_pub)]

use alloy_sol_types::{SolCall, SolValue};
use aspect_evm::{
    aspect::abi::IOwnable,
    primitives::{address, Address, Bytes, StorageKey, StorageValue, U256},
    test_utils::*,
    JoinPoint, Keeper, TxResult,
};
use tracing_subscriber::EnvFilter;

pub const OWNER: Address = address!("0x00000000000000000000000000000000000a11ce");
pub const USER: Address = address!("0x0000000000000000000000000000000000000b0b");
pub const CONTRACT: Address = address!("0x00000000000000000000000000000000c0ffee00");
/// A second contract, called from [`CONTRACT`] in nested call tests.
pub const CALLEE: Address = address!("0x00000000000000000000000000000000c0ffee01");
pub const INITIAL_BALANCE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Runtime bytecode of [`CONTRACT`] and [`CALLEE`]; never interpreted.
pub const CONTRACT_CODE: &[u8] = &[0x60, 0x00, 0x60, 0x00, 0xf3];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine in block 1 with two funded accounts and two contracts that claim everyone as
/// their owner.
pub struct Fixture {
    pub evm: TestEvm,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let keeper = funded_keeper(&[(OWNER, INITIAL_BALANCE), (USER, INITIAL_BALANCE)]);
        let mut evm = test_evm(keeper);
        for contract in [CONTRACT, CALLEE] {
            evm.keeper.insert_code(contract, Bytes::from_static(CONTRACT_CODE));
            evm.vm.script_selector(
                contract,
                IOwnable::isOwnerCall::SELECTOR,
                Script::returning(true.abi_encode()),
            );
        }
        evm.begin_block(test_block(1)).unwrap();
        Self { evm }
    }

    pub fn nonce(&mut self, address: Address) -> u64 {
        nonce_of(&mut self.evm.keeper, address)
    }

    pub fn storage(&mut self, address: Address, key: StorageKey) -> StorageValue {
        self.evm.keeper.storage(address, key).unwrap()
    }

    /// Applies a call from `from` at its current nonce.
    pub fn call(&mut self, from: Address, to: Address, data: impl Into<Bytes>) -> TxResult {
        let nonce = self.nonce(from);
        self.evm.apply_transaction(call(from, to, nonce, data)).unwrap()
    }

    /// Applies a native contract call that must succeed.
    pub fn native(&mut self, from: Address, input: Bytes) -> TxResult {
        let nonce = self.nonce(from);
        let result = self
            .evm
            .apply_transaction(native_call(from, nonce, input))
            .unwrap();
        assert!(!result.response.failed(), "{:?}", result.response.vm_error);
        result
    }

    /// Deploys an aspect owned by [`OWNER`] and returns its id.
    pub fn deploy(&mut self, join_points: JoinPoint) -> Address {
        let nonce = self.nonce(OWNER);
        self.native(OWNER, deploy_input(OWNER, join_points, Vec::new()));
        let id = OWNER.create(nonce);
        self.evm.runtime.set_owner(id, OWNER);
        id
    }

    /// Binds `id` to `target` on behalf of [`OWNER`].
    pub fn bind(&mut self, id: Address, target: Address, priority: i8) {
        self.native(OWNER, bind_input(id, target, priority));
    }
}

pub fn nonce_of<K: Keeper>(keeper: &mut K, address: Address) -> u64 {
    match keeper.account(address) {
        Ok(account) => account.map(|info| info.nonce).unwrap_or_default(),
        Err(_) => panic!("keeper failed to read {address}"),
    }
}
