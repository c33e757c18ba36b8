use super::{RecordingRuntime, ScriptedVm};
use context::{BlockContext, ChainParams, Message, StaticChainParams};
use database::{InMemoryKeeper, MemoryKvStore};
use database_interface::{Keeper, KvStore};
use handler::Evm;
use primitives::{hardfork::SpecId, Address, Bytes, B256, U256, ASPECT_NATIVE_CONTRACT_ADDRESS};
use state::AccountInfo;

/// Chain ID of the test chain.
pub const TEST_CHAIN_ID: u64 = 9000;

/// Block gas limit of the test chain.
pub const TEST_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Gas limit of the messages built by [`call`] and [`native_call`].
pub const TEST_GAS_LIMIT: u64 = 1_000_000;

/// Engine over in-memory state with the scripted engine and the recording runtime.
pub type TestEvm<K = InMemoryKeeper, S = MemoryKvStore> =
    Evm<K, S, ScriptedVm, RecordingRuntime, StaticChainParams>;

/// Chain parameters of the test chain under `spec`.
pub fn test_params(spec: SpecId) -> StaticChainParams {
    StaticChainParams {
        params: ChainParams::default(),
        chain_id: TEST_CHAIN_ID,
        spec,
        block_gas_limit: TEST_BLOCK_GAS_LIMIT,
        base_fee: U256::ZERO,
    }
}

/// Creates a Cancun engine over `keeper` with an empty aspect registry.
pub fn test_evm<K: Keeper>(keeper: K) -> TestEvm<K> {
    test_evm_with_store(keeper, MemoryKvStore::new())
}

/// Creates a Cancun engine over `keeper` and the aspect registry backing `store`.
pub fn test_evm_with_store<K: Keeper, S: KvStore>(keeper: K, store: S) -> TestEvm<K, S> {
    Evm::new(
        keeper,
        store,
        ScriptedVm::new(),
        RecordingRuntime::new(),
        test_params(SpecId::CANCUN),
    )
}

/// In-memory state with funded accounts.
pub fn funded_keeper(accounts: &[(Address, U256)]) -> InMemoryKeeper {
    let mut keeper = InMemoryKeeper::default();
    for (address, balance) in accounts {
        keeper.insert_account(*address, AccountInfo::default().with_balance(*balance));
    }
    keeper
}

/// Header of block `height`.
pub fn test_block(height: u64) -> BlockContext {
    BlockContext {
        height,
        time: 1_700_000_000 + height,
        hash: B256::with_last_byte(height as u8),
        parent_hash: B256::with_last_byte(height.saturating_sub(1) as u8),
        gas_limit: TEST_BLOCK_GAS_LIMIT,
        ..Default::default()
    }
}

/// A call from `from` with nonce `nonce`.
pub fn call(from: Address, to: Address, nonce: u64, data: impl Into<Bytes>) -> Message {
    Message {
        from,
        to: Some(to),
        nonce,
        gas_limit: TEST_GAS_LIMIT,
        data: data.into(),
        hash: B256::new((U256::from_be_slice(from.as_slice()) + U256::from(nonce)).to_be_bytes()),
        ..Default::default()
    }
}

/// A call into the aspect native contract.
pub fn native_call(from: Address, nonce: u64, input: Bytes) -> Message {
    call(from, ASPECT_NATIVE_CONTRACT_ADDRESS, nonce, input)
}
