use aspect::{abi::IAspectNative, JoinPoint};
use alloy_sol_types::SolCall;
use primitives::{Address, Bytes, U256};

/// Module code the test runtime accepts.
pub const TEST_ASPECT_CODE: &[u8] = b"\0asm-test-aspect";

/// A property of a deployed aspect.
pub fn property(key: &str, value: &str) -> IAspectNative::KVPair {
    IAspectNative::KVPair {
        key: Bytes::copy_from_slice(key.as_bytes()),
        value: Bytes::copy_from_slice(value.as_bytes()),
    }
}

/// Input of `deploy` by `account`, without init data.
pub fn deploy_input(
    account: Address,
    join_points: JoinPoint,
    properties: Vec<IAspectNative::KVPair>,
) -> Bytes {
    IAspectNative::deployCall {
        code: Bytes::from_static(TEST_ASPECT_CODE),
        initdata: Bytes::new(),
        properties,
        account,
        proof: Bytes::new(),
        joinPoints: U256::from(join_points.bits()),
    }
    .abi_encode()
    .into()
}

/// Input of `upgrade`.
pub fn upgrade_input(aspect_id: Address, join_points: JoinPoint) -> Bytes {
    IAspectNative::upgradeCall {
        aspectId: aspect_id,
        code: Bytes::from_static(TEST_ASPECT_CODE),
        properties: Vec::new(),
        joinPoints: U256::from(join_points.bits()),
    }
    .abi_encode()
    .into()
}

/// Input of `bind` to the latest version.
pub fn bind_input(aspect_id: Address, target: Address, priority: i8) -> Bytes {
    IAspectNative::bindCall {
        aspectId: aspect_id,
        aspectVersion: U256::ZERO,
        contractAddr: target,
        priority,
    }
    .abi_encode()
    .into()
}

/// Input of `unbind`.
pub fn unbind_input(aspect_id: Address, target: Address) -> Bytes {
    IAspectNative::unbindCall {
        aspectId: aspect_id,
        contractAddr: target,
    }
    .abi_encode()
    .into()
}

/// Input of `entrypoint`.
pub fn entrypoint_input(aspect_id: Address, args: Bytes) -> Bytes {
    IAspectNative::entrypointCall {
        aspectId: aspect_id,
        optArgs: args,
    }
    .abi_encode()
    .into()
}
