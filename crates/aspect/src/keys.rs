//! Byte layout of the aspect store.
//!
//! Keys are a prefix followed by `/`-terminated segments. Addresses are raw 20-byte segments
//! and versions are minimal big-endian integers, zero being the empty segment.
use primitives::{Address, U256};

/// Code by aspect id and version.
pub const CODE_KEY_PREFIX: &[u8] = b"AspectStore/Code/";
/// Latest version by aspect id.
pub const VERSION_KEY_PREFIX: &[u8] = b"AspectStore/Version/";
/// Property by aspect id and property key.
pub const PROPERTY_KEY_PREFIX: &[u8] = b"AspectStore/Property/";
/// Contract binding list by contract.
pub const CONTRACT_BIND_KEY_PREFIX: &[u8] = b"AspectStore/ContractBind/";
/// Verifier binding list by account.
pub const VERIFIER_BIND_KEY_PREFIX: &[u8] = b"AspectStore/VerifierBind/";
/// Bound addresses by aspect id.
pub const ASPECT_REF_KEY_PREFIX: &[u8] = b"AspectStore/AspectRef/";
/// Block-level registrations.
pub const BLOCK_KEY_PREFIX: &[u8] = b"AspectStore/Block/";
/// Key of the block-level registration map under [`BLOCK_KEY_PREFIX`].
pub const ASPECT_BLOCK_KEY: &[u8] = b"AspectBlock/";
/// Aspect state by aspect id, contract and key.
pub const STATE_KEY_PREFIX: &[u8] = b"AspectStore/State/";
/// Join point mask by aspect id and version.
pub const JOIN_POINT_KEY_PREFIX: &[u8] = b"AspectStore/JoinPoint/";

/// Reserved property key holding the deployer account.
pub const ACCOUNT_PROPERTY_KEY: &str = "Aspect_@Acount@_";
/// Reserved property key holding the deployment proof.
pub const PROOF_PROPERTY_KEY: &str = "Aspect_@Proof@_";

/// Returns true if `key` may not be set through a user supplied property list.
pub fn is_reserved_property(key: &[u8]) -> bool {
    key == ACCOUNT_PROPERTY_KEY.as_bytes() || key == PROOF_PROPERTY_KEY.as_bytes()
}

/// Minimal big-endian bytes of a version.
pub fn version_bytes(version: U256) -> Vec<u8> {
    version.to_be_bytes_trimmed_vec()
}

fn key(prefix: &[u8], segments: &[&[u8]]) -> Vec<u8> {
    let len = prefix.len() + segments.iter().map(|s| s.len() + 1).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.extend_from_slice(prefix);
    for segment in segments {
        key.extend_from_slice(segment);
        key.push(b'/');
    }
    key
}

/// `AspectStore/Code/<id>/<version>/`
pub fn code_key(id: Address, version: U256) -> Vec<u8> {
    key(CODE_KEY_PREFIX, &[id.as_slice(), &version_bytes(version)])
}

/// `AspectStore/Version/<id>/`
pub fn version_key(id: Address) -> Vec<u8> {
    key(VERSION_KEY_PREFIX, &[id.as_slice()])
}

/// `AspectStore/Property/<id>/<key>/`
pub fn property_key(id: Address, property: &[u8]) -> Vec<u8> {
    key(PROPERTY_KEY_PREFIX, &[id.as_slice(), property])
}

/// `AspectStore/ContractBind/<contract>/`
pub fn contract_bind_key(contract: Address) -> Vec<u8> {
    key(CONTRACT_BIND_KEY_PREFIX, &[contract.as_slice()])
}

/// `AspectStore/VerifierBind/<account>/`
pub fn verifier_bind_key(account: Address) -> Vec<u8> {
    key(VERIFIER_BIND_KEY_PREFIX, &[account.as_slice()])
}

/// `AspectStore/AspectRef/<id>/`
pub fn aspect_ref_key(id: Address) -> Vec<u8> {
    key(ASPECT_REF_KEY_PREFIX, &[id.as_slice()])
}

/// `AspectStore/Block/AspectBlock/`
pub fn block_key() -> Vec<u8> {
    [BLOCK_KEY_PREFIX, ASPECT_BLOCK_KEY].concat()
}

/// `AspectStore/State/<id>/<contract>/<key>/`
pub fn state_key(id: Address, contract: Address, state: &[u8]) -> Vec<u8> {
    key(STATE_KEY_PREFIX, &[id.as_slice(), contract.as_slice(), state])
}

/// `AspectStore/JoinPoint/<id>/<version>/`
pub fn join_point_key(id: Address, version: U256) -> Vec<u8> {
    key(JOIN_POINT_KEY_PREFIX, &[id.as_slice(), &version_bytes(version)])
}
