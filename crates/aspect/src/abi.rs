//! ABI of the aspect native contract and of the ownership checks.
#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// Methods of the aspect native contract.
    #[sol(all_derives)]
    interface IAspectNative {
        struct KVPair {
            bytes key;
            bytes value;
        }

        struct AspectBoundInfo {
            address aspectId;
            uint64 version;
            int8 priority;
        }

        function deploy(
            bytes code,
            bytes initdata,
            KVPair[] properties,
            address account,
            bytes proof,
            uint256 joinPoints
        ) external;
        function upgrade(
            address aspectId,
            bytes code,
            KVPair[] properties,
            uint256 joinPoints
        ) external;
        function bind(
            address aspectId,
            uint256 aspectVersion,
            address contractAddr,
            int8 priority
        ) external;
        function unbind(address aspectId, address contractAddr) external;
        function changeVersion(address aspectId, address contractAddr, uint64 version) external;
        function versionOf(address aspectId) external view returns (uint64 version);
        function aspectsOf(address contractAddr)
            external
            view
            returns (AspectBoundInfo[] aspectBoundInfo);
        function boundAddressesOf(address aspectId) external view returns (address[] account);
        function entrypoint(address aspectId, bytes optArgs) external returns (bytes resultMap);
    }

    /// Ownership checks a bound contract is expected to answer.
    #[sol(all_derives)]
    interface IOwnable {
        function isOwner(address sender) external view returns (bool);
        function owner() external view returns (address);
    }
}
