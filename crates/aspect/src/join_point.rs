//! Join points: the lifecycle hooks an aspect can take part in.
use bitflags::bitflags;
use core::fmt;
use primitives::U256;

bitflags! {
    /// Set of join points declared by an aspect version.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct JoinPoint: u64 {
        /// Authorizes a transaction instead of its signature.
        const VERIFY_TX = 1 << 0;
        /// Before the top-level call of a transaction.
        const PRE_TX_EXECUTE = 1 << 1;
        /// Before every call into the bound contract.
        const PRE_CONTRACT_CALL = 1 << 2;
        /// After every call into the bound contract.
        const POST_CONTRACT_CALL = 1 << 3;
        /// After the top-level call of a transaction.
        const POST_TX_EXECUTE = 1 << 4;
        /// After the transaction was committed.
        const POST_TX_COMMIT = 1 << 5;
        /// Direct invocation through the native contract entrypoint.
        const OPERATION = 1 << 6;
        /// When a block begins.
        const ON_BLOCK_INITIALIZE = 1 << 7;
        /// When a block ends.
        const ON_BLOCK_FINALIZE = 1 << 8;

        /// Block-level join points.
        const BLOCK_LEVEL = Self::ON_BLOCK_INITIALIZE.bits() | Self::ON_BLOCK_FINALIZE.bits();
        /// Transaction-level join points.
        const TX_LEVEL = Self::PRE_TX_EXECUTE.bits()
            | Self::PRE_CONTRACT_CALL.bits()
            | Self::POST_CONTRACT_CALL.bits()
            | Self::POST_TX_EXECUTE.bits()
            | Self::POST_TX_COMMIT.bits();
        /// Transaction verifier join points.
        const VERIFIER = Self::VERIFY_TX.bits();
    }
}

/// Error returned when a join point mask carries undefined bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid join point mask {0:#x}")]
pub struct InvalidJoinPoint(pub U256);

impl JoinPoint {
    /// Parses the ABI `uint256` mask. Undefined bits are rejected.
    pub fn from_u256(mask: U256) -> Result<Self, InvalidJoinPoint> {
        u64::try_from(mask)
            .ok()
            .and_then(Self::from_bits)
            .ok_or(InvalidJoinPoint(mask))
    }

    /// Returns true if any block-level join point is set.
    #[inline]
    pub fn is_block_level(self) -> bool {
        self.intersects(Self::BLOCK_LEVEL)
    }

    /// Returns true if any transaction-level join point is set.
    #[inline]
    pub fn is_tx_level(self) -> bool {
        self.intersects(Self::TX_LEVEL)
    }

    /// Returns true if the verifier join point is set.
    #[inline]
    pub fn is_verifier(self) -> bool {
        self.intersects(Self::VERIFIER)
    }

    /// Returns true if `kind` is part of the set.
    #[inline]
    pub fn has(self, kind: JoinPointKind) -> bool {
        self.contains(kind.flag())
    }
}

/// A single join point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinPointKind {
    /// `verifyTx`
    VerifyTx,
    /// `preTxExecute`
    PreTxExecute,
    /// `preContractCall`
    PreContractCall,
    /// `postContractCall`
    PostContractCall,
    /// `postTxExecute`
    PostTxExecute,
    /// `postTxCommit`
    PostTxCommit,
    /// `operation`
    Operation,
    /// `onBlockInitialize`
    OnBlockInitialize,
    /// `onBlockFinalize`
    OnBlockFinalize,
}

impl JoinPointKind {
    /// Flag of this join point.
    pub const fn flag(self) -> JoinPoint {
        match self {
            Self::VerifyTx => JoinPoint::VERIFY_TX,
            Self::PreTxExecute => JoinPoint::PRE_TX_EXECUTE,
            Self::PreContractCall => JoinPoint::PRE_CONTRACT_CALL,
            Self::PostContractCall => JoinPoint::POST_CONTRACT_CALL,
            Self::PostTxExecute => JoinPoint::POST_TX_EXECUTE,
            Self::PostTxCommit => JoinPoint::POST_TX_COMMIT,
            Self::Operation => JoinPoint::OPERATION,
            Self::OnBlockInitialize => JoinPoint::ON_BLOCK_INITIALIZE,
            Self::OnBlockFinalize => JoinPoint::ON_BLOCK_FINALIZE,
        }
    }

    /// Name of the hook in the aspect module.
    pub const fn name(self) -> &'static str {
        match self {
            Self::VerifyTx => "verifyTx",
            Self::PreTxExecute => "preTxExecute",
            Self::PreContractCall => "preContractCall",
            Self::PostContractCall => "postContractCall",
            Self::PostTxExecute => "postTxExecute",
            Self::PostTxCommit => "postTxCommit",
            Self::Operation => "operation",
            Self::OnBlockInitialize => "onBlockInitialize",
            Self::OnBlockFinalize => "onBlockFinalize",
        }
    }
}

impl fmt::Display for JoinPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
