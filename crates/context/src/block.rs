//! Block-scoped context.
use primitives::{Address, B256, U256};

/// Misbehavior reported by consensus for the current block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evidence {
    /// Kind of misbehavior, as reported by consensus.
    pub kind: String,
    /// Offending validator.
    pub validator: Address,
    /// Height the misbehavior happened at.
    pub height: u64,
    /// Voting power of the validator.
    pub power: i64,
}

/// A vote of the previous block's commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteInfo {
    /// Voting validator.
    pub validator: Address,
    /// Voting power.
    pub power: i64,
    /// The validator signed the last block.
    pub signed_last_block: bool,
}

/// Commit information of the previous block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastCommitInfo {
    /// Consensus round of the commit.
    pub round: i32,
    /// Votes of the commit.
    pub votes: Vec<VoteInfo>,
}

/// Header and consensus information of the block being executed.
///
/// Set once when the block begins and cleared when it ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number.
    pub height: u64,
    /// Block timestamp in seconds.
    pub time: u64,
    /// Proposer of the block.
    pub proposer: Address,
    /// Hash of the block.
    pub hash: B256,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Base fee of the block.
    pub base_fee: U256,
    /// Misbehavior evidence.
    pub evidence: Vec<Evidence>,
    /// Last commit information.
    pub last_commit: LastCommitInfo,
}
