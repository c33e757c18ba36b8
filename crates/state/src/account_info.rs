use core::hash::{Hash, Hasher};
use primitives::{keccak256, Bytes, B256, KECCAK_EMPTY, U256};

/// Consensus account record: balance, nonce and code hash.
///
/// Code itself is stored separately by the keeper, indexed by `code_hash`.
#[derive(Clone, Debug, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountInfo {
    /// Account balance
    pub balance: U256,
    /// Account nonce
    pub nonce: u64,
    /// code hash
    pub code_hash: B256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::ZERO,
            nonce: 0,
            code_hash: KECCAK_EMPTY,
        }
    }
}

impl PartialEq for AccountInfo {
    fn eq(&self, other: &Self) -> bool {
        self.balance == other.balance
            && self.nonce == other.nonce
            && self.code_hash == other.code_hash
    }
}

impl Hash for AccountInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.balance.hash(state);
        self.nonce.hash(state);
        self.code_hash.hash(state);
    }
}

impl AccountInfo {
    /// Creates a new [`AccountInfo`] with the given fields.
    #[inline]
    pub fn new(balance: U256, nonce: u64, code_hash: B256) -> Self {
        Self {
            balance,
            nonce,
            code_hash,
        }
    }

    /// Creates a new [`AccountInfo`] with the given balance.
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    /// Creates a new [`AccountInfo`] with the given nonce.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Creates a new [`AccountInfo`] whose code hash is computed from `code`.
    pub fn with_code(mut self, code: &Bytes) -> Self {
        self.code_hash = code_hash(code);
        self
    }

    /// Returns `true` if the account has code.
    #[inline]
    pub fn has_code(&self) -> bool {
        !(self.code_hash == KECCAK_EMPTY || self.code_hash.is_zero())
    }

    /// Returns true if the account is "empty" as defined by
    /// [EIP-161](https://eips.ethereum.org/EIPS/eip-161): zero nonce, zero balance and no code.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.has_code() && self.balance.is_zero() && self.nonce == 0
    }
}

/// Hash of a code blob. Empty code hashes to [`KECCAK_EMPTY`].
#[inline]
pub fn code_hash(code: &[u8]) -> B256 {
    if code.is_empty() {
        KECCAK_EMPTY
    } else {
        keccak256(code)
    }
}
