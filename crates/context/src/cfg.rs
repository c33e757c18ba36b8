//! Chain parameters and the per-block EVM configuration built from them.
use auto_impl::auto_impl;
use primitives::{hardfork::SpecId, Address, U256, DEFAULT_ASPECT_VERIFICATION_GAS};

/// EVM configuration of the block being executed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EvmConfig {
    /// Chain ID of the EVM. Used in CHAINID opcode.
    pub chain_id: u64,
    /// Active hardfork.
    pub spec: SpecId,
    /// Beneficiary of the block fees.
    pub coinbase: Address,
    /// Base fee per gas, `None` before London.
    pub base_fee: Option<U256>,
    /// Gas limit of the block.
    pub block_gas_limit: u64,
}

impl EvmConfig {
    /// Builds the configuration for a block from the chain parameter provider.
    pub fn from_provider<P: ChainParamsProvider + ?Sized>(
        provider: &P,
        height: u64,
        coinbase: Address,
    ) -> Self {
        let spec = provider.spec(height);
        Self {
            chain_id: provider.chain_id(),
            spec,
            coinbase,
            base_fee: spec
                .is_enabled_in(SpecId::LONDON)
                .then(|| provider.base_fee(height)),
            block_gas_limit: provider.block_gas_limit(),
        }
    }

    /// Returns true if `spec` is active.
    #[inline]
    pub fn is_enabled(&self, spec: SpecId) -> bool {
        self.spec.is_enabled_in(spec)
    }
}

/// A fraction `numerator / denominator`, used for governance-set multipliers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ratio {
    /// Numerator.
    pub numerator: u64,
    /// Denominator, never zero in a valid ratio.
    pub denominator: u64,
}

impl Ratio {
    /// Creates a ratio.
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Returns true if the ratio is within `[0, 1]` and well formed.
    pub const fn is_valid(&self) -> bool {
        self.denominator != 0 && self.numerator <= self.denominator
    }

    /// Returns `value * self`, truncated. `None` if the ratio is malformed.
    pub fn apply_to(&self, value: u64) -> Option<u64> {
        if self.denominator == 0 {
            return None;
        }
        let product = value as u128 * self.numerator as u128 / self.denominator as u128;
        u64::try_from(product).ok()
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::new(1, 2)
    }
}

/// Governance-controlled parameters of the EVM module.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainParams {
    /// Contract creation is allowed.
    pub enable_create: bool,
    /// Plain calls are allowed.
    pub enable_call: bool,
    /// Lower bound of gas used, as a fraction of the gas limit.
    pub min_gas_multiplier: Ratio,
    /// Extra EIPs activated on top of the hardfork.
    pub extra_eips: Vec<u64>,
    /// Gas surcharged to messages authorized by an aspect instead of a signature.
    pub aspect_verification_gas: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            enable_create: true,
            enable_call: true,
            min_gas_multiplier: Ratio::default(),
            extra_eips: Vec::new(),
            aspect_verification_gas: DEFAULT_ASPECT_VERIFICATION_GAS,
        }
    }
}

/// Supplier of chain parameters and fork activation.
#[auto_impl(&, &mut, Box, Arc)]
pub trait ChainParamsProvider {
    /// Current governance parameters.
    fn params(&self) -> ChainParams;

    /// Chain ID.
    fn chain_id(&self) -> u64;

    /// Hardfork active at `height`.
    fn spec(&self, height: u64) -> SpecId;

    /// Gas limit of a block.
    fn block_gas_limit(&self) -> u64;

    /// Base fee of the block at `height`.
    fn base_fee(&self, _height: u64) -> U256 {
        U256::ZERO
    }
}

/// A [`ChainParamsProvider`] with fixed values.
#[derive(Clone, Debug, Default)]
pub struct StaticChainParams {
    /// Governance parameters.
    pub params: ChainParams,
    /// Chain ID.
    pub chain_id: u64,
    /// Hardfork, active at every height.
    pub spec: SpecId,
    /// Block gas limit.
    pub block_gas_limit: u64,
    /// Base fee.
    pub base_fee: U256,
}

impl ChainParamsProvider for StaticChainParams {
    fn params(&self) -> ChainParams {
        self.params.clone()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn spec(&self, _height: u64) -> SpecId {
        self.spec
    }

    fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    fn base_fee(&self, _height: u64) -> U256 {
        self.base_fee
    }
}
