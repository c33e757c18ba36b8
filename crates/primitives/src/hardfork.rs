//! Hardfork identifiers.
#![allow(non_camel_case_types)]

use core::str::FromStr;
pub use SpecId::*;

/// Specification IDs of the Ethereum rule sets the execution core understands.
///
/// Only forks that change behaviour of the state transition (intrinsic gas, access lists,
/// refunds, precompile set) are listed.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecId {
    /// Frontier hard fork
    FRONTIER = 0,
    /// Homestead hard fork
    HOMESTEAD,
    /// Byzantium hard fork
    BYZANTIUM,
    /// Istanbul hard fork
    ISTANBUL,
    /// Berlin hard fork
    BERLIN,
    /// London hard fork
    LONDON,
    /// Paris/Merge hard fork
    MERGE,
    /// Shanghai hard fork
    SHANGHAI,
    /// Cancun hard fork
    #[default]
    CANCUN,
}

impl SpecId {
    /// Returns `true` if the given specification ID is enabled in this spec.
    #[inline]
    pub const fn is_enabled_in(self, other: Self) -> bool {
        self as u8 >= other as u8
    }

    /// Number of precompiled contracts active under this spec. Precompiles occupy the
    /// addresses `0x01..=count`.
    #[inline]
    pub const fn precompile_count(self) -> u8 {
        match self {
            FRONTIER | HOMESTEAD => 4,
            BYZANTIUM => 8,
            ISTANBUL | BERLIN | LONDON | MERGE | SHANGHAI => 9,
            CANCUN => 10,
        }
    }
}

/// String identifiers for hardforks.
pub mod name {
    /// String identifier for the Frontier hardfork
    pub const FRONTIER: &str = "Frontier";
    /// String identifier for the Homestead hardfork
    pub const HOMESTEAD: &str = "Homestead";
    /// String identifier for the Byzantium hardfork
    pub const BYZANTIUM: &str = "Byzantium";
    /// String identifier for the Istanbul hardfork
    pub const ISTANBUL: &str = "Istanbul";
    /// String identifier for the Berlin hardfork
    pub const BERLIN: &str = "Berlin";
    /// String identifier for the London hardfork
    pub const LONDON: &str = "London";
    /// String identifier for the Paris/Merge hardfork
    pub const MERGE: &str = "Merge";
    /// String identifier for the Shanghai hardfork
    pub const SHANGHAI: &str = "Shanghai";
    /// String identifier for the Cancun hardfork
    pub const CANCUN: &str = "Cancun";
}

/// Error type for unknown hardfork names. Returned by [`SpecId::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnknownHardfork;

impl FromStr for SpecId {
    type Err = UnknownHardfork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            name::FRONTIER => Ok(Self::FRONTIER),
            name::HOMESTEAD => Ok(Self::HOMESTEAD),
            name::BYZANTIUM => Ok(Self::BYZANTIUM),
            name::ISTANBUL => Ok(Self::ISTANBUL),
            name::BERLIN => Ok(Self::BERLIN),
            name::LONDON => Ok(Self::LONDON),
            name::MERGE => Ok(Self::MERGE),
            name::SHANGHAI => Ok(Self::SHANGHAI),
            name::CANCUN => Ok(Self::CANCUN),
            _ => Err(UnknownHardfork),
        }
    }
}

impl From<SpecId> for &'static str {
    fn from(spec_id: SpecId) -> Self {
        match spec_id {
            FRONTIER => name::FRONTIER,
            HOMESTEAD => name::HOMESTEAD,
            BYZANTIUM => name::BYZANTIUM,
            ISTANBUL => name::ISTANBUL,
            BERLIN => name::BERLIN,
            LONDON => name::LONDON,
            MERGE => name::MERGE,
            SHANGHAI => name::SHANGHAI,
            CANCUN => name::CANCUN,
        }
    }
}

impl core::fmt::Display for SpecId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str((*self).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forks_are_ordered() {
        assert!(LONDON.is_enabled_in(BERLIN));
        assert!(!BERLIN.is_enabled_in(LONDON));
        assert!(CANCUN.is_enabled_in(CANCUN));
    }

    #[test]
    fn name_roundtrip() {
        for spec in [
            FRONTIER, HOMESTEAD, BYZANTIUM, ISTANBUL, BERLIN, LONDON, MERGE, SHANGHAI, CANCUN,
        ] {
            let name: &'static str = spec.into();
            assert_eq!(SpecId::from_str(name), Ok(spec));
        }
        assert_eq!(SpecId::from_str("Osaka"), Err(UnknownHardfork));
    }
}
