//! Aspect binding metadata.
use core::cmp::Ordering;
use primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// One aspect bound to a contract or an account.
///
/// Bindings are ordered by priority, then by aspect id. This is the order hooks run in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectMeta {
    /// Aspect id.
    pub id: Address,
    /// Bound version.
    pub version: U256,
    /// Hook priority, lower runs first.
    pub priority: i64,
}

impl AspectMeta {
    /// Creates a binding.
    pub const fn new(id: Address, version: U256, priority: i64) -> Self {
        Self {
            id,
            version,
            priority,
        }
    }
}

impl Ord for AspectMeta {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for AspectMeta {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
