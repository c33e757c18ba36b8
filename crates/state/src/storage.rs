use primitives::{StorageKey, StorageValue};
use std::collections::BTreeMap;

/// Per-account slot overlay.
///
/// Ordered by slot so that flushing to the keeper is deterministic.
pub type Storage = BTreeMap<StorageKey, StorageValue>;
