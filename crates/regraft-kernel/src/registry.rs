//! Per-module upgrade registry.
//!
//! Remembers, per top-level name, every identity that was ever bound
//! to that name across reload generations. Membership is weak, so it
//! never extends an object's lifetime. An object created at generation
//! N and kept alive only by some long-lived holder can still be found
//! and upgraded at generation N+2, even though the module's current
//! namespace no longer references it.

use indexmap::IndexMap;
use tracing::debug;

use crate::entity::{Entity, WeakEntity};

/// Weak, cross-generation record of every identity ever bound to each
/// top-level name of one module.
#[derive(Default)]
pub struct UpgradeRegistry {
    entries: IndexMap<String, Vec<WeakEntity>>,
}

impl UpgradeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entity` under `name`.
    ///
    /// Membership only ever grows, deduplicated by identity. Returns
    /// false when the entity has no identity to hold (opaque data) or
    /// was already recorded.
    pub fn record(&mut self, name: &str, entity: &Entity) -> bool {
        let Some(weak) = entity.downgrade() else {
            return false;
        };

        let set = self.entries.entry(name.to_string()).or_default();
        let already = set
            .iter()
            .filter_map(WeakEntity::upgrade)
            .any(|e| e.same_identity(entity));
        if already {
            return false;
        }

        debug!(name, kind = entity.kind(), "recording historical identity");
        set.push(weak);
        true
    }

    /// Names with at least one recorded identity.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Every still-alive historical identity recorded under `name`.
    /// Dead entries are skipped; reclamation is left to the allocator.
    pub fn live(&self, name: &str) -> Vec<Entity> {
        self.entries
            .get(name)
            .map(|set| set.iter().filter_map(WeakEntity::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of tracked names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any name is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded identities under `name`, dead ones included.
    pub fn tracked(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, Vec::len)
    }
}
