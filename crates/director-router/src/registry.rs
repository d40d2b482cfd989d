// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copy-on-write tier registry.
//!
//! The whole table lives behind an [`ArcSwap`]. Readers load an
//! `Arc` of the current table without locking and keep a consistent view for
//! as long as they hold it; writers clone the table, edit the clone, and swap
//! it in with `rcu`. A reader never observes a half-applied update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use director_core::{Capability, DirectorError, QualityTier, WorkerProfile};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Entry {
    profile: Arc<WorkerProfile>,
    /// Registration sequence number, the tie-break after priority.
    seq: u64,
}

/// Per-key entries, kept in selection order: priority descending, then
/// registration order ascending.
type TierTable = BTreeMap<Capability, BTreeMap<QualityTier, Vec<Entry>>>;

/// An immutable view of the registry at one instant.
///
/// The router takes one view per decision so that the tier list and the
/// candidates it walks come from the same table.
#[derive(Debug, Clone)]
pub struct RegistryView {
    table: Arc<TierTable>,
}

impl RegistryView {
    /// Registered tiers for `capability`, ascending.
    pub fn tiers(&self, capability: &Capability) -> Vec<QualityTier> {
        self.table
            .get(capability)
            .map(|tiers| tiers.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Profiles for the exact key, in selection order.
    pub fn candidates(
        &self,
        capability: &Capability,
        tier: QualityTier,
    ) -> Vec<Arc<WorkerProfile>> {
        self.entries(capability, tier)
            .iter()
            .map(|e| Arc::clone(&e.profile))
            .collect()
    }

    /// The active profile for the exact key.
    pub fn active(&self, capability: &Capability, tier: QualityTier) -> Option<Arc<WorkerProfile>> {
        self.entries(capability, tier)
            .first()
            .map(|e| Arc::clone(&e.profile))
    }

    fn entries(&self, capability: &Capability, tier: QualityTier) -> &[Entry] {
        self.table
            .get(capability)
            .and_then(|tiers| tiers.get(&tier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Maps (capability, tier) keys to worker profiles.
pub struct TierRegistry {
    table: ArcSwap<TierTable>,
    next_seq: AtomicU64,
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierRegistry")
            .field("profiles", &self.len())
            .finish()
    }
}

impl TierRegistry {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(TierTable::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Registry pre-populated from `(capability, tier, profile)` triples,
    /// registered in iteration order.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Capability, QualityTier, WorkerProfile)>,
    ) -> Self {
        let registry = Self::new();
        registry.replace_all(entries);
        registry
    }

    /// Current whole-table view.
    pub fn view(&self) -> RegistryView {
        RegistryView {
            table: self.table.load_full(),
        }
    }

    /// Insert a profile for `(capability, tier)`.
    ///
    /// A profile with the same `backend_id` under that key is replaced and
    /// keeps its original registration order. Never fails; concurrent writers
    /// are serialized by `rcu` and the last one wins.
    pub fn register(&self, capability: Capability, tier: QualityTier, profile: WorkerProfile) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let profile = Arc::new(profile);
        let mut replaced = false;

        self.table.rcu(|current| {
            let mut next = TierTable::clone(current);
            replaced = insert_entry(&mut next, &capability, tier, Arc::clone(&profile), seq);
            next
        });

        if replaced {
            info!(
                capability = %capability,
                tier = %tier,
                backend = profile.backend_id.as_str(),
                cost = profile.resource_cost,
                "worker profile updated"
            );
        } else {
            debug!(
                capability = %capability,
                tier = %tier,
                backend = profile.backend_id.as_str(),
                "worker profile registered"
            );
        }
    }

    /// Remove the profile with `backend_id` from the key. Returns whether
    /// anything was removed. Empty keys disappear from [`list_tiers`].
    ///
    /// [`list_tiers`]: TierRegistry::list_tiers
    pub fn deregister(&self, capability: &Capability, tier: QualityTier, backend_id: &str) -> bool {
        let mut removed = false;
        self.table.rcu(|current| {
            let mut next = TierTable::clone(current);
            removed = remove_entry(&mut next, capability, tier, backend_id);
            next
        });
        if removed {
            info!(capability = %capability, tier = %tier, backend = backend_id, "worker profile removed");
        }
        removed
    }

    /// Swap in a whole new table built from `entries`, atomically.
    ///
    /// Readers see either the old table or the new one. Used by config hot
    /// reload.
    pub fn replace_all(
        &self,
        entries: impl IntoIterator<Item = (Capability, QualityTier, WorkerProfile)>,
    ) {
        let mut next = TierTable::new();
        let mut count = 0usize;
        for (capability, tier, profile) in entries {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            insert_entry(&mut next, &capability, tier, Arc::new(profile), seq);
            count += 1;
        }
        self.table.store(Arc::new(next));
        info!(profiles = count, "tier registry replaced");
    }

    /// The active profile for the exact key.
    pub fn resolve(
        &self,
        capability: &Capability,
        tier: QualityTier,
    ) -> Result<Arc<WorkerProfile>, DirectorError> {
        self.view()
            .active(capability, tier)
            .ok_or_else(|| DirectorError::ProfileNotFound {
                capability: capability.clone(),
                tier,
            })
    }

    /// Every profile registered for the key, in selection order.
    pub fn candidates(&self, capability: &Capability, tier: QualityTier) -> Vec<Arc<WorkerProfile>> {
        self.view().candidates(capability, tier)
    }

    /// Registered tiers for `capability`, ascending. Empty when the
    /// capability is unknown.
    pub fn list_tiers(&self, capability: &Capability) -> Vec<QualityTier> {
        self.view().tiers(capability)
    }

    /// Every capability with at least one registered tier.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.table.load().keys().cloned().collect()
    }

    /// Total number of registered profiles.
    pub fn len(&self) -> usize {
        self.table
            .load()
            .values()
            .flat_map(|tiers| tiers.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }
}

/// Returns true when an entry with the same backend id was replaced.
fn insert_entry(
    table: &mut TierTable,
    capability: &Capability,
    tier: QualityTier,
    profile: Arc<WorkerProfile>,
    seq: u64,
) -> bool {
    let entries = table
        .entry(capability.clone())
        .or_default()
        .entry(tier)
        .or_default();

    let replaced = match entries
        .iter_mut()
        .find(|e| e.profile.backend_id == profile.backend_id)
    {
        Some(existing) => {
            existing.profile = profile;
            true
        }
        None => {
            entries.push(Entry { profile, seq });
            false
        }
    };
    entries.sort_by(|a, b| {
        b.profile
            .priority
            .cmp(&a.profile.priority)
            .then(a.seq.cmp(&b.seq))
    });
    replaced
}

fn remove_entry(
    table: &mut TierTable,
    capability: &Capability,
    tier: QualityTier,
    backend_id: &str,
) -> bool {
    let Some(tiers) = table.get_mut(capability) else {
        return false;
    };
    let Some(entries) = tiers.get_mut(&tier) else {
        return false;
    };
    let before = entries.len();
    entries.retain(|e| e.profile.backend_id != backend_id);
    let removed = entries.len() != before;

    if entries.is_empty() {
        tiers.remove(&tier);
    }
    if tiers.is_empty() {
        table.remove(capability);
    }
    removed
}
