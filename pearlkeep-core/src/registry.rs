//! The pearl registry — keyed store of records plus the derived
//! entity-id → record-id index.
//!
//! The index is a cache, never a source of truth: it is rebuilt from the
//! record map on load and updated atomically with every insert/removal.
//! At most one record maps to any live entity id at a time.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use tracing::warn;

use crate::types::{BlockPos, EntityId, PearlId, PearlRecord, PearlStatus, Vec3};

/// Keyed store of pearl records with a derived live-entity index.
#[derive(Debug, Default)]
pub struct PearlRegistry {
    records: HashMap<PearlId, PearlRecord>,
    entity_index: HashMap<EntityId, PearlId>,
}

impl PearlRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a loaded record map, rebuilding the entity
    /// index from scratch.
    ///
    /// If two records claim the same entity id (possible only with a
    /// hand-edited state file), the younger record keeps the link and the
    /// older one is unlinked.
    #[must_use]
    pub fn from_records(records: HashMap<PearlId, PearlRecord>) -> Self {
        let mut registry = Self {
            records,
            entity_index: HashMap::new(),
        };
        let mut claims: Vec<(EntityId, PearlId)> = registry
            .records
            .iter()
            .filter_map(|(id, record)| record.entity_id.map(|e| (e, id.clone())))
            .collect();
        // Deterministic winner regardless of map iteration order.
        claims.sort_by(|a, b| {
            let created = |id: &PearlId| registry.records[id].created_at;
            created(&a.1).cmp(&created(&b.1)).then_with(|| a.1.as_str().cmp(b.1.as_str()))
        });
        for (entity, id) in claims {
            if let Some(stale) = registry.entity_index.insert(entity, id) {
                warn!(%entity, record = %stale, "duplicate entity link in state file; unlinking older record");
                if let Some(record) = registry.records.get_mut(&stale) {
                    record.entity_id = None;
                }
            }
        }
        registry
    }

    /// Insert (or replace) a record, keeping the entity index consistent.
    ///
    /// A conflicting index entry for the record's entity id is evicted and
    /// the stale record's entity link cleared.
    pub fn insert(&mut self, id: PearlId, record: PearlRecord) {
        if let Some(entity) = record.entity_id {
            if let Some(stale) = self.entity_index.insert(entity, id.clone()) {
                if stale != id {
                    warn!(%entity, record = %stale, "entity id re-used; unlinking stale record");
                    if let Some(old) = self.records.get_mut(&stale) {
                        old.entity_id = None;
                    }
                }
            }
        }
        self.records.insert(id, record);
    }

    /// Remove a record, dropping its index entry.
    pub fn remove(&mut self, id: &PearlId) -> Option<PearlRecord> {
        let record = self.records.remove(id)?;
        if let Some(entity) = record.entity_id {
            if self.entity_index.get(&entity) == Some(id) {
                self.entity_index.remove(&entity);
            }
        }
        Some(record)
    }

    /// Drop a record's live-entity link, keeping the record itself.
    ///
    /// Used when a settled pearl's entity unloads: the record survives,
    /// the ephemeral link does not.
    pub fn unlink_entity(&mut self, id: &PearlId) {
        if let Some(record) = self.records.get_mut(id) {
            if let Some(entity) = record.entity_id.take() {
                if self.entity_index.get(&entity) == Some(id) {
                    self.entity_index.remove(&entity);
                }
            }
        }
    }

    /// Record id currently linked to a live entity id.
    #[must_use]
    pub fn id_for_entity(&self, entity: EntityId) -> Option<&PearlId> {
        self.entity_index.get(&entity)
    }

    /// Look up a record.
    #[must_use]
    pub fn get(&self, id: &PearlId) -> Option<&PearlRecord> {
        self.records.get(id)
    }

    /// Look up a record mutably.
    ///
    /// Position/timestamp mutations through this handle do not touch the
    /// entity link, so the index stays valid; link changes must go through
    /// [`Self::insert`] / [`Self::unlink_entity`].
    pub fn get_mut(&mut self, id: &PearlId) -> Option<&mut PearlRecord> {
        self.records.get_mut(id)
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = (&PearlId, &PearlRecord)> {
        self.records.iter()
    }

    /// Number of tracked records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All record ids, collected. Used by passes that mutate while walking.
    #[must_use]
    pub fn ids(&self) -> Vec<PearlId> {
        self.records.keys().cloned().collect()
    }

    /// Clone of the record map, for persistence snapshots.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<PearlId, PearlRecord> {
        self.records.clone()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of settled pearls owned by `owner`.
    #[must_use]
    pub fn count_for_owner(&self, owner: &str) -> usize {
        self.records
            .values()
            .filter(|r| r.status == PearlStatus::Stasis && r.owner == owner)
            .count()
    }

    /// The settled pearl owned by `owner` nearest to `from`, by squared
    /// distance.
    #[must_use]
    pub fn nearest_settled(&self, owner: &str, from: Vec3) -> Option<(PearlId, BlockPos)> {
        self.records
            .iter()
            .filter(|(_, r)| r.status == PearlStatus::Stasis && r.owner == owner)
            .min_by_key(|(_, r)| OrderedFloat(r.pos.distance_sq(from)))
            .map(|(id, r)| (id.clone(), r.pos.floor()))
    }
}
