//! The entity watcher: folds world events into pearl records.
//!
//! Consumes spawn/move/removed notifications plus the pull-based entity
//! snapshot (startup scan, reconciliation), filters through the pearl
//! classifier, and keeps the registry, trackers, and swing log current.
//! Both the event-driven path and the periodic reconciliation path are
//! idempotent keyed on entity id → record id; last-write-wins is
//! acceptable for position and timestamp fields.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use pearlkeep_core::attribution;
use pearlkeep_core::classify::EntityClassifier;
use pearlkeep_core::tracker::{self, MotionTracker};
use pearlkeep_core::types::{BlockPos, EntityId, PearlId, PearlRecord, PearlStatus, Vec3, UNKNOWN_OWNER};

use crate::events::WorldEvent;
use crate::state::BotState;
use crate::world::{EntitySnapshot, WorldClient};

/// Side effect of a promotion: who to tell, and what.
#[derive(Debug, Clone)]
pub struct PromotionNotice {
    /// Attributed owner at promotion time.
    pub owner: String,
    /// Snapped stasis coordinate.
    pub block: BlockPos,
    /// The owner's settled-pearl count after this promotion.
    pub count: usize,
}

/// Watches world entities and maintains the registry.
pub struct EntityWatcher<W> {
    world: Arc<W>,
    state: Arc<BotState>,
    classifier: Arc<dyn EntityClassifier>,
}

impl<W> Clone for EntityWatcher<W> {
    fn clone(&self) -> Self {
        Self {
            world: Arc::clone(&self.world),
            state: Arc::clone(&self.state),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<W: WorldClient> EntityWatcher<W> {
    /// Create a watcher over `world` with the given pearl classifier.
    pub fn new(world: Arc<W>, state: Arc<BotState>, classifier: Arc<dyn EntityClassifier>) -> Self {
        Self {
            world,
            state,
            classifier,
        }
    }

    /// Dispatch one world event.
    pub async fn handle_event(&self, event: WorldEvent, now: DateTime<Utc>) {
        match event {
            WorldEvent::EntitySpawned { id, kind, pos } => self.on_spawn(id, &kind, pos, now),
            WorldEvent::EntityMoved { id, pos } => self.on_move(id, pos, now).await,
            WorldEvent::EntityRemoved { id } => self.on_removed(id, now).await,
            WorldEvent::PlayerSwung { id } => self.on_swing(id, now),
        }
    }

    /// Scan the already-loaded entity set once at startup. Entities that
    /// were thrown before the bot connected never produce a spawn event.
    pub fn startup_scan(&self, now: DateTime<Utc>) {
        let entities = self.world.loaded_entities();
        let mut created = 0usize;
        for snap in &entities {
            if self.upsert_entity(snap, now) {
                created += 1;
            }
        }
        info!(scanned = entities.len(), created, "startup entity scan complete");
    }

    /// Upsert one snapshot entry. Returns `true` when a new record was
    /// created. Shared by the startup scan and the reconciliation loop.
    pub(crate) fn upsert_entity(&self, snap: &EntitySnapshot, now: DateTime<Utc>) -> bool {
        if !self.classifier.is_pearl(&snap.kind) {
            return false;
        }
        let existing = self.state.registry().id_for_entity(snap.id).cloned();
        match existing {
            Some(pearl_id) => {
                self.refresh_record(&pearl_id, snap.pos, now, true);
                false
            }
            None => {
                self.create_record(snap.id, snap.pos, now);
                true
            }
        }
    }

    fn on_spawn(&self, id: EntityId, kind: &str, pos: Vec3, now: DateTime<Utc>) {
        if !self.classifier.is_pearl(kind) {
            return;
        }
        let existing = self.state.registry().id_for_entity(id).cloned();
        if let Some(pearl_id) = existing {
            // Duplicate spawn for a tracked entity: refresh only.
            self.refresh_record(&pearl_id, pos, now, false);
        } else {
            self.create_record(id, pos, now);
        }
    }

    async fn on_move(&self, id: EntityId, pos: Vec3, now: DateTime<Utc>) {
        let Some(pearl_id) = self.state.registry().id_for_entity(id).cloned() else {
            return;
        };
        self.refresh_record(&pearl_id, pos, now, true);
        if let Some(notice) = self.evaluate_promotion(&pearl_id, now) {
            self.state.persist();
            self.send_notice(notice).await;
        }
    }

    async fn on_removed(&self, id: EntityId, now: DateTime<Utc>) {
        let Some(pearl_id) = self.state.registry().id_for_entity(id).cloned() else {
            return;
        };

        let was_settled = self
            .state
            .registry()
            .get(&pearl_id)
            .is_some_and(PearlRecord::is_settled);
        if was_settled {
            // The entity unloaded under a settled pearl: the record
            // outlives the ephemeral link.
            self.state.registry().unlink_entity(&pearl_id);
            self.state.trackers().remove(&pearl_id);
            self.state.persist();
            return;
        }

        // Last-chance promotion before giving up on the record. An entity
        // that sat still for the full window but was never re-evaluated
        // would otherwise be lost here.
        if let Some(notice) = self.evaluate_promotion(&pearl_id, now) {
            self.state.registry().unlink_entity(&pearl_id);
            self.state.trackers().remove(&pearl_id);
            self.state.persist();
            self.send_notice(notice).await;
        } else {
            let removed = self.state.registry().remove(&pearl_id);
            self.state.trackers().remove(&pearl_id);
            if let Some(mut record) = removed {
                record.status = PearlStatus::Gone;
                debug!(pearl = %pearl_id, owner = %record.owner, "pearl removed without settling");
            }
            self.state.persist();
        }
    }

    fn on_swing(&self, id: EntityId, now: DateTime<Utc>) {
        let Some(name) = self
            .world
            .players()
            .into_iter()
            .find(|p| p.entity_id == Some(id))
            .map(|p| p.name)
        else {
            return;
        };
        self.state.record_swing(&name, now);
    }

    /// Create a fresh record for a newly observed pearl entity, attribute
    /// it immediately, and schedule the one-shot delayed re-score.
    fn create_record(&self, id: EntityId, pos: Vec3, now: DateTime<Utc>) {
        let mut record = PearlRecord::new(id, pos, self.world.dimension(), now);
        if let Some(owner) = self.attribute_at(pos, now) {
            record.assign_owner(&owner);
        }
        let pearl_id = PearlId::derive(id, now);
        info!(pearl = %pearl_id, owner = %record.owner, %pos, "tracking new pearl");
        {
            let mut registry = self.state.registry();
            let mut trackers = self.state.trackers();
            registry.insert(pearl_id.clone(), record);
            trackers.insert(pearl_id.clone(), MotionTracker::new(now));
        }
        self.schedule_rescore(pearl_id);
        self.state.persist();
    }

    /// Refresh a tracked record from a new observation. `feed_sample`
    /// routes the observation through the stability tracker (move events
    /// and reconciliation; duplicate spawns refresh position only).
    fn refresh_record(&self, pearl_id: &PearlId, pos: Vec3, now: DateTime<Utc>, feed_sample: bool) {
        let mut registry = self.state.registry();
        let mut trackers = self.state.trackers();
        let Some(record) = registry.get_mut(pearl_id) else {
            return;
        };
        record.last_seen_at = now;
        if record.is_settled() {
            // Never overwrite the snapped coordinate.
            record.last_pos = Some(pos);
        } else {
            let prev = record.pos;
            if feed_sample {
                let tracker = trackers
                    .entry(pearl_id.clone())
                    .or_insert_with(|| MotionTracker::new(now));
                tracker.observe(prev, pos, now, &self.state.config.tracking);
            }
            if prev.distance(pos) > self.state.config.tracking.displacement_epsilon {
                record.last_move_at = now;
            }
            record.pos = pos;
        }
        if let Some(tracker) = trackers.get_mut(pearl_id) {
            tracker.mark_present();
        }
    }

    /// Run the promotion guard for one record and apply the transition
    /// when it passes. Returns the notification side effect, if any.
    pub(crate) fn evaluate_promotion(
        &self,
        pearl_id: &PearlId,
        now: DateTime<Utc>,
    ) -> Option<PromotionNotice> {
        let mut registry = self.state.registry();
        let trackers = self.state.trackers();
        let (owner, block) = {
            let tracker = trackers.get(pearl_id)?;
            let record = registry.get_mut(pearl_id)?;
            let block = tracker.settle_target(record, now, &self.state.config.tracking)?;
            tracker::promote(record, block);
            (record.owner.clone(), block)
        };
        let count = registry.count_for_owner(&owner);
        info!(pearl = %pearl_id, %owner, %block, "pearl settled into stasis");
        Some(PromotionNotice {
            owner,
            block,
            count,
        })
    }

    /// Whisper the owner about a fresh promotion. Suppressed while the
    /// owner is unresolved.
    pub(crate) async fn send_notice(&self, notice: PromotionNotice) {
        if notice.owner == UNKNOWN_OWNER {
            return;
        }
        let message = format!(
            "Pearl parked at {}. You now have {} in stasis.",
            notice.block, notice.count
        );
        if let Err(err) = self.world.whisper(&notice.owner, &message).await {
            warn!(%err, owner = %notice.owner, "promotion whisper failed");
        }
    }

    fn attribute_at(&self, pos: Vec3, now: DateTime<Utc>) -> Option<String> {
        let sightings = self.state.sightings(self.world.players());
        attribution::attribute(pos, &sightings, now, &self.state.config.attribution)
    }

    /// Schedule the one-shot attribution re-score. A swing observed just
    /// after the spawn event can still claim the pearl. The callback
    /// re-validates: it is a no-op when the record is gone or the owner
    /// already resolved.
    fn schedule_rescore(&self, pearl_id: PearlId) {
        let watcher = self.clone();
        let delay = Duration::from_millis(self.state.config.tracking.rescore_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            watcher.rescore(&pearl_id);
        });
    }

    fn rescore(&self, pearl_id: &PearlId) {
        let now = Utc::now();
        let pos = {
            let registry = self.state.registry();
            match registry.get(pearl_id) {
                Some(record) if record.owner == UNKNOWN_OWNER => record.pos,
                _ => return,
            }
        };
        let Some(owner) = self.attribute_at(pos, now) else {
            return;
        };
        let changed = {
            let mut registry = self.state.registry();
            registry
                .get_mut(pearl_id)
                .is_some_and(|record| record.assign_owner(&owner))
        };
        if changed {
            info!(pearl = %pearl_id, %owner, "owner resolved on delayed re-score");
            self.state.persist();
        }
    }
}
