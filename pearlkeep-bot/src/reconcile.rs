//! The reconciliation loop: periodic re-sync of tracked records against
//! the live entity set.
//!
//! Covers everything the event stream can miss: entities observed without
//! a spawn event (reconnects), entities that load already stationary and
//! never emit a qualifying move event, and remove events lost to chunk
//! flapping. A record whose entity stays missing past the grace period is
//! deleted exactly once; shorter absences are absorbed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use pearlkeep_core::tracker::MotionTracker;
use pearlkeep_core::types::{EntityId, PearlId, PearlStatus};

use crate::state::BotState;
use crate::watcher::EntityWatcher;
use crate::world::WorldClient;

/// Periodic safety-net pass over the registry.
pub struct Reconciler<W> {
    watcher: EntityWatcher<W>,
    world: Arc<W>,
    state: Arc<BotState>,
}

impl<W: WorldClient> Reconciler<W> {
    /// Create a reconciler sharing the watcher's upsert/promotion logic.
    pub fn new(watcher: EntityWatcher<W>, world: Arc<W>, state: Arc<BotState>) -> Self {
        Self {
            watcher,
            world,
            state,
        }
    }

    /// Run one reconciliation pass.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let snapshot = self.world.loaded_entities();

        // Upsert every qualifying live entity. This also refreshes
        // positions and feeds stability samples for entities that never
        // emit move events.
        for snap in &snapshot {
            self.watcher.upsert_entity(snap, now);
        }

        let live: HashSet<EntityId> = snapshot.iter().map(|e| e.id).collect();
        let removed = self.sweep_missing(&live, now);
        if removed > 0 {
            self.state.persist();
        }

        // Promotion safety net over every airborne record.
        let airborne: Vec<PearlId> = self
            .state
            .registry()
            .iter()
            .filter(|(_, r)| r.status == PearlStatus::Airborne)
            .map(|(id, _)| id.clone())
            .collect();
        let mut promoted = Vec::new();
        for pearl_id in airborne {
            if let Some(notice) = self.watcher.evaluate_promotion(&pearl_id, now) {
                promoted.push(notice);
            }
        }
        if !promoted.is_empty() {
            self.state.persist();
        }
        for notice in promoted {
            self.watcher.send_notice(notice).await;
        }
    }

    /// Advance missing timers and delete records whose entity has been
    /// absent past the grace period. Returns how many records were
    /// deleted.
    fn sweep_missing(&self, live: &HashSet<EntityId>, now: DateTime<Utc>) -> usize {
        let grace_ms = self.state.config.tracking.missing_grace_ms;
        let tracked: Vec<(PearlId, Option<EntityId>, PearlStatus)> = self
            .state
            .registry()
            .iter()
            .map(|(id, r)| (id.clone(), r.entity_id, r.status))
            .collect();

        let mut removed = 0usize;
        for (pearl_id, entity, status) in tracked {
            let absent = match entity {
                Some(entity) => !live.contains(&entity),
                // Records loaded from disk without a live link are only
                // prunable when they were never settled.
                None => status == PearlStatus::Unknown,
            };
            if !absent {
                continue;
            }

            let expired = {
                let mut trackers = self.state.trackers();
                let tracker = trackers
                    .entry(pearl_id.clone())
                    .or_insert_with(|| MotionTracker::new(now));
                tracker.mark_missing(now);
                tracker.missing_longer_than(grace_ms, now)
            };
            if expired {
                let record = self.state.registry().remove(&pearl_id);
                self.state.trackers().remove(&pearl_id);
                if let Some(record) = record {
                    warn!(
                        pearl = %pearl_id,
                        owner = %record.owner,
                        status = ?record.status,
                        "entity missing past grace period; dropping record"
                    );
                    removed += 1;
                }
            } else {
                debug!(pearl = %pearl_id, "entity missing; grace timer running");
            }
        }
        removed
    }

    /// Run forever on a fixed period.
    pub async fn run(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Utc::now()).await;
        }
    }
}
