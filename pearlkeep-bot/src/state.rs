//! Shared bot state: the registry, per-record trackers, the swing log,
//! and the process-wide trigger gate.
//!
//! All mutexes guard short synchronous critical sections and are never
//! held across an await. Lock order, where both are needed: registry
//! first, then trackers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

use pearlkeep_core::attribution::PlayerSighting;
use pearlkeep_core::config::PearlkeepConfig;
use pearlkeep_core::persistence::{AccountProfile, SaveHandle, StateDocument};
use pearlkeep_core::registry::PearlRegistry;
use pearlkeep_core::tracker::MotionTracker;
use pearlkeep_core::types::PearlId;

use crate::world::PlayerEntry;

/// Shared mutable state for one bot process.
pub struct BotState {
    /// Static configuration.
    pub config: PearlkeepConfig,
    /// Account identity, persisted alongside the records.
    pub account: AccountProfile,
    registry: Mutex<PearlRegistry>,
    trackers: Mutex<HashMap<PearlId, MotionTracker>>,
    swings: Mutex<HashMap<String, DateTime<Utc>>>,
    trigger_busy: AtomicBool,
    saver: SaveHandle,
}

impl BotState {
    /// Assemble the shared state.
    pub fn new(
        config: PearlkeepConfig,
        account: AccountProfile,
        registry: PearlRegistry,
        saver: SaveHandle,
    ) -> Self {
        Self {
            config,
            account,
            registry: Mutex::new(registry),
            trackers: Mutex::new(HashMap::new()),
            swings: Mutex::new(HashMap::new()),
            trigger_busy: AtomicBool::new(false),
            saver,
        }
    }

    /// Lock the registry.
    pub fn registry(&self) -> MutexGuard<'_, PearlRegistry> {
        self.registry.lock()
    }

    /// Lock the tracker map.
    pub fn trackers(&self) -> MutexGuard<'_, HashMap<PearlId, MotionTracker>> {
        self.trackers.lock()
    }

    /// Record an attack/use swing for a player.
    pub fn record_swing(&self, player: &str, now: DateTime<Utc>) {
        self.swings.lock().insert(player.to_string(), now);
    }

    /// Build attribution candidates from a live player snapshot plus the
    /// swing log.
    pub fn sightings(&self, players: Vec<PlayerEntry>) -> Vec<PlayerSighting> {
        let swings = self.swings.lock();
        players
            .into_iter()
            .map(|p| PlayerSighting {
                last_swing: swings.get(&p.name).copied(),
                name: p.name,
                pos: p.pos,
                yaw: p.yaw,
                pitch: p.pitch,
            })
            .collect()
    }

    /// Whether a trigger sequence currently holds the control state.
    /// Unrelated background behaviors (auto-feed, anti-idle) must check
    /// this and skip their action while it is set.
    pub fn trigger_in_progress(&self) -> bool {
        self.trigger_busy.load(Ordering::SeqCst)
    }

    /// Try to claim the trigger gate. Returns `false` when a sequence is
    /// already in flight.
    pub(crate) fn try_begin_trigger(&self) -> bool {
        self.trigger_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the trigger gate.
    pub(crate) fn end_trigger(&self) {
        self.trigger_busy.store(false, Ordering::SeqCst);
    }

    /// Submit the current registry contents for a debounced durable write.
    pub fn persist(&self) {
        let pearls = self.registry.lock().snapshot();
        self.saver.submit(StateDocument {
            account: self.account.clone(),
            pearls,
        });
    }
}
