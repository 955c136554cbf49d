//! Shared test fixtures: an in-memory world client and state builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use pearlkeep_core::config::PearlkeepConfig;
use pearlkeep_core::persistence::{spawn_debounced_saver, AccountProfile, StateStore};
use pearlkeep_core::registry::PearlRegistry;
use pearlkeep_core::tracker;
use pearlkeep_core::types::{BlockPos, EntityId, PearlId, PearlRecord, Vec3};

use pearlkeep_bot::state::BotState;
use pearlkeep_bot::world::{Block, EntitySnapshot, NavMode, PlayerEntry, WorldClient, WorldError};

/// Opt-in log output for debugging test runs: `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scriptable in-memory world.
#[derive(Default)]
pub struct FakeWorld {
    pub pos: Mutex<Vec3>,
    pub players: Mutex<Vec<PlayerEntry>>,
    pub entities: Mutex<Vec<EntitySnapshot>>,
    pub blocks: Mutex<HashMap<BlockPos, String>>,
    pub connected: AtomicBool,
    pub fail_nav_3d: AtomicBool,
    pub fail_nav_horizontal: AtomicBool,
    pub fail_interact: AtomicBool,
    pub nav_delay_ms: AtomicU64,
    pub calls: Mutex<Vec<String>>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        let world = Self::default();
        world.connected.store(true, Ordering::SeqCst);
        Arc::new(world)
    }

    pub fn place_block(&self, pos: BlockPos, name: &str) {
        self.blocks.lock().insert(pos, name.to_string());
    }

    pub fn set_entities(&self, entities: Vec<EntitySnapshot>) {
        *self.entities.lock() = entities;
    }

    pub fn add_player(&self, name: &str, pos: Vec3, yaw: f64, pitch: f64, entity: Option<i64>) {
        self.players.lock().push(PlayerEntry {
            name: name.to_string(),
            pos,
            yaw,
            pitch,
            entity_id: entity.map(EntityId),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl WorldClient for FakeWorld {
    fn own_position(&self) -> Vec3 {
        *self.pos.lock()
    }

    fn dimension(&self) -> String {
        "overworld".to_string()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn players(&self) -> Vec<PlayerEntry> {
        self.players.lock().clone()
    }

    fn loaded_entities(&self) -> Vec<EntitySnapshot> {
        self.entities.lock().clone()
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        self.blocks
            .lock()
            .get(&pos)
            .map(|name| Block {
                name: name.clone(),
                pos,
            })
    }

    fn reset_controls(&self) {
        self.record("reset".to_string());
    }

    async fn navigate(&self, target: Vec3, _range: f64, mode: NavMode) -> Result<(), WorldError> {
        let (label, fail) = match mode {
            NavMode::Full3d => ("navigate3d", &self.fail_nav_3d),
            NavMode::Horizontal => ("navigateH", &self.fail_nav_horizontal),
        };
        self.record(format!("{label}:{target}"));
        let delay = self.nav_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if fail.load(Ordering::SeqCst) {
            return Err(WorldError::Navigation("no path".to_string()));
        }
        *self.pos.lock() = target;
        Ok(())
    }

    async fn look_at(&self, target: Vec3) -> Result<(), WorldError> {
        self.record(format!("look:{target}"));
        Ok(())
    }

    async fn interact_block(&self, pos: BlockPos) -> Result<(), WorldError> {
        self.record(format!("interact:{pos}"));
        if self.fail_interact.load(Ordering::SeqCst) {
            return Err(WorldError::Interaction("out of reach".to_string()));
        }
        Ok(())
    }

    async fn send_chat(&self, message: &str) -> Result<(), WorldError> {
        self.record(format!("chat:{message}"));
        Ok(())
    }

    async fn whisper(&self, player: &str, message: &str) -> Result<(), WorldError> {
        self.record(format!("whisper:{player}:{message}"));
        Ok(())
    }

    async fn wait_ticks(&self, ticks: u32) {
        self.record(format!("wait:{ticks}"));
    }
}

/// State backed by a debounced saver writing into `dir`.
pub fn seeded_state(
    dir: &tempfile::TempDir,
    pearls: HashMap<PearlId, PearlRecord>,
) -> Arc<BotState> {
    let store = StateStore::new(dir.path().join("state.json"));
    let saver = spawn_debounced_saver(store, Duration::from_millis(10));
    Arc::new(BotState::new(
        PearlkeepConfig::default(),
        AccountProfile {
            username: "keeper".to_string(),
            host: "localhost".to_string(),
            port: 25565,
        },
        PearlRegistry::from_records(pearls),
        saver,
    ))
}

pub fn empty_state(dir: &tempfile::TempDir) -> Arc<BotState> {
    seeded_state(dir, HashMap::new())
}

/// A settled record owned by `owner`, snapped at `pos.floor()`.
pub fn settled_record(
    owner: &str,
    entity: i64,
    pos: Vec3,
    created_at: DateTime<Utc>,
) -> (PearlId, PearlRecord) {
    let mut record = PearlRecord::new(EntityId(entity), pos, "overworld", created_at);
    record.assign_owner(owner);
    tracker::promote(&mut record, pos.floor());
    record.entity_id = None;
    (PearlId::derive(EntityId(entity), created_at), record)
}

pub fn snap(id: i64, kind: &str, pos: Vec3) -> EntitySnapshot {
    EntitySnapshot {
        id: EntityId(id),
        kind: kind.to_string(),
        pos,
    }
}
