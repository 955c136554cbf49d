//! The world-client collaborator contract.
//!
//! Everything the tracker needs from the game client is behind this trait:
//! actor identity, player/entity snapshots, block lookup, a best-effort
//! navigation primitive (3D and horizontal-only), look/interact/chat
//! primitives, and a hard reset for directional/posture control state.
//!
//! Async methods are declared as `impl Future + Send` so integration code
//! can run them from spawned tasks; implementors simply write `async fn`.

use std::future::Future;

use thiserror::Error;

use pearlkeep_core::types::{BlockPos, EntityId, Vec3};

/// A connected player visible to the actor.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    /// Player name.
    pub name: String,
    /// Player position.
    pub pos: Vec3,
    /// Yaw in radians.
    pub yaw: f64,
    /// Pitch in radians.
    pub pitch: f64,
    /// Live entity link for this player, when loaded.
    pub entity_id: Option<EntityId>,
}

/// One entry of the loaded-entity snapshot.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Entity kind name (protocol-level).
    pub kind: String,
    /// Current position.
    pub pos: Vec3,
}

/// A block in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block name (protocol-level).
    pub name: String,
    /// Block coordinate.
    pub pos: BlockPos,
}

/// Navigation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    /// Full three-dimensional pathing.
    Full3d,
    /// Horizontal-only pathing, used as the degraded fallback.
    Horizontal,
}

/// Failures surfaced by world-client primitives.
#[derive(Error, Debug)]
pub enum WorldError {
    /// The navigation primitive gave up or was cancelled.
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// Look/interact primitive failure.
    #[error("interaction failed: {0}")]
    Interaction(String),
    /// Chat delivery failure.
    #[error("chat failed: {0}")]
    Chat(String),
}

/// The game-world collaborator.
pub trait WorldClient: Send + Sync + 'static {
    /// Current position of the bot's own actor.
    fn own_position(&self) -> Vec3;

    /// World/realm identifier the actor is in.
    fn dimension(&self) -> String;

    /// Whether the client currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Snapshot of connected players with position and facing.
    fn players(&self) -> Vec<PlayerEntry>;

    /// Snapshot of all currently loaded entities.
    fn loaded_entities(&self) -> Vec<EntitySnapshot>;

    /// Block at an integer coordinate, if that chunk is loaded.
    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    /// Hard reset of all directional/posture control state. Must be cheap
    /// and infallible; called liberally between movement attempts.
    fn reset_controls(&self);

    /// Walk toward `target` until within `range`. Cancel-safe: dropping
    /// the future abandons the attempt.
    fn navigate(
        &self,
        target: Vec3,
        range: f64,
        mode: NavMode,
    ) -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Orient the actor's view toward a point.
    fn look_at(&self, target: Vec3) -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Interact with (use/activate) the block at `pos`.
    fn interact_block(&self, pos: BlockPos)
    -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Send a public chat message.
    fn send_chat(&self, message: &str) -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Send a private message to one player.
    fn whisper(
        &self,
        player: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Wait a fixed number of simulation steps.
    fn wait_ticks(&self, ticks: u32) -> impl Future<Output = ()> + Send;
}
