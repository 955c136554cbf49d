//! World events consumed by the entity watcher.
//!
//! The integration host translates its client library's notifications into
//! this form. Ordering is guaranteed per entity id only; events for
//! different ids may interleave arbitrarily with the reconciliation loop.

use pearlkeep_core::types::{EntityId, Vec3};

/// A world notification relevant to pearl tracking.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    /// An entity appeared.
    EntitySpawned {
        /// Entity id.
        id: EntityId,
        /// Entity kind name.
        kind: String,
        /// Spawn position.
        pos: Vec3,
    },

    /// An entity moved.
    EntityMoved {
        /// Entity id.
        id: EntityId,
        /// New position.
        pos: Vec3,
    },

    /// An entity was removed (despawn or chunk unload).
    EntityRemoved {
        /// Entity id.
        id: EntityId,
    },

    /// A player performed an attack/use swing.
    PlayerSwung {
        /// The swinging player's entity id.
        id: EntityId,
    },
}

impl WorldEvent {
    /// The entity id this event concerns.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::EntitySpawned { id, .. }
            | Self::EntityMoved { id, .. }
            | Self::EntityRemoved { id }
            | Self::PlayerSwung { id } => *id,
        }
    }
}
