//! Core type definitions for the pearlkeep tracking system.
//!
//! All durable types are serializable; spatial math lives here so the
//! scorer, tracker, and sequencer share one vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner placeholder for records whose thrower has not been attributed yet.
pub const UNKNOWN_OWNER: &str = "unknown";

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Ephemeral world entity id, valid only while the entity is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, durable record id for a tracked pearl.
///
/// Derived from the spawning entity id plus the creation timestamp so ids
/// stay unique across reconnects (entity ids alone repeat between sessions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PearlId(String);

impl PearlId {
    /// Derive the id for a pearl first observed as `entity` at `created_at`.
    #[must_use]
    pub fn derive(entity: EntityId, created_at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", entity.0, created_at.timestamp_millis()))
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PearlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A continuous 3D position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Create a position from its components.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn distance_sq(&self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(&self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Dot product with `other`.
    #[must_use]
    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Vector length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    /// Snap to the containing block coordinate via floor.
    #[must_use]
    pub fn floor(&self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl BlockPos {
    /// Create a block coordinate from its components.
    #[must_use]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The continuous position of the block's corner.
    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// The continuous position of the block's center.
    #[must_use]
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Squared distance between block centers.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f64 {
        self.center().distance_sq(other.center())
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Unit-ish look vector from yaw/pitch (radians).
///
/// Matches the client convention: `(-sin(yaw)·cos(pitch), sin(pitch),
/// -cos(yaw)·cos(pitch))`.
#[must_use]
pub fn look_vector(yaw: f64, pitch: f64) -> Vec3 {
    Vec3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

/// Cosine of the angle between two vectors.
///
/// Returns 0.0 when either vector is degenerate, mirroring the neutral
/// fallback used elsewhere for zero-length inputs.
#[must_use]
pub fn cosine_between(a: Vec3, b: Vec3) -> f64 {
    let denom = a.length() * b.length();
    if denom < f64::EPSILON {
        0.0
    } else {
        a.dot(b) / denom
    }
}

// ---------------------------------------------------------------------------
// Pearl Records
// ---------------------------------------------------------------------------

/// Lifecycle state of a tracked pearl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PearlStatus {
    /// In flight or not yet proven stationary.
    Airborne,
    /// Settled into a usable fixed location.
    Stasis,
    /// Confirmed removed without ever settling.
    Gone,
    /// Loaded from disk without a live entity; no longer trackable.
    Unknown,
}

/// One tracked pearl.
///
/// `pos` is continuous while airborne and integer-snapped once settled;
/// `last_pos` retains the last raw observation for diagnostics. The owner
/// is monotonic: it may be upgraded from [`UNKNOWN_OWNER`] to a name, never
/// downgraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PearlRecord {
    /// Attributed thrower, or [`UNKNOWN_OWNER`].
    pub owner: String,
    /// Current tracked position.
    pub pos: Vec3,
    /// Lifecycle state.
    pub status: PearlStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the entity was last seen in any event or snapshot.
    pub last_seen_at: DateTime<Utc>,
    /// When the entity last moved beyond the stability epsilon.
    pub last_move_at: DateTime<Utc>,
    /// Last raw (unsnapped) observed position.
    #[serde(default)]
    pub last_pos: Option<Vec3>,
    /// Live entity link; present only while the underlying entity exists.
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    /// World/realm the pearl was observed in. Informational.
    pub dimension: String,
}

impl PearlRecord {
    /// Create a fresh airborne record for a newly observed entity.
    #[must_use]
    pub fn new(
        entity: EntityId,
        pos: Vec3,
        dimension: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            owner: UNKNOWN_OWNER.to_string(),
            pos,
            status: PearlStatus::Airborne,
            created_at: now,
            last_seen_at: now,
            last_move_at: now,
            last_pos: None,
            entity_id: Some(entity),
            dimension: dimension.into(),
        }
    }

    /// Upgrade the owner from unknown to a resolved name.
    ///
    /// Returns `true` if the owner changed. A record with a resolved owner
    /// is never overwritten.
    pub fn assign_owner(&mut self, owner: &str) -> bool {
        if self.owner != UNKNOWN_OWNER || owner == UNKNOWN_OWNER {
            return false;
        }
        self.owner = owner.to_string();
        true
    }

    /// Whether the pearl has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status == PearlStatus::Stasis
    }

    /// Milliseconds since the record was created. Never negative.
    #[must_use]
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_milliseconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearl_id_embeds_entity_and_time() {
        let now = Utc::now();
        let id = PearlId::derive(EntityId(42), now);
        assert!(id.as_str().starts_with("42-"));

        let later = now + chrono::Duration::milliseconds(1);
        assert_ne!(id, PearlId::derive(EntityId(42), later));
    }

    #[test]
    fn floor_snaps_toward_negative_infinity() {
        let pos = Vec3::new(-0.2, 64.9, 10.0);
        assert_eq!(pos.floor(), BlockPos::new(-1, 64, 10));
    }

    #[test]
    fn look_vector_faces_negative_z_at_zero_angles() {
        let look = look_vector(0.0, 0.0);
        assert!((look.x).abs() < 1e-9);
        assert!((look.y).abs() < 1e-9);
        assert!((look.z + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_degenerate_is_neutral() {
        let zero = Vec3::default();
        let unit = Vec3::new(1.0, 0.0, 0.0);
        assert!((cosine_between(zero, unit)).abs() < f64::EPSILON);
    }

    #[test]
    fn owner_is_monotonic() {
        let mut record = PearlRecord::new(EntityId(1), Vec3::default(), "overworld", Utc::now());
        assert!(!record.assign_owner(UNKNOWN_OWNER));
        assert!(record.assign_owner("alice"));
        assert!(!record.assign_owner("bob"));
        assert_eq!(record.owner, "alice");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&PearlStatus::Airborne).expect("serialize");
        assert_eq!(json, "\"airborne\"");
    }
}
