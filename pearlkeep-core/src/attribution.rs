//! Owner attribution — picks the most likely thrower of a new pearl.
//!
//! Score = w₁·Recency + w₂·Facing + w₃·Closeness, where:
//!   Recency(p)   = clamp01(1 − swing_age / window)
//!   Facing(p)    = clamp01((cos∠(look, toward) + 1) / 2)
//!   Closeness(p) = 1 / (1 + d²)
//!
//! Only players inside the candidate radius with a swing inside the
//! recency window participate: a player with no recent swing is never a
//! candidate, however close they stand. This keeps pearls that predate
//! the observer from being mis-attributed to bystanders.
//!
//! The result is a best-effort heuristic, not ground truth.

use chrono::{DateTime, Utc};

use crate::config::AttributionConfig;
use crate::types::{cosine_between, look_vector, Vec3};

/// A player visible in the world at scoring time.
#[derive(Debug, Clone)]
pub struct PlayerSighting {
    /// Player name.
    pub name: String,
    /// Player position.
    pub pos: Vec3,
    /// Yaw in radians.
    pub yaw: f64,
    /// Pitch in radians.
    pub pitch: f64,
    /// Most recent attack/use swing, if any was observed.
    pub last_swing: Option<DateTime<Utc>>,
}

/// Pick the most likely owner for a pearl at `pos`, or `None` when no
/// player qualifies.
///
/// Ties fall to iteration order over `players`; this is an accident of
/// enumeration, not a guaranteed tie-break rule.
#[must_use]
pub fn attribute(
    pos: Vec3,
    players: &[PlayerSighting],
    now: DateTime<Utc>,
    config: &AttributionConfig,
) -> Option<String> {
    let mut best: Option<(f64, &PlayerSighting)> = None;
    for player in players {
        let Some(score) = score_candidate(pos, player, now, config) else {
            continue;
        };
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, player));
        }
    }
    best.map(|(_, player)| player.name.clone())
}

/// Score one candidate, or `None` when they fail the swing/radius filters.
#[must_use]
pub fn score_candidate(
    pos: Vec3,
    player: &PlayerSighting,
    now: DateTime<Utc>,
    config: &AttributionConfig,
) -> Option<f64> {
    let swing = player.last_swing?;
    let swing_age_ms = (now - swing).num_milliseconds().max(0);
    if swing_age_ms > config.swing_window_ms as i64 {
        return None;
    }

    let distance_sq = player.pos.distance_sq(pos);
    if distance_sq > config.radius * config.radius {
        return None;
    }

    let recency = clamp01(1.0 - swing_age_ms as f64 / config.swing_window_ms as f64);

    let look = look_vector(player.yaw, player.pitch);
    let toward = pos.sub(player.pos);
    let facing = clamp01((cosine_between(look, toward) + 1.0) / 2.0);

    let closeness = 1.0 / (1.0 + distance_sq);

    Some(
        config.recency_weight * recency
            + config.facing_weight * facing
            + config.closeness_weight * closeness,
    )
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
