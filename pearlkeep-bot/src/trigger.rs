//! The trigger sequencer: consume a settled pearl by working a nearby
//! action block.
//!
//! The sequence is bounded and best-effort. Navigation never aborts it:
//! a failed or timed-out 3D approach degrades to horizontal-only, and a
//! failed horizontal approach proceeds in place. Control state is hard
//! reset on every exit path, success or failure, so an aborted attempt
//! never leaves residual movement input behind.
//!
//! One sequence may be in flight at a time, process-wide. A concurrent
//! request is rejected with `Busy` rather than queued or raced.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use pearlkeep_core::classify::ActionBlockMatcher;
use pearlkeep_core::error::{PearlError, Result};
use pearlkeep_core::types::{BlockPos, PearlId, Vec3};

use crate::notify::FailureNotifier;
use crate::state::BotState;
use crate::world::{Block, NavMode, WorldClient};

/// Result of a successful trigger: which record was consumed, and which
/// block fired it.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    /// Consumed record id.
    pub pearl_id: PearlId,
    /// The action block that was interacted with.
    pub block: Block,
}

/// Drives the approach-and-interact sequence for one player at a time.
pub struct TriggerSequencer<W> {
    world: Arc<W>,
    state: Arc<BotState>,
    blocks: ActionBlockMatcher,
    notifier: FailureNotifier,
}

/// Releases the trigger gate and resets control state when the sequence
/// ends, however it ends.
struct ControlGuard<W: WorldClient> {
    world: Arc<W>,
    state: Arc<BotState>,
}

impl<W: WorldClient> Drop for ControlGuard<W> {
    fn drop(&mut self) {
        self.world.reset_controls();
        self.state.end_trigger();
    }
}

impl<W: WorldClient> TriggerSequencer<W> {
    /// Create a sequencer with the default action-block matcher.
    pub fn new(world: Arc<W>, state: Arc<BotState>, notifier: FailureNotifier) -> Self {
        Self {
            world,
            state,
            blocks: ActionBlockMatcher::default(),
            notifier,
        }
    }

    /// Trigger the nearest settled pearl owned by `player`.
    ///
    /// On success the consumed record is deleted from the registry. On
    /// failure the record is left untouched so the caller may retry.
    ///
    /// # Errors
    ///
    /// [`PearlError::Busy`] when a sequence is already in flight,
    /// [`PearlError::NotFound`] / [`PearlError::NoActionBlock`] when
    /// selection fails, [`PearlError::Interaction`] on faults in the
    /// orient/wait/interact steps.
    pub async fn trigger(&self, player: &str) -> Result<TriggerOutcome> {
        if !self.state.try_begin_trigger() {
            warn!(player, "trigger rejected; a sequence is already in flight");
            return Err(PearlError::Busy);
        }
        let _guard = ControlGuard {
            world: Arc::clone(&self.world),
            state: Arc::clone(&self.state),
        };

        let result = self.run_sequence(player).await;
        if let Err(err) = &result {
            match err {
                PearlError::NoActionBlock { .. } | PearlError::Interaction(_) => {
                    self.notifier
                        .trigger_failed(player, &err.to_string())
                        .await;
                }
                _ => {}
            }
        }
        result
    }

    async fn run_sequence(&self, player: &str) -> Result<TriggerOutcome> {
        let config = &self.state.config.trigger;

        let from = self.world.own_position();
        let (pearl_id, anchor) = self
            .state
            .registry()
            .nearest_settled(player, from)
            .ok_or_else(|| PearlError::NotFound(player.to_string()))?;

        let block = self
            .find_action_block(anchor)
            .ok_or(PearlError::NoActionBlock {
                pos: anchor,
                radius: config.search_radius,
            })?;
        info!(
            player,
            pearl = %pearl_id,
            block = %block.name,
            pos = %block.pos,
            "starting trigger sequence"
        );

        self.approach(block.pos.center()).await;

        // Orient, settle, interact. Faults from here on surface to the
        // caller with the record intact.
        self.world.reset_controls();
        let center = block.pos.center();
        let look_target = Vec3::new(center.x, center.y + config.look_height_offset, center.z);
        self.world
            .look_at(look_target)
            .await
            .map_err(|e| PearlError::Interaction(e.to_string()))?;
        self.world.wait_ticks(config.interact_delay_ticks).await;
        self.world
            .interact_block(block.pos)
            .await
            .map_err(|e| PearlError::Interaction(e.to_string()))?;
        self.world.wait_ticks(config.interact_delay_ticks).await;

        // The pearl is consumed; the record goes with it.
        self.state.registry().remove(&pearl_id);
        self.state.trackers().remove(&pearl_id);
        self.state.persist();
        info!(player, pearl = %pearl_id, "pearl consumed");

        Ok(TriggerOutcome { pearl_id, block })
    }

    /// Best-effort approach: full 3D first, horizontal-only on failure,
    /// proceed in place if both fail. Controls are reset before the first
    /// attempt and after every attempt.
    async fn approach(&self, target: Vec3) {
        let config = &self.state.config.trigger;

        self.world.reset_controls();
        let full = tokio::time::timeout(
            Duration::from_millis(config.nav_timeout_ms),
            self.world
                .navigate(target, config.approach_range, NavMode::Full3d),
        )
        .await;
        self.world.reset_controls();
        if matches!(full, Ok(Ok(()))) {
            return;
        }

        warn!(goal = %target, "3D approach failed or timed out; degrading to horizontal");
        let horizontal = tokio::time::timeout(
            Duration::from_millis(config.horizontal_nav_timeout_ms),
            self.world
                .navigate(target, config.approach_range, NavMode::Horizontal),
        )
        .await;
        self.world.reset_controls();
        if !matches!(horizontal, Ok(Ok(()))) {
            warn!(goal = %target, "horizontal approach failed; proceeding in place");
        }
    }

    /// Exhaustive bounded-cube search for the nearest action block around
    /// the pearl's snapped coordinate.
    fn find_action_block(&self, anchor: BlockPos) -> Option<Block> {
        let radius = self.state.config.trigger.search_radius;
        let mut best: Option<(f64, Block)> = None;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let pos = BlockPos::new(anchor.x + dx, anchor.y + dy, anchor.z + dz);
                    let Some(block) = self.world.block_at(pos) else {
                        continue;
                    };
                    if !self.blocks.matches(&block.name) {
                        continue;
                    }
                    let distance = pos.distance_sq(anchor);
                    if best.as_ref().is_none_or(|(d, _)| distance < *d) {
                        best = Some((distance, block));
                    }
                }
            }
        }
        best.map(|(_, block)| block)
    }
}
