//! Motion stability tracking and the promotion state machine.
//!
//! Each airborne record carries one [`MotionTracker`]: ephemeral
//! bookkeeping that is never persisted and never exposed as authoritative
//! record state. The tracker consumes raw motion samples and answers one
//! question: has this pearl been still long enough to call it settled?
//!
//! Promotion guard (`airborne → stasis`), both conditions required:
//!   (a) record age ≥ `min_age_ms`; a pearl mid-throw is briefly slow at
//!       the apex and must not be promoted there;
//!   (b) a continuous stability window ≥ `settle_ms`, measured from the
//!       most recent disqualifying motion sample.

use chrono::{DateTime, Utc};

use crate::config::TrackingConfig;
use crate::types::{BlockPos, PearlRecord, PearlStatus, Vec3};

/// Ephemeral per-record stability and liveness bookkeeping.
#[derive(Debug, Clone)]
pub struct MotionTracker {
    /// When the last raw sample was taken.
    last_raw_at: DateTime<Utc>,
    /// Instantaneous speed of the last sample (blocks/s).
    last_speed: f64,
    /// Start of the current stability window, if one is running.
    stable_since: Option<DateTime<Utc>>,
    /// Last qualifying (stationary) position. Promotion snaps from here,
    /// not from the latest raw sample, so a mid-settle reading is never
    /// captured.
    stable_pos: Option<Vec3>,
    /// When the entity first went missing from live snapshots.
    missing_since: Option<DateTime<Utc>>,
}

impl MotionTracker {
    /// Create a tracker for a record first observed at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_raw_at: now,
            last_speed: 0.0,
            stable_since: None,
            stable_pos: None,
            missing_since: None,
        }
    }

    /// Feed one raw motion sample.
    ///
    /// A sample disqualifies stability when its displacement since the
    /// previous sample exceeds the displacement epsilon OR its
    /// instantaneous speed exceeds the speed epsilon. Disqualification
    /// restarts the stability window at the sample time and clears the
    /// remembered stable position; a qualifying sample starts the window
    /// (if not already running) and updates the remembered position.
    pub fn observe(
        &mut self,
        prev_pos: Vec3,
        next_pos: Vec3,
        now: DateTime<Utc>,
        config: &TrackingConfig,
    ) {
        let elapsed_ms = (now - self.last_raw_at).num_milliseconds();
        let displacement = prev_pos.distance(next_pos);
        let speed = if elapsed_ms > 0 {
            displacement / (elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };

        if displacement > config.displacement_epsilon || speed > config.speed_epsilon {
            self.stable_since = Some(now);
            self.stable_pos = None;
        } else {
            self.stable_since.get_or_insert(now);
            self.stable_pos = Some(next_pos);
        }

        self.last_speed = speed;
        self.last_raw_at = now;
    }

    /// Evaluate the promotion guard.
    ///
    /// Returns the snap target (floor of the remembered stable position)
    /// when the record qualifies for `airborne → stasis`, `None` otherwise.
    #[must_use]
    pub fn settle_target(
        &self,
        record: &PearlRecord,
        now: DateTime<Utc>,
        config: &TrackingConfig,
    ) -> Option<BlockPos> {
        if record.status != PearlStatus::Airborne {
            return None;
        }
        if record.age_ms(now) < config.min_age_ms as i64 {
            return None;
        }
        let since = self.stable_since?;
        if (now - since).num_milliseconds() < config.settle_ms as i64 {
            return None;
        }
        Some(self.stable_pos?.floor())
    }

    /// Start (or continue) the missing timer. Returns its start time.
    pub fn mark_missing(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        *self.missing_since.get_or_insert(now)
    }

    /// Clear the missing timer: the entity is back in the live snapshot.
    pub fn mark_present(&mut self) {
        self.missing_since = None;
    }

    /// Whether the entity has been missing strictly longer than `grace_ms`.
    #[must_use]
    pub fn missing_longer_than(&self, grace_ms: u64, now: DateTime<Utc>) -> bool {
        self.missing_since
            .is_some_and(|since| (now - since).num_milliseconds() > grace_ms as i64)
    }

    /// Instantaneous speed of the last observed sample (blocks/s).
    #[must_use]
    pub fn last_speed(&self) -> f64 {
        self.last_speed
    }
}

/// Apply the `airborne → stasis` transition.
///
/// The position snaps to the integer block coordinate; the raw position is
/// retained in `last_pos` for diagnostics.
pub fn promote(record: &mut PearlRecord, block: BlockPos) {
    record.last_pos = Some(record.pos);
    record.pos = block.to_vec3();
    record.status = PearlStatus::Stasis;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use chrono::Duration;

    fn ts(base: DateTime<Utc>, offset_ms: i64) -> DateTime<Utc> {
        base + Duration::milliseconds(offset_ms)
    }

    fn airborne_record(base: DateTime<Utc>) -> PearlRecord {
        PearlRecord::new(EntityId(7), Vec3::new(10.3, 70.0, -4.8), "overworld", base)
    }

    #[test]
    fn settles_after_min_age_and_stability_window() {
        // Created at t0, last disqualifying motion at t0+2400ms, stable
        // afterwards: with MIN_AGE=2500 and SETTLE=600 promotion lands at
        // exactly t0+3000ms.
        let base = Utc::now();
        let config = TrackingConfig::default();
        let record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);

        let mut pos = Vec3::new(10.3, 70.0, -4.8);
        for offset in [400, 800, 1200, 1600, 2000, 2400] {
            let next = Vec3::new(pos.x + 2.0, pos.y - 1.0, pos.z);
            tracker.observe(pos, next, ts(base, offset), &config);
            pos = next;
        }
        // Stationary samples after the last disqualifying one.
        for offset in [2600, 2800] {
            tracker.observe(pos, pos, ts(base, offset), &config);
        }

        assert!(
            tracker.settle_target(&record, ts(base, 2999), &config).is_none(),
            "window measured from the t0+2400 disqualifier has not elapsed"
        );
        assert_eq!(
            tracker.settle_target(&record, ts(base, 3000), &config),
            Some(pos.floor())
        );
    }

    #[test]
    fn min_age_blocks_early_promotion() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);
        let pos = record.pos;

        tracker.observe(pos, pos, ts(base, 100), &config);
        // Stable for far longer than SETTLE, but the record is too young.
        assert!(tracker.settle_target(&record, ts(base, 2400), &config).is_none());
        assert!(tracker.settle_target(&record, ts(base, 2500), &config).is_some());
    }

    #[test]
    fn disqualifying_sample_delays_promotion_past_settle() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);
        let pos = record.pos;

        tracker.observe(pos, pos, ts(base, 100), &config);

        // A fast sample at T resets the window: nothing may promote
        // before T + SETTLE.
        let t = 4000;
        tracker.observe(pos, Vec3::new(pos.x + 5.0, pos.y, pos.z), ts(base, t), &config);
        tracker.observe(
            Vec3::new(pos.x + 5.0, pos.y, pos.z),
            Vec3::new(pos.x + 5.0, pos.y, pos.z),
            ts(base, t + 100),
            &config,
        );
        assert!(tracker
            .settle_target(&record, ts(base, t + 599), &config)
            .is_none());
        assert!(tracker
            .settle_target(&record, ts(base, t + 600), &config)
            .is_some());
    }

    #[test]
    fn slow_drift_disqualifies_via_speed() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let mut tracker = MotionTracker::new(base);
        let pos = Vec3::new(0.0, 64.0, 0.0);

        // 0.04 blocks in 100ms: under the displacement epsilon but 0.4
        // blocks/s, well over the speed epsilon.
        tracker.observe(pos, Vec3::new(0.04, 64.0, 0.0), ts(base, 100), &config);
        assert!(tracker.stable_pos.is_none());
        assert_eq!(tracker.stable_since, Some(ts(base, 100)));
    }

    #[test]
    fn no_promotion_without_a_remembered_stable_position() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);

        // Only a disqualifying sample: window is running but there is no
        // stable position to snap from.
        tracker.observe(record.pos, Vec3::new(50.0, 70.0, 50.0), ts(base, 200), &config);
        assert!(tracker
            .settle_target(&record, ts(base, 60_000), &config)
            .is_none());
    }

    #[test]
    fn promotion_snaps_from_stable_position_not_latest_raw() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let mut record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);

        let rest = Vec3::new(100.2, 65.0, -7.6);
        tracker.observe(record.pos, rest, ts(base, 2000), &config); // disqualifies
        tracker.observe(rest, rest, ts(base, 2600), &config); // stable here
        record.pos = rest;

        let target = tracker
            .settle_target(&record, ts(base, 3200), &config)
            .expect("should settle");
        assert_eq!(target, BlockPos::new(100, 65, -8));

        promote(&mut record, target);
        assert_eq!(record.status, PearlStatus::Stasis);
        assert_eq!(record.pos, target.to_vec3());
        assert_eq!(record.last_pos, Some(rest));
    }

    #[test]
    fn settled_records_never_re_promote() {
        let base = Utc::now();
        let config = TrackingConfig::default();
        let mut record = airborne_record(base);
        let mut tracker = MotionTracker::new(base);
        tracker.observe(record.pos, record.pos, ts(base, 100), &config);

        promote(&mut record, BlockPos::new(10, 70, -5));
        assert!(tracker
            .settle_target(&record, ts(base, 10_000), &config)
            .is_none());
    }

    #[test]
    fn missing_timer_round_trip() {
        let base = Utc::now();
        let mut tracker = MotionTracker::new(base);

        let started = tracker.mark_missing(ts(base, 1000));
        assert_eq!(started, ts(base, 1000));
        // Continuing keeps the original start.
        assert_eq!(tracker.mark_missing(ts(base, 3000)), ts(base, 1000));

        assert!(!tracker.missing_longer_than(5000, ts(base, 6000)));
        assert!(tracker.missing_longer_than(5000, ts(base, 6001)));

        tracker.mark_present();
        assert!(!tracker.missing_longer_than(0, ts(base, 60_000)));
    }
}
