//! Trigger sequencer scenarios: nearest selection, failure taxonomy,
//! record consumption, the busy gate, and navigation degradation.

mod common;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;

use pearlkeep_core::error::PearlError;
use pearlkeep_core::types::{BlockPos, Vec3};
use pearlkeep_bot::notify::FailureNotifier;
use pearlkeep_bot::trigger::TriggerSequencer;

use common::FakeWorld;

fn sequencer(
    world: &Arc<FakeWorld>,
    state: &Arc<pearlkeep_bot::state::BotState>,
) -> TriggerSequencer<FakeWorld> {
    TriggerSequencer::new(
        Arc::clone(world),
        Arc::clone(state),
        FailureNotifier::disabled(),
    )
}

#[tokio::test(start_paused = true)]
async fn selects_the_nearest_settled_pearl() {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    // Two settled pearls for alice; the actor stands at the origin.
    let mut pearls = HashMap::new();
    let (near_id, near) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    let (far_id, far) = common::settled_record("alice", 2, Vec3::new(40.0, 64.0, 0.0), base);
    pearls.insert(near_id.clone(), near);
    pearls.insert(far_id.clone(), far);
    let state = common::seeded_state(&dir, pearls);

    world.place_block(BlockPos::new(5, 64, 1), "stone_button");
    world.place_block(BlockPos::new(40, 64, 1), "stone_button");

    let outcome = sequencer(&world, &state)
        .trigger("alice")
        .await
        .expect("trigger succeeds");

    assert_eq!(outcome.pearl_id, near_id);
    let registry = state.registry();
    assert!(registry.get(&near_id).is_none(), "near pearl consumed");
    assert!(registry.get(&far_id).is_some(), "far pearl untouched");
}

#[tokio::test(start_paused = true)]
async fn no_action_block_fails_and_leaves_registry_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id, record) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    pearls.insert(id.clone(), record);
    let state = common::seeded_state(&dir, pearls);
    // No blocks anywhere near the pearl.

    let err = sequencer(&world, &state)
        .trigger("alice")
        .await
        .expect_err("must fail");
    assert!(matches!(err, PearlError::NoActionBlock { .. }));
    assert!(state.registry().get(&id).is_some(), "record left intact");
    assert!(!state.trigger_in_progress(), "gate released");
}

#[tokio::test(start_paused = true)]
async fn unknown_player_gets_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let state = common::empty_state(&dir);

    let err = sequencer(&world, &state)
        .trigger("nobody")
        .await
        .expect_err("must fail");
    assert!(matches!(err, PearlError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn consumed_pearl_is_gone_for_the_next_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id, record) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    pearls.insert(id, record);
    let state = common::seeded_state(&dir, pearls);
    world.place_block(BlockPos::new(5, 64, 1), "lever");

    let sequencer = sequencer(&world, &state);
    sequencer.trigger("alice").await.expect("first trigger");

    let err = sequencer.trigger("alice").await.expect_err("nothing left");
    assert!(matches!(err, PearlError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_trigger_is_rejected_busy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id_a, a) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    let (id_b, b) = common::settled_record("bob", 2, Vec3::new(9.0, 64.0, 0.0), base);
    pearls.insert(id_a, a);
    pearls.insert(id_b, b);
    let state = common::seeded_state(&dir, pearls);
    world.place_block(BlockPos::new(5, 64, 1), "lever");
    world.place_block(BlockPos::new(9, 64, 1), "lever");
    // Keep the first sequence parked inside navigation.
    world.nav_delay_ms.store(2000, Ordering::SeqCst);

    let sequencer = sequencer(&world, &state);
    let (first, second) = tokio::join!(sequencer.trigger("alice"), async {
        // Ordered after the first poll of the alice sequence.
        tokio::task::yield_now().await;
        sequencer.trigger("bob").await
    });

    assert!(first.is_ok(), "in-flight sequence completes normally");
    assert!(matches!(second, Err(PearlError::Busy)));
    assert_eq!(state.registry().count_for_owner("bob"), 1, "bob's pearl untouched");
    assert!(!state.trigger_in_progress());
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_degrades_then_proceeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id, record) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    pearls.insert(id, record);
    let state = common::seeded_state(&dir, pearls);
    world.place_block(BlockPos::new(5, 64, 1), "oak_trapdoor");
    world.fail_nav_3d.store(true, Ordering::SeqCst);
    world.fail_nav_horizontal.store(true, Ordering::SeqCst);

    let outcome = sequencer(&world, &state)
        .trigger("alice")
        .await
        .expect("navigation is best-effort; the interact still runs");
    assert_eq!(outcome.block.name, "oak_trapdoor");

    assert_eq!(world.count_calls("navigate3d"), 1);
    assert_eq!(world.count_calls("navigateH"), 1);
    assert_eq!(world.count_calls("interact"), 1);
    // Reset before the first attempt, after each attempt, before the
    // interact, and on sequence exit.
    assert!(world.count_calls("reset") >= 5, "calls: {:?}", world.calls());
}

#[tokio::test(start_paused = true)]
async fn interaction_failure_surfaces_and_resets_controls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id, record) = common::settled_record("alice", 1, Vec3::new(5.0, 64.0, 0.0), base);
    pearls.insert(id.clone(), record);
    let state = common::seeded_state(&dir, pearls);
    world.place_block(BlockPos::new(5, 64, 1), "lever");
    world.fail_interact.store(true, Ordering::SeqCst);

    let err = sequencer(&world, &state)
        .trigger("alice")
        .await
        .expect_err("interaction fault surfaces");
    assert!(matches!(err, PearlError::Interaction(_)));
    assert!(state.registry().get(&id).is_some(), "record kept for retry");
    assert!(!state.trigger_in_progress(), "gate released on failure");

    // The guard reset fires after the failed interact.
    let calls = world.calls();
    let interact_at = calls
        .iter()
        .position(|c| c.starts_with("interact"))
        .expect("interact attempted");
    assert!(
        calls[interact_at..].iter().any(|c| c == "reset"),
        "controls reset on the failure exit path"
    );
}

#[tokio::test(start_paused = true)]
async fn picks_the_closest_action_block_in_the_cube() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = FakeWorld::new();
    let base = Utc::now();

    let mut pearls = HashMap::new();
    let (id, record) = common::settled_record("alice", 1, Vec3::new(5.2, 64.0, 0.8), base);
    pearls.insert(id, record);
    let state = common::seeded_state(&dir, pearls);

    // Anchor is (5, 64, 0). A lever two blocks out and a button adjacent.
    world.place_block(BlockPos::new(7, 64, 0), "lever");
    world.place_block(BlockPos::new(5, 65, 0), "stone_button");
    world.place_block(BlockPos::new(5, 64, 3), "birch_fence_gate");

    let outcome = sequencer(&world, &state)
        .trigger("alice")
        .await
        .expect("trigger succeeds");
    assert_eq!(outcome.block.pos, BlockPos::new(5, 65, 0));
    assert_eq!(outcome.block.name, "stone_button");
}
