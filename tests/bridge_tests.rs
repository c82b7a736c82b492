//! Playback event bridge tests
//!
//! Exercises the event wiring end to end: episode counting on completed
//! playback, interruption handling, session-end completion for "after current
//! episode" timers, and blocking of new sessions/playback while a timer is
//! armed.

mod helpers;

use helpers::{episode_request, key, rig, session};
use uuid::Uuid;

#[tokio::test]
async fn completed_episodes_drive_a_target_timer_to_completion() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, Some("tv"));

    rig.sessions.set(vec![session(user, "tv", "s-tv")]);
    rig.engine
        .start(key.clone(), episode_request(Some(3)))
        .await
        .unwrap();

    rig.bridge.on_playback_stop(key.clone(), true).await;
    rig.bridge.on_playback_stop(key.clone(), true).await;
    assert!(rig.engine.status(&key).await.is_active);
    assert!(rig.player.stopped().is_empty());

    rig.bridge.on_playback_stop(key.clone(), true).await;
    assert!(!rig.engine.status(&key).await.is_active);
    assert_eq!(rig.player.stopped(), vec!["s-tv".to_string()]);
}

#[tokio::test]
async fn interruption_cancels_a_target_timer_without_stopping_playback() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.sessions.set(vec![session(user, "tv", "s-tv")]);
    rig.engine
        .start(key.clone(), episode_request(Some(3)))
        .await
        .unwrap();

    rig.bridge.on_playback_stop(key.clone(), false).await;

    assert!(!rig.engine.status(&key).await.is_active);
    assert!(rig.player.stopped().is_empty());
}

#[tokio::test]
async fn simple_timer_survives_interruption_and_completes_at_session_end() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.sessions.set(vec![session(user, "tv", "s-tv")]);
    rig.engine
        .start(key.clone(), episode_request(None))
        .await
        .unwrap();

    rig.bridge.on_playback_stop(key.clone(), false).await;
    assert!(rig.engine.status(&key).await.is_active);

    rig.bridge.on_session_end(key.clone()).await;
    assert!(!rig.engine.status(&key).await.is_active);
    assert_eq!(rig.player.stopped(), vec!["s-tv".to_string()]);
}

#[tokio::test]
async fn session_end_leaves_an_unreached_target_timer_running() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.sessions.set(vec![session(user, "tv", "s-tv")]);
    rig.engine
        .start(key.clone(), episode_request(Some(3)))
        .await
        .unwrap();
    rig.bridge.on_playback_stop(key.clone(), true).await;

    rig.bridge.on_session_end(key.clone()).await;

    assert!(rig.engine.status(&key).await.is_active);
    assert_eq!(rig.engine.status(&key).await.episodes_played, Some(1));
}

#[tokio::test]
async fn new_session_is_blocked_while_an_episode_timer_is_armed() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.engine
        .start(key.clone(), episode_request(None))
        .await
        .unwrap();

    rig.bridge.on_session_start(key.clone(), "s-new").await;

    assert_eq!(rig.player.stopped(), vec!["s-new".to_string()]);
    let messages = rig.player.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "s-new");
    assert_eq!(messages[0].1, "Sleep Timer Active");
    // blocking a session does not consume the timer
    assert!(rig.engine.status(&key).await.is_active);
}

#[tokio::test]
async fn new_session_is_not_blocked_by_a_duration_timer() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.engine
        .start(key.clone(), helpers::duration_request(30))
        .await
        .unwrap();

    rig.bridge.on_session_start(key.clone(), "s-new").await;

    assert!(rig.player.stopped().is_empty());
}

#[tokio::test]
async fn playback_start_is_blocked_only_after_the_target_is_reached() {
    let rig = rig();
    let user = Uuid::new_v4();
    let key = key(user, None);

    rig.engine
        .start(key.clone(), episode_request(Some(2)))
        .await
        .unwrap();

    // target not reached yet: playback may proceed
    rig.bridge
        .on_playback_start(key.clone(), "s-1", Some("Episode 2"))
        .await;
    assert!(rig.player.stopped().is_empty());

    rig.engine.increment_episodes(&key).await;
    rig.engine.increment_episodes(&key).await;

    rig.bridge
        .on_playback_start(key.clone(), "s-1", Some("Episode 3"))
        .await;
    assert_eq!(rig.player.stopped(), vec!["s-1".to_string()]);
    // blocking leaves the timer for the lifecycle events to consume
    assert!(rig.engine.status(&key).await.is_active);
}

#[tokio::test]
async fn events_for_unknown_keys_are_ignored() {
    let rig = rig();
    let key = key(Uuid::new_v4(), None);

    rig.bridge.on_playback_start(key.clone(), "s-1", None).await;
    rig.bridge.on_playback_stop(key.clone(), true).await;
    rig.bridge.on_playback_stop(key.clone(), false).await;
    rig.bridge.on_session_start(key.clone(), "s-1").await;
    rig.bridge.on_session_end(key.clone()).await;

    assert!(rig.player.stopped().is_empty());
    assert!(rig.engine.list_all().await.is_empty());
}
