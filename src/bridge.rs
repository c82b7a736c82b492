//! Playback event bridge
//!
//! Wiring between the media server's playback/session notifications and the
//! timer lifecycle engine. Every handler swallows collaborator failures after
//! logging them; a flaky media server must never poison event delivery.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::session::PlaybackController;
use crate::timer::{SleepTimerEngine, TimerKey};

const MESSAGE_HEADER: &str = "Sleep Timer Active";
const MESSAGE_TIMEOUT_MS: u64 = 5000;

pub struct PlaybackEventBridge {
    engine: Arc<SleepTimerEngine>,
    player: Arc<dyn PlaybackController>,
}

impl PlaybackEventBridge {
    pub fn new(engine: Arc<SleepTimerEngine>, player: Arc<dyn PlaybackController>) -> Self {
        Self { engine, player }
    }

    /// Playback started in a session. When an episode timer for the key has
    /// already reached its target, the new item is stopped on the spot; timer
    /// state is left untouched.
    pub async fn on_playback_start(
        &self,
        key: TimerKey,
        session_id: &str,
        item_name: Option<&str>,
    ) {
        let Some(timer) = self.engine.find(&key).await else {
            return;
        };
        if !timer.target_reached() {
            return;
        }

        info!(
            timer_id = %timer.id,
            session_id,
            item = item_name.unwrap_or("unknown"),
            "blocking playback started after episode target was reached"
        );
        self.block_session(session_id, item_name).await;
    }

    /// Playback stopped. A completed episode advances the counter and, when
    /// that reaches the target, completes the timer; an early stop is a user
    /// interruption and cancels episode-count timers only.
    pub async fn on_playback_stop(&self, key: TimerKey, played_to_completion: bool) {
        if played_to_completion {
            if self.engine.increment_episodes(&key).await {
                self.engine.complete_if_due(&key).await;
            }
        } else if self.engine.handle_interruption(&key).await {
            info!(%key, "episode-count timer cancelled after interruption");
        }
    }

    /// A new session appeared while an episode timer is armed for the key:
    /// stop it immediately so the timer cannot be outrun by opening a fresh
    /// player.
    pub async fn on_session_start(&self, key: TimerKey, session_id: &str) {
        let Some(timer) = self.engine.find(&key).await else {
            return;
        };
        if !timer.is_episode() {
            return;
        }

        info!(
            timer_id = %timer.id,
            session_id,
            "blocking new session while episode timer is armed"
        );
        self.block_session(session_id, None).await;
    }

    /// A session ended. This is the event that completes "after current
    /// episode" timers; episode-count timers only complete here when their
    /// target was already reached.
    pub async fn on_session_end(&self, key: TimerKey) {
        if self.engine.complete_if_due(&key).await {
            info!(%key, "sleep timer completed at session end");
        }
    }

    async fn block_session(&self, session_id: &str, item_name: Option<&str>) {
        if let Err(e) = self.player.stop_playback(session_id).await {
            warn!(session_id, error = %e, "failed to stop blocked session");
            return;
        }

        let text = match item_name {
            Some(name) => format!("Sleep timer has ended playback. '{name}' was stopped."),
            None => "Sleep timer has ended playback.".to_string(),
        };
        if let Err(e) = self
            .player
            .send_message(session_id, MESSAGE_HEADER, &text, MESSAGE_TIMEOUT_MS)
            .await
        {
            debug!(session_id, error = %e, "failed to deliver sleep timer message");
        }
    }
}
