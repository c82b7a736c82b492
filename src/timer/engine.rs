//! Timer lifecycle engine
//!
//! Start, cancel, query, and advance sleep timers, and trigger playback-stop
//! when a timer completes. Collaborators are injected, so the engine can be
//! driven by HTTP handlers, the event bridge, and the sweeper alike.
//!
//! Completion is at-most-once: a timer is claimed out of the store before any
//! stop command is dispatched, and a removal is never rolled back when a stop
//! command later fails.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{PlaybackController, SessionDirectory};

use super::store::TimerStore;
use super::types::{SleepTimer, StartTimerRequest, TimerKey, TimerKind, TimerStatus};

pub struct SleepTimerEngine {
    store: Arc<TimerStore>,
    sessions: Arc<dyn SessionDirectory>,
    player: Arc<dyn PlaybackController>,
}

impl SleepTimerEngine {
    pub fn new(
        store: Arc<TimerStore>,
        sessions: Arc<dyn SessionDirectory>,
        player: Arc<dyn PlaybackController>,
    ) -> Self {
        Self {
            store,
            sessions,
            player,
        }
    }

    /// Arm a timer for `key`, silently replacing any existing one.
    ///
    /// Rejects with `Error::InvalidRequest` before touching any state when the
    /// type is unknown, a duration timer has no positive duration, or an
    /// explicit episode target is non-positive.
    pub async fn start(&self, key: TimerKey, request: StartTimerRequest) -> Result<SleepTimer> {
        let kind = kind_from_request(&request)?;

        // replacement is silent: the caller is not told about the old timer
        if self.cancel(&key).await {
            debug!(%key, "replaced existing sleep timer");
        }

        let timer = SleepTimer {
            id: Uuid::new_v4(),
            key: key.clone(),
            kind,
            episodes_played: 0,
            label: request.label,
            created_at: Utc::now(),
        };
        self.store.put(timer.clone()).await;

        info!(
            timer_id = %timer.id,
            %key,
            kind = %timer.kind,
            label = timer.label.as_deref().unwrap_or(""),
            "started sleep timer"
        );

        Ok(timer)
    }

    /// Remove the timer for `key`. Returns whether one was present. Sends no
    /// playback command; cancellation does not imply anything is playing.
    pub async fn cancel(&self, key: &TimerKey) -> bool {
        match self.store.remove(key).await {
            Some(timer) => {
                info!(timer_id = %timer.id, %key, "cancelled sleep timer");
                true
            }
            None => false,
        }
    }

    /// Read-only status for `key`. Never errors, never triggers completion;
    /// expiry detection belongs to the sweeper and the event bridge.
    pub async fn status(&self, key: &TimerKey) -> TimerStatus {
        match self.store.get(key).await {
            Some(timer) => TimerStatus::from_timer(&timer),
            None => TimerStatus::inactive(),
        }
    }

    /// The active timer for `key`, if any.
    pub async fn find(&self, key: &TimerKey) -> Option<SleepTimer> {
        self.store.get(key).await
    }

    /// Snapshot of every active timer across all keys (privileged surface).
    pub async fn list_all(&self) -> Vec<SleepTimer> {
        self.store.snapshot().await
    }

    /// Record a completed episode for `key`'s episode timer.
    ///
    /// Returns whether an explicit target has now been reached; always false
    /// for "after current episode" timers, whose completion is driven by
    /// `complete_if_due` instead. Increments for the same key are serialized
    /// through the store's per-key lock so rapid duplicate notifications
    /// cannot lose an update; different keys proceed in parallel.
    pub async fn increment_episodes(&self, key: &TimerKey) -> bool {
        let lock = self.store.key_lock(key).await;
        let _guard = lock.lock().await;

        let advanced = self
            .store
            .modify(key, |timer| match timer.kind {
                TimerKind::Episode { target } => {
                    timer.episodes_played += 1;
                    Some((timer.episodes_played, target))
                }
                TimerKind::Duration { .. } => None,
            })
            .await
            .flatten();

        match advanced {
            Some((played, target)) => {
                info!(%key, played, target = ?target, "episode completed");
                target.is_some_and(|target| played >= target)
            }
            None => {
                debug!(%key, "no active episode timer to advance");
                false
            }
        }
    }

    /// Central completion trigger for episode timers, called when an episode
    /// finishes or a session ends.
    ///
    /// Target-bearing timers trigger only once the target is reached;
    /// target-less timers trigger unconditionally. On trigger the timer is
    /// claimed out of the store first, then playback is stopped for every
    /// matching live session. Returns whether a trigger happened.
    pub async fn complete_if_due(&self, key: &TimerKey) -> bool {
        let Some(timer) = self.store.get(key).await else {
            return false;
        };

        match timer.kind {
            TimerKind::Duration { .. } => false,
            TimerKind::Episode { target: Some(target) } if timer.episodes_played < target => {
                debug!(
                    timer_id = %timer.id,
                    played = timer.episodes_played,
                    target,
                    "episode target not reached yet"
                );
                false
            }
            TimerKind::Episode { .. } => {
                // claim before dispatch so a concurrent trigger cannot stop twice
                if self.store.remove_if_id(key, timer.id).await.is_none() {
                    return false;
                }
                info!(timer_id = %timer.id, %key, "sleep timer complete, stopping playback");
                self.stop_playback_for(key).await;
                true
            }
        }
    }

    /// Playback stopped without reaching the end of the item.
    ///
    /// Interrupting mid-sequence abandons a multi-episode goal, so timers with
    /// an explicit target are cancelled. A target-less timer stays armed: its
    /// condition is "the episode ends", however it ends. Returns whether a
    /// timer was cancelled.
    pub async fn handle_interruption(&self, key: &TimerKey) -> bool {
        let Some(timer) = self.store.get(key).await else {
            return false;
        };

        match timer.kind {
            TimerKind::Episode { target: Some(target) } => {
                info!(
                    timer_id = %timer.id,
                    %key,
                    played = timer.episodes_played,
                    target,
                    "playback interrupted, cancelling episode-count timer"
                );
                self.store.remove_if_id(key, timer.id).await.is_some()
            }
            TimerKind::Episode { target: None } => {
                debug!(
                    timer_id = %timer.id,
                    "playback interrupted, keeping after-current-episode timer"
                );
                false
            }
            TimerKind::Duration { .. } => false,
        }
    }

    /// One sweep pass: remove expired timers and timers whose owning
    /// user/device no longer has a live session.
    ///
    /// Only duration timers past their deadline cause a playback-stop;
    /// episode expiry is dispatched through `complete_if_due`, and a vanished
    /// session has nothing left to stop. When the session lookup fails, the
    /// dead-session check is skipped for this pass rather than removing
    /// timers on bad information.
    pub async fn sweep(&self) -> Result<()> {
        let timers = self.store.snapshot().await;
        if timers.is_empty() {
            return Ok(());
        }

        let live = match self.sessions.live_sessions().await {
            Ok(sessions) => Some(sessions),
            Err(e) => {
                warn!(error = %e, "session lookup failed, skipping dead-session detection");
                None
            }
        };

        for timer in timers {
            let expired = timer.is_expired();
            let orphaned = live
                .as_ref()
                .is_some_and(|sessions| !sessions.iter().any(|s| s.matches(&timer.key)));

            if !expired && !orphaned {
                continue;
            }

            if expired && matches!(timer.kind, TimerKind::Duration { .. }) {
                info!(
                    timer_id = %timer.id,
                    key = %timer.key,
                    "duration timer expired, stopping playback"
                );
                self.stop_playback_for(&timer.key).await;
            } else if orphaned && !expired {
                info!(
                    timer_id = %timer.id,
                    key = %timer.key,
                    "no live session for timer, removing"
                );
            }

            self.store.remove_if_id(&timer.key, timer.id).await;
        }

        Ok(())
    }

    /// Stop playback on every live session matching `key`. A failure for one
    /// session is logged and does not abort the remaining sessions.
    async fn stop_playback_for(&self, key: &TimerKey) {
        let sessions = match self.sessions.live_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(%key, error = %e, "failed to list sessions while stopping playback");
                return;
            }
        };

        let matching: Vec<_> = sessions.into_iter().filter(|s| s.matches(key)).collect();
        info!(count = matching.len(), %key, "stopping playback sessions");

        for session in matching {
            if let Err(e) = self.player.stop_playback(&session.session_id).await {
                warn!(
                    session_id = %session.session_id,
                    error = %e,
                    "failed to stop playback for session"
                );
            }
        }
    }
}

/// Validate a start request and build the timer kind from it.
fn kind_from_request(request: &StartTimerRequest) -> Result<TimerKind> {
    match request.timer_type.as_str() {
        "duration" => {
            let minutes = request
                .duration
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| {
                    Error::InvalidRequest(
                        "duration timers require a positive duration in minutes".to_string(),
                    )
                })?;
            let end_time = request
                .end_time
                .unwrap_or_else(|| Utc::now() + Duration::minutes(minutes));
            Ok(TimerKind::Duration {
                duration_minutes: minutes,
                end_time,
            })
        }
        "episode" => {
            let target = match request.episode_count {
                None => None,
                Some(count) if count > 0 => Some(u32::try_from(count).map_err(|_| {
                    Error::InvalidRequest("episode count out of range".to_string())
                })?),
                Some(_) => {
                    return Err(Error::InvalidRequest(
                        "episode count must be greater than 0".to_string(),
                    ))
                }
            };
            Ok(TimerKind::Episode { target })
        }
        other => Err(Error::InvalidRequest(format!(
            "timer type must be 'duration' or 'episode', got '{other}'"
        ))),
    }
}
