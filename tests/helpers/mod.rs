//! Shared test fixtures: in-memory collaborator fakes and a wired-up engine.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use drowse::bridge::PlaybackEventBridge;
use drowse::error::{Error, Result};
use drowse::session::{PlaybackController, PlayerSession, SessionDirectory};
use drowse::timer::{SleepTimerEngine, TimerKey, TimerStore};

/// Session directory backed by a list the test can edit.
#[derive(Default)]
pub struct FakeSessions {
    sessions: Mutex<Vec<PlayerSession>>,
    failing: Mutex<bool>,
}

impl FakeSessions {
    pub fn set(&self, sessions: Vec<PlayerSession>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    /// Make `live_sessions` fail until reset, simulating a media server outage.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl SessionDirectory for FakeSessions {
    async fn live_sessions(&self) -> Result<Vec<PlayerSession>> {
        if *self.failing.lock().unwrap() {
            return Err(Error::MediaServer("session lookup unavailable".to_string()));
        }
        Ok(self.sessions.lock().unwrap().clone())
    }
}

/// Playback controller that records every command it receives.
#[derive(Default)]
pub struct RecordingPlayer {
    stopped: Mutex<Vec<String>>,
    messages: Mutex<Vec<(String, String)>>,
    fail_stop_for: Mutex<Option<String>>,
}

impl RecordingPlayer {
    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Make `stop_playback` fail for one session id.
    pub fn fail_stop_for(&self, session_id: &str) {
        *self.fail_stop_for.lock().unwrap() = Some(session_id.to_string());
    }
}

#[async_trait]
impl PlaybackController for RecordingPlayer {
    async fn stop_playback(&self, session_id: &str) -> Result<()> {
        if self.fail_stop_for.lock().unwrap().as_deref() == Some(session_id) {
            return Err(Error::MediaServer("stop rejected".to_string()));
        }
        self.stopped.lock().unwrap().push(session_id.to_string());
        Ok(())
    }

    async fn send_message(
        &self,
        session_id: &str,
        header: &str,
        _text: &str,
        _timeout_ms: u64,
    ) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((session_id.to_string(), header.to_string()));
        Ok(())
    }
}

/// Fully wired engine + bridge over fake collaborators.
pub struct TestRig {
    pub store: Arc<TimerStore>,
    pub engine: Arc<SleepTimerEngine>,
    pub bridge: Arc<PlaybackEventBridge>,
    pub sessions: Arc<FakeSessions>,
    pub player: Arc<RecordingPlayer>,
}

pub fn rig() -> TestRig {
    let sessions = Arc::new(FakeSessions::default());
    let player = Arc::new(RecordingPlayer::default());
    let store = Arc::new(TimerStore::new());
    let engine = Arc::new(SleepTimerEngine::new(
        store.clone(),
        sessions.clone(),
        player.clone(),
    ));
    let bridge = Arc::new(PlaybackEventBridge::new(engine.clone(), player.clone()));

    TestRig {
        store,
        engine,
        bridge,
        sessions,
        player,
    }
}

pub fn session(user_id: Uuid, device_id: &str, session_id: &str) -> PlayerSession {
    PlayerSession {
        session_id: session_id.to_string(),
        user_id,
        device_id: device_id.to_string(),
    }
}

pub fn key(user_id: Uuid, device_id: Option<&str>) -> TimerKey {
    TimerKey::new(user_id, device_id.map(str::to_string))
}

pub fn duration_request(minutes: i64) -> drowse::timer::StartTimerRequest {
    drowse::timer::StartTimerRequest {
        timer_type: "duration".to_string(),
        duration: Some(minutes),
        episode_count: None,
        label: None,
        end_time: None,
    }
}

pub fn episode_request(target: Option<i64>) -> drowse::timer::StartTimerRequest {
    drowse::timer::StartTimerRequest {
        timer_type: "episode".to_string(),
        duration: None,
        episode_count: target,
        label: None,
        end_time: None,
    }
}
