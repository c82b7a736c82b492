//! Sleep timer data model
//!
//! A timer is owned by a (user, device) key and is either duration-based
//! (absolute deadline) or episode-based (stop after the current episode, or
//! after an explicit number of completed episodes). A timer is active exactly
//! as long as it is present in the store; there is no retained-inactive state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composite identity for timer ownership.
///
/// An empty device id means "any device": the timer applies to every session
/// the user has. Keys are equal only when both fields match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub user_id: Uuid,
    pub device_id: String,
}

impl TimerKey {
    /// Build a key, normalizing an absent device id to the empty string.
    pub fn new(user_id: Uuid, device_id: Option<String>) -> Self {
        Self {
            user_id,
            device_id: device_id.unwrap_or_default(),
        }
    }

    /// True when the key does not pin a specific device.
    pub fn any_device(&self) -> bool {
        self.device_id.is_empty()
    }
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.device_id)
    }
}

/// Timer kind with kind-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Stop playback once the wall clock reaches `end_time`.
    Duration {
        duration_minutes: i64,
        end_time: DateTime<Utc>,
    },
    /// Stop playback after episodes finish. `target: None` means "after the
    /// current episode"; `Some(n)` means after `n` completed episodes.
    Episode { target: Option<u32> },
}

impl TimerKind {
    /// Wire name of the kind ("duration" or "episode").
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Duration { .. } => "duration",
            TimerKind::Episode { .. } => "episode",
        }
    }
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An armed sleep timer.
#[derive(Debug, Clone)]
pub struct SleepTimer {
    /// Unique token generated at creation, immutable.
    pub id: Uuid,
    /// Owning (user, device) key.
    pub key: TimerKey,
    pub kind: TimerKind,
    /// Completed episodes observed while this timer existed. Monotonically
    /// non-decreasing.
    pub episodes_played: u32,
    /// Optional display-only label.
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SleepTimer {
    pub fn is_episode(&self) -> bool {
        matches!(self.kind, TimerKind::Episode { .. })
    }

    /// True for episode timers carrying an explicit target count.
    pub fn has_episode_target(&self) -> bool {
        matches!(self.kind, TimerKind::Episode { target: Some(_) })
    }

    /// True once an explicit episode target has been reached. Always false
    /// for duration timers and for "after current episode" timers.
    pub fn target_reached(&self) -> bool {
        match self.kind {
            TimerKind::Episode { target: Some(target) } => self.episodes_played >= target,
            _ => false,
        }
    }

    /// Whether the timer is past its trigger condition: duration timers past
    /// their deadline, episode timers with a reached target.
    pub fn is_expired(&self) -> bool {
        match self.kind {
            TimerKind::Duration { end_time, .. } => Utc::now() >= end_time,
            TimerKind::Episode { target } => {
                target.is_some_and(|target| self.episodes_played >= target)
            }
        }
    }

    /// Minutes until the deadline, rounded up, floored at 0 once passed.
    /// `None` for episode timers.
    pub fn remaining_minutes(&self) -> Option<i64> {
        match self.kind {
            TimerKind::Duration { end_time, .. } => {
                let remaining = end_time.signed_duration_since(Utc::now());
                if remaining > Duration::zero() {
                    Some((remaining.num_milliseconds() + 59_999) / 60_000)
                } else {
                    Some(0)
                }
            }
            TimerKind::Episode { .. } => None,
        }
    }

    /// Episodes left before the target, floored at 0. `None` when the timer
    /// has no explicit target.
    pub fn remaining_episodes(&self) -> Option<u32> {
        match self.kind {
            TimerKind::Episode { target: Some(target) } => {
                Some(target.saturating_sub(self.episodes_played))
            }
            _ => None,
        }
    }
}

/// Request body for starting a timer.
///
/// The type is carried as a string so that validation (and its error
/// reporting) happens in the lifecycle engine rather than at deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerRequest {
    #[serde(rename = "type")]
    pub timer_type: String,
    /// Duration in minutes, required for duration timers.
    #[serde(default)]
    pub duration: Option<i64>,
    /// Explicit episode target; absent means "after the current episode".
    #[serde(default)]
    pub episode_count: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    /// Optional explicit deadline overriding `now + duration`.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Read-only status projection returned to clients.
///
/// Pure view of a timer; building one never mutates state or triggers
/// completion.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<Uuid>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub timer_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_played: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_episodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TimerStatus {
    /// Status for a key with no timer.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Project an active timer into its client-facing view.
    pub fn from_timer(timer: &SleepTimer) -> Self {
        let (duration, end_time) = match timer.kind {
            TimerKind::Duration {
                duration_minutes,
                end_time,
            } => (Some(duration_minutes), Some(end_time)),
            TimerKind::Episode { .. } => (None, None),
        };
        let (episode_count, episodes_played) = match timer.kind {
            TimerKind::Episode { target } => (target, Some(timer.episodes_played)),
            TimerKind::Duration { .. } => (None, None),
        };

        Self {
            is_active: true,
            timer_id: Some(timer.id),
            timer_type: Some(timer.kind.as_str().to_string()),
            duration,
            episode_count,
            episodes_played,
            end_time,
            remaining_minutes: timer.remaining_minutes(),
            remaining_episodes: timer.remaining_episodes(),
            label: timer.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duration_timer(end_time: DateTime<Utc>) -> SleepTimer {
        SleepTimer {
            id: Uuid::new_v4(),
            key: TimerKey::new(Uuid::new_v4(), None),
            kind: TimerKind::Duration {
                duration_minutes: 15,
                end_time,
            },
            episodes_played: 0,
            label: None,
            created_at: Utc::now(),
        }
    }

    fn episode_timer(target: Option<u32>, played: u32) -> SleepTimer {
        SleepTimer {
            id: Uuid::new_v4(),
            key: TimerKey::new(Uuid::new_v4(), Some("tv".to_string())),
            kind: TimerKind::Episode { target },
            episodes_played: played,
            label: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn key_equality_is_exact() {
        let user = Uuid::new_v4();
        let a = TimerKey::new(user, Some("tv".to_string()));
        let b = TimerKey::new(user, Some("tv".to_string()));
        let c = TimerKey::new(user, None);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c.any_device());
        assert!(!a.any_device());
    }

    #[test]
    fn remaining_minutes_rounds_up() {
        let timer = duration_timer(Utc::now() + Duration::minutes(15));
        assert_eq!(timer.remaining_minutes(), Some(15));

        // 14m30s left still reads as 15 minutes
        let timer = duration_timer(Utc::now() + Duration::seconds(14 * 60 + 30));
        assert_eq!(timer.remaining_minutes(), Some(15));

        // sub-minute remainder reads as 1, not 0
        let timer = duration_timer(Utc::now() + Duration::seconds(20));
        assert_eq!(timer.remaining_minutes(), Some(1));
    }

    #[test]
    fn remaining_minutes_floors_at_zero() {
        let timer = duration_timer(Utc::now() - Duration::minutes(5));
        assert_eq!(timer.remaining_minutes(), Some(0));
        assert!(timer.is_expired());
    }

    #[test]
    fn episode_timer_has_no_remaining_minutes() {
        let timer = episode_timer(Some(3), 0);
        assert_eq!(timer.remaining_minutes(), None);
    }

    #[test]
    fn remaining_episodes_floors_at_zero() {
        let timer = episode_timer(Some(3), 1);
        assert_eq!(timer.remaining_episodes(), Some(2));

        let timer = episode_timer(Some(3), 5);
        assert_eq!(timer.remaining_episodes(), Some(0));
        assert!(timer.target_reached());

        let timer = episode_timer(None, 4);
        assert_eq!(timer.remaining_episodes(), None);
        assert!(!timer.target_reached());
    }

    #[test]
    fn simple_episode_timer_never_expires_on_its_own() {
        // completion for target-less timers is event-driven, not sweep-driven
        let timer = episode_timer(None, 10);
        assert!(!timer.is_expired());
    }

    #[test]
    fn status_projection_matches_kind() {
        let timer = episode_timer(Some(3), 1);
        let status = TimerStatus::from_timer(&timer);
        assert!(status.is_active);
        assert_eq!(status.timer_type.as_deref(), Some("episode"));
        assert_eq!(status.episode_count, Some(3));
        assert_eq!(status.episodes_played, Some(1));
        assert_eq!(status.remaining_episodes, Some(2));
        assert!(status.end_time.is_none());
        assert!(status.duration.is_none());

        let timer = duration_timer(Utc::now() + Duration::minutes(15));
        let status = TimerStatus::from_timer(&timer);
        assert_eq!(status.timer_type.as_deref(), Some("duration"));
        assert_eq!(status.duration, Some(15));
        assert!(status.end_time.is_some());
        assert!(status.episode_count.is_none());
        assert!(status.episodes_played.is_none());
    }

    #[test]
    fn inactive_status_serializes_minimal() {
        let json = serde_json::to_value(TimerStatus::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "isActive": false }));
    }

    #[test]
    fn start_request_accepts_camel_case() {
        let request: StartTimerRequest = serde_json::from_str(
            r#"{"type":"episode","episodeCount":3,"label":"tonight"}"#,
        )
        .unwrap();
        assert_eq!(request.timer_type, "episode");
        assert_eq!(request.episode_count, Some(3));
        assert_eq!(request.label.as_deref(), Some("tonight"));
        assert!(request.duration.is_none());
        assert!(request.end_time.is_none());
    }
}
