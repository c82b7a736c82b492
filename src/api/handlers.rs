//! HTTP request handlers
//!
//! Timer control endpoints, the playback event webhooks, and the health
//! check. Identity is taken from headers stamped by the trusted front end; a
//! missing or unparseable user id is rejected before any handler runs.

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::server::AppContext;
use crate::error::Error;
use crate::timer::{SleepTimer, StartTimerRequest, TimerKey, TimerKind, TimerStatus};

/// Header carrying the caller's opaque user id (a UUID).
pub const USER_ID_HEADER: &str = "x-drowse-userid";
/// Header carrying the caller's device id; absent means "any device".
pub const DEVICE_ID_HEADER: &str = "x-drowse-deviceid";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerResponse {
    pub success: bool,
    pub timer_id: Uuid,
    #[serde(rename = "type")]
    pub timer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub message: String,
}

impl StartTimerResponse {
    fn from_timer(timer: &SleepTimer) -> Self {
        let (duration, end_time, episode_count) = match timer.kind {
            TimerKind::Duration {
                duration_minutes,
                end_time,
            } => (Some(duration_minutes), Some(end_time), None),
            TimerKind::Episode { target } => (None, None, target),
        };
        let message = format!(
            "Sleep timer started: {}",
            timer.label.as_deref().unwrap_or(timer.kind.as_str())
        );

        Self {
            success: true,
            timer_id: timer.id,
            timer_type: timer.kind.as_str().to_string(),
            duration,
            episode_count,
            end_time,
            label: timer.label.clone(),
            message,
        }
    }
}

/// One entry in the privileged all-timers listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedTimer {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(flatten)]
    pub status: TimerStatus,
}

impl ListedTimer {
    fn from_timer(timer: &SleepTimer) -> Self {
        Self {
            user_id: timer.key.user_id,
            device_id: timer.key.device_id.clone(),
            status: TimerStatus::from_timer(timer),
        }
    }
}

/// Webhook payload for playback/session notifications from the media server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventPayload {
    pub user_id: Uuid,
    #[serde(default)]
    pub device_id: Option<String>,
    pub session_id: String,
    /// Only meaningful for playback-stop; an absent field reads as an early
    /// interruption.
    #[serde(default)]
    pub played_to_completion: bool,
    #[serde(default)]
    pub item_name: Option<String>,
}

impl SessionEventPayload {
    fn key(&self) -> TimerKey {
        TimerKey::new(self.user_id, self.device_id.clone())
    }
}

// ============================================================================
// Identity Extraction
// ============================================================================

/// Caller identity resolved from the trusted front-end headers.
///
/// A missing or malformed user id is a 400, distinct from the perfectly valid
/// "known user, no timer" outcome.
pub struct CallerIdentity {
    pub key: TimerKey,
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("invalid user identity")),
                )
            })?;

        let device_id = parts
            .headers
            .get(DEVICE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(CallerIdentity {
            key: TimerKey::new(user_id, device_id),
        })
    }
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "drowse".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Timer Endpoints
// ============================================================================

/// POST /timer/start - Arm a sleep timer for the caller
pub async fn start_timer(
    State(ctx): State<AppContext>,
    identity: CallerIdentity,
    Json(request): Json<StartTimerRequest>,
) -> Result<Json<StartTimerResponse>, (StatusCode, Json<ErrorResponse>)> {
    match ctx.engine.start(identity.key, request).await {
        Ok(timer) => Ok(Json(StartTimerResponse::from_timer(&timer))),
        Err(Error::InvalidRequest(reason)) => {
            warn!(%reason, "rejected sleep timer request");
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(reason))))
        }
        Err(e) => {
            error!(error = %e, "failed to start sleep timer");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal error")),
            ))
        }
    }
}

/// POST /timer/cancel - Cancel the caller's active timer
pub async fn cancel_timer(
    State(ctx): State<AppContext>,
    identity: CallerIdentity,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    if ctx.engine.cancel(&identity.key).await {
        Ok(Json(MessageResponse {
            message: "sleep timer cancelled".to_string(),
        }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("no active timer")),
        ))
    }
}

/// GET /timer/status - Status of the caller's timer; inactive is a valid
/// result, not an error
pub async fn timer_status(
    State(ctx): State<AppContext>,
    identity: CallerIdentity,
) -> Json<TimerStatus> {
    Json(ctx.engine.status(&identity.key).await)
}

/// GET /timers - All active timers across all users; requires the admin token
pub async fn list_timers(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<ListedTimer>>, (StatusCode, Json<ErrorResponse>)> {
    let authorized = ctx.admin_token.as_deref().is_some_and(|token| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            == Some(token)
    });
    if !authorized {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("administrator token required")),
        ));
    }

    let timers = ctx.engine.list_all().await;
    Ok(Json(timers.iter().map(ListedTimer::from_timer).collect()))
}

// ============================================================================
// Playback Event Webhooks
// ============================================================================

/// POST /events/playback-start
pub async fn playback_started(
    State(ctx): State<AppContext>,
    Json(event): Json<SessionEventPayload>,
) -> StatusCode {
    ctx.bridge
        .on_playback_start(event.key(), &event.session_id, event.item_name.as_deref())
        .await;
    StatusCode::OK
}

/// POST /events/playback-stop
pub async fn playback_stopped(
    State(ctx): State<AppContext>,
    Json(event): Json<SessionEventPayload>,
) -> StatusCode {
    info!(
        user_id = %event.user_id,
        session_id = %event.session_id,
        played_to_completion = event.played_to_completion,
        "playback stopped"
    );
    ctx.bridge
        .on_playback_stop(event.key(), event.played_to_completion)
        .await;
    StatusCode::OK
}

/// POST /events/session-start
pub async fn session_started(
    State(ctx): State<AppContext>,
    Json(event): Json<SessionEventPayload>,
) -> StatusCode {
    ctx.bridge
        .on_session_start(event.key(), &event.session_id)
        .await;
    StatusCode::OK
}

/// POST /events/session-end
pub async fn session_ended(
    State(ctx): State<AppContext>,
    Json(event): Json<SessionEventPayload>,
) -> StatusCode {
    ctx.bridge.on_session_end(event.key()).await;
    StatusCode::OK
}
