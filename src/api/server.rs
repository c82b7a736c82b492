//! HTTP server setup and routing
//!
//! Builds the Axum router for timer control, event webhooks, and health.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::bridge::PlaybackEventBridge;
use crate::timer::SleepTimerEngine;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us `FromRef<AppContext>`
/// for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<SleepTimerEngine>,
    pub bridge: Arc<PlaybackEventBridge>,
    /// Bearer token guarding the all-timers listing; `None` disables it.
    pub admin_token: Option<String>,
}

/// Build the application router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Timer control
        .route("/timer/start", post(super::handlers::start_timer))
        .route("/timer/cancel", post(super::handlers::cancel_timer))
        .route("/timer/status", get(super::handlers::timer_status))
        .route("/timers", get(super::handlers::list_timers))
        // Playback event webhooks
        .route("/events/playback-start", post(super::handlers::playback_started))
        .route("/events/playback-stop", post(super::handlers::playback_stopped))
        .route("/events/session-start", post(super::handlers::session_started))
        .route("/events/session-end", post(super::handlers::session_ended))
        // Attach application context
        .with_state(ctx)
        // Request tracing
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
