//! # drowse
//!
//! Sleep timer service for media playback.
//!
//! **Purpose:** Let a playback user arm a timer that stops their media
//! session(s) after a duration elapses or after a number of episodes finish,
//! with exactly-once stop semantics under concurrent events.
//!
//! **Architecture:** In-memory timer store + lifecycle engine, a periodic
//! expiry sweeper, an event bridge fed by media server webhooks, and an
//! HTTP/REST control interface. State is ephemeral by design; a restart
//! clears all timers.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod session;
pub mod timer;

pub use error::{Error, Result};
