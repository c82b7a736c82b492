//! HTTP API for timer control and playback event webhooks.

pub mod handlers;
pub mod server;

pub use server::{create_router, AppContext};
