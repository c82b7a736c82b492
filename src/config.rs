//! Service configuration
//!
//! Values resolve in priority order: command-line argument, environment
//! variable (both handled by clap in main), TOML config file, compiled
//! default.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5760;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the host media server, e.g. `http://localhost:8096`.
    pub media_server_url: String,
    /// API token for outbound media server requests.
    pub media_server_token: String,
    /// Bearer token guarding the privileged all-timers listing; `None`
    /// disables that endpoint.
    pub admin_token: Option<String>,
    pub sweep_interval: Duration,
}

/// Optional TOML config file contents; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub port: Option<u16>,
    pub media_server_url: Option<String>,
    pub media_server_token: Option<String>,
    pub admin_token: Option<String>,
    pub sweep_interval_secs: Option<u64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

impl Config {
    /// Merge CLI/env values (already combined by clap) over the config file,
    /// then apply defaults and validate.
    pub fn resolve(
        port: Option<u16>,
        media_server_url: Option<String>,
        media_server_token: Option<String>,
        admin_token: Option<String>,
        sweep_interval_secs: Option<u64>,
        file: ConfigFile,
    ) -> Result<Self> {
        let media_server_url = media_server_url.or(file.media_server_url).ok_or_else(|| {
            Error::Config(
                "media server URL is required (--media-server-url or config file)".to_string(),
            )
        })?;
        let media_server_token =
            media_server_token.or(file.media_server_token).ok_or_else(|| {
                Error::Config(
                    "media server API token is required (--media-server-token or config file)"
                        .to_string(),
                )
            })?;

        let sweep_interval_secs = sweep_interval_secs
            .or(file.sweep_interval_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        if sweep_interval_secs == 0 {
            return Err(Error::Config(
                "sweep interval must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            port: port.or(file.port).unwrap_or(DEFAULT_PORT),
            media_server_url,
            media_server_token,
            admin_token: admin_token.or(file.admin_token),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        })
    }
}
