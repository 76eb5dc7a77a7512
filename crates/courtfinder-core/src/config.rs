//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend endpoint, the backend's timezone offset and the
//! list of venues to search.
//!
//! Configuration is stored at `~/.config/courtfinder/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_MAX_RATE_LIMIT_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::VenueId;

/// Application name used for config directory paths
const APP_NAME: &str = "courtfinder";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured endpoint
pub const ENDPOINT_ENV_VAR: &str = "COURTFINDER_ENDPOINT";

/// Backend that proxies ActiveSG venue pages
pub const DEFAULT_ENDPOINT: &str = "https://badminton-backend.herokuapp.com/";

/// ActiveSG venues are in Singapore (UTC+8, no DST)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    /// Offset of the backend's local time from UTC, in whole hours
    pub utc_offset_hours: i32,
    pub request_timeout_secs: u64,
    pub max_rate_limit_retries: u32,
    /// Venues to query, in configuration order
    pub venues: Vec<VenueId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
            venues: Vec::new(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults if absent.
    /// `COURTFINDER_ENDPOINT` overrides the endpoint either way.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `COURTFINDER_ENDPOINT` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            if !endpoint.is_empty() {
                self.endpoint = endpoint;
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The backend's timezone as a chrono offset
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                anyhow::anyhow!("utc_offset_hours out of range: {}", self.utc_offset_hours)
            })
    }
}
