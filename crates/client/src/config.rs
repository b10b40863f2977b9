// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from `config.toml` in the user config directory
//! (`$XDG_CONFIG_HOME/palaver/` on Linux) and includes:
//! - `url`: WebSocket endpoint of the conversation service
//! - `token`: optional bearer credential
//! - `[reconnect]`, `[publish]`, `[dedup]`: sync layer policies
//!
//! Every field has a default, so an empty or missing file is valid.
//! `PALAVER_URL` and `PALAVER_TOKEN` override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{BackoffPolicy, DedupPolicy, Endpoint, PublishPolicy, SessionConfig};

const CONFIG_DIR_NAME: &str = "palaver";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket endpoint (`ws://` or `wss://`).
    #[serde(default = "default_url")]
    pub url: String,
    /// Bearer credential sent when connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Topic that marks raw media frames.
    #[serde(default = "default_media_topic")]
    pub media_topic: String,
    #[serde(default)]
    pub reconnect: BackoffPolicy,
    #[serde(default)]
    pub publish: PublishPolicy,
    #[serde(default)]
    pub dedup: DedupPolicy,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_media_topic() -> String {
    pv_core::MEDIA_TOPIC.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: default_url(),
            token: None,
            media_topic: default_media_topic(),
            reconnect: BackoffPolicy::default(),
            publish: PublishPolicy::default(),
            dedup: DedupPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Loads the configuration the client should run with.
    ///
    /// An explicit path (argument, then `PALAVER_CONFIG`) must exist. The
    /// default location may be absent, in which case defaults apply.
    /// Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit.map(Path::to_path_buf).or_else(env::config_path);
        let mut config = match explicit {
            Some(path) => Self::load(&path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => Config::default(),
            },
        };
        config.apply_overrides(env::url(), env::token());
        Ok(config)
    }

    /// Replaces the URL and token when values are given.
    pub fn apply_overrides(&mut self, url: Option<String>, token: Option<String>) {
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(token) = token {
            self.token = Some(token);
        }
    }

    /// Checks values the sync layer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::InvalidUrl(self.url.clone()));
        }
        let factor = self.reconnect.backoff_factor;
        if factor.is_nan() || factor < 1.0 {
            return Err(Error::InvalidSetting {
                field: "reconnect.backoff_factor",
                requirement: "at least 1.0",
            });
        }
        if self.publish.max_attempts == 0 {
            return Err(Error::InvalidSetting {
                field: "publish.max_attempts",
                requirement: "at least 1",
            });
        }
        if self.dedup.window_ms == 0 {
            return Err(Error::InvalidSetting {
                field: "dedup.window_ms",
                requirement: "greater than 0",
            });
        }
        if self.media_topic.is_empty() {
            return Err(Error::InvalidSetting { field: "media_topic", requirement: "non-empty" });
        }
        Ok(())
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }

    /// Builds the session settings described by this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: Endpoint::new(self.url.clone(), self.token.clone()),
            reconnect: self.reconnect,
            publish: self.publish,
            dedup: self.dedup,
            media_topic: self.media_topic.clone(),
        }
    }
}

/// Default location of the config file, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
