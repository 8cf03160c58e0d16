//! Application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! ([`AppConfig::load_from_file`]), then the `GLIDE_HOST`, `GLIDE_PORT` and
//! `GLIDE_DEBUG` environment variables ([`AppConfig::apply_env`]). The
//! application builder can override any of it afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::callback::InvocationPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub title: String,
    pub host: String,
    pub port: u16,
    /// Debug mode logs every trigger and invocation outcome.
    pub debug: bool,
    /// URL prefix assets are served under.
    pub assets_url_path: String,
    /// Directory served at `assets_url_path`; nothing is served when unset.
    pub assets_dir: Option<PathBuf>,
    pub invocation_policy: InvocationPolicy,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "glide".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8050,
            debug: false,
            assets_url_path: "/assets/".to_string(),
            assets_dir: None,
            invocation_policy: InvocationPolicy::default(),
            log_filter: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse_from_str(&contents, &path.display().to_string())
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse { origin: origin.to_string(), source })
    }

    /// Apply `GLIDE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = var("GLIDE_HOST")
            && !host.trim().is_empty()
        {
            self.host = host.trim().to_string();
        }
        if let Some(raw) = var("GLIDE_PORT") {
            self.port = raw.trim().parse().map_err(|_| ConfigError::Env { var: "GLIDE_PORT", value: raw })?;
        }
        if let Some(raw) = var("GLIDE_DEBUG") {
            self.debug = parse_bool(&raw).ok_or(ConfigError::Env { var: "GLIDE_DEBUG", value: raw })?;
        }
        Ok(())
    }

    /// `host:port`, ready for a socket bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Env-style boolean: `1/true/yes/on` and `0/false/no/off`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
