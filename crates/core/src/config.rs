use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelqError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub dataset: Option<String>,
    pub debug: bool,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            dataset: None,
            debug: false,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides();
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    /// Check that an upstream can actually be reached with this config.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.as_deref().is_none_or(str::is_empty) {
            return Err(TelqError::Config(
                "auth token is required (set TELQ_AUTH_TOKEN)".to_string(),
            ));
        }

        let Some(base_url) = self.base_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(TelqError::Config(
                "base url is required (set TELQ_BASE_URL)".to_string(),
            ));
        };

        if base_url.starts_with("https://") || is_loopback_http(base_url) {
            Ok(())
        } else {
            Err(TelqError::Config(format!(
                "base url must use https (plain http only for loopback hosts): {base_url}"
            )))
        }
    }
}

fn is_loopback_http(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("http://") else {
        return false;
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = if authority.starts_with('[') {
        authority
            .split_once(']')
            .map(|(h, _)| h.trim_start_matches('['))
            .unwrap_or(authority)
    } else {
        authority.split(':').next().unwrap_or(authority)
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    base_url: Option<String>,
    auth_token: Option<String>,
    dataset: Option<String>,
    debug: Option<bool>,
    request_timeout: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TELQ_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("telq/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TelqError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TelqError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        base_url: env::var("TELQ_BASE_URL").ok(),
        auth_token: env::var("TELQ_AUTH_TOKEN").ok(),
        dataset: env::var("TELQ_DATASET").ok(),
        debug: env::var("TELQ_DEBUG").ok().map(|v| parse_bool(&v)),
        request_timeout: env::var("TELQ_TIMEOUT").ok(),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.base_url {
        cfg.base_url = Some(v.trim_end_matches('/').to_string());
    }
    if let Some(v) = overrides.auth_token {
        cfg.auth_token = Some(v);
    }
    if let Some(v) = overrides.dataset {
        cfg.dataset = Some(v).filter(|d| !d.is_empty());
    }
    if let Some(v) = overrides.debug {
        cfg.debug = v;
    }
    if let Some(v) = overrides.request_timeout {
        cfg.request_timeout = humantime::parse_duration(&v).map_err(|e| {
            TelqError::Config(format!("bad request_timeout in {source}: {e} (value={v})"))
        })?;
    }
    Ok(())
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
