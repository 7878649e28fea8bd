// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Prefix shared by every environment override
const ENV_PREFIX: &str = "BENCHFETCH_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the document-distribution API (technology listing lives under it)
    pub base_url: String,

    /// Host that relative download locations are resolved against
    pub resource_base_url: String,

    /// Root directory the category folders are created in
    pub output_dir: PathBuf,

    /// Upper bound on simultaneous transfers
    pub max_concurrent_downloads: usize,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Optional session cookie (raw `name=value; ...` string) sent with every request
    pub session_cookie: Option<String>,

    /// Skip certificate-chain verification for the remote service.
    /// Only the transport client built from this config is affected.
    pub accept_invalid_certs: bool,

    /// Render per-file progress bars instead of log lines
    pub show_progress: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("BENCHFETCH_CONFIG")
            .unwrap_or_else(|_| "benchfetch.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(Path::new(&config_path))?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply `BENCHFETCH_*` overrides using `lookup` to resolve variable names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(val) = var("BASE_URL") {
            self.base_url = val;
        }
        if let Some(val) = var("RESOURCE_BASE_URL") {
            self.resource_base_url = val;
        }
        if let Some(val) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }
        if let Some(val) = var("MAX_CONCURRENT_DOWNLOADS") {
            self.max_concurrent_downloads = val.parse()?;
        }
        if let Some(val) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = val.parse()?;
        }
        if let Some(val) = var("CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = val.parse()?;
        }
        if let Some(val) = var("USER_AGENT") {
            self.user_agent = val;
        }
        if let Some(val) = var("SESSION_COOKIE") {
            self.session_cookie = Some(val).filter(|v| !v.trim().is_empty());
        }
        if let Some(val) = var("ACCEPT_INVALID_CERTS") {
            self.accept_invalid_certs = val.parse()?;
        }
        if let Some(val) = var("SHOW_PROGRESS") {
            self.show_progress = val.parse()?;
        }
        if let Some(val) = var("LOG_LEVEL") {
            self.log_level = val;
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(anyhow::anyhow!("max_concurrent_downloads must be at least 1"));
        }

        for (field, value) in [("base_url", &self.base_url), ("resource_base_url", &self.resource_base_url)] {
            let url = Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{field} is not a valid URL ({value}): {e}"))?;
            if !crate::utils::is_http_url(&url) {
                return Err(anyhow::anyhow!("{field} must be an http or https URL with a host, got {value}"));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::from("https://downloads.cisecurity.org"),
            resource_base_url: String::from("https://learn.cisecurity.org"),
            output_dir: PathBuf::from("."),
            max_concurrent_downloads: 4,
            request_timeout_secs: 300, // 5 minutes, PDFs can be large
            connect_timeout_secs: 30,
            user_agent: format!("benchfetch/{}", env!("CARGO_PKG_VERSION")),
            session_cookie: None,
            accept_invalid_certs: true,
            show_progress: true,
            log_level: String::from("info"),
        }
    }
}
