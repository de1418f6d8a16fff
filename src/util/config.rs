use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::github::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub repos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base: u32,
    #[serde(default = "default_true")]
    pub jitter: bool,
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: u32,
    #[serde(default = "default_reset_margin_secs")]
    pub reset_margin_secs: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_comment_delay_ms")]
    pub comment_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_window_days() -> u32 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base() -> u32 {
    2
}
fn default_true() -> bool {
    true
}
fn default_low_water_mark() -> u32 {
    3
}
fn default_reset_margin_secs() -> u64 {
    1
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_page_delay_ms() -> u64 {
    500
}
fn default_comment_delay_ms() -> u64 {
    1000
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repos: Vec::new(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            jitter: true,
            low_water_mark: default_low_water_mark(),
            reset_margin_secs: default_reset_margin_secs(),
            request_delay_ms: default_request_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            comment_delay_ms: default_comment_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_base: self.backoff_base,
            jitter: self.jitter,
            low_water_mark: self.low_water_mark,
            reset_margin: Duration::from_secs(self.reset_margin_secs),
            request_delay: Duration::from_millis(self.request_delay_ms),
            page_delay: Duration::from_millis(self.page_delay_ms),
            comment_delay: Duration::from_millis(self.comment_delay_ms),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::read(path);
        }

        // Search candidate paths in order
        let mut candidates = Vec::new();

        // 1. ~/.config/ghstats/config.toml (standard XDG on all platforms)
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".config/ghstats/config.toml"));
        }

        // 2. Platform-specific path from `directories` crate
        if let Some(proj_dirs) = ProjectDirs::from("", "", "ghstats") {
            candidates.push(proj_dirs.config_dir().join("config.toml"));
        }

        for config_path in &candidates {
            if config_path.exists() {
                return Self::read(config_path);
            }
        }

        Ok(AppConfig::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.github.api_url.starts_with("https://") {
            bail!("GitHub API URL must use HTTPS: {}", self.github.api_url);
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_dir(&self) -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "ghstats") {
            return proj_dirs.data_dir().join("logs");
        }
        PathBuf::from(".local/share/ghstats/logs")
    }
}
