//! Configuration loader and validator for the outreach tool.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub reddit: Reddit,
    pub outreach: Outreach,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Name of the report rows are appended to.
    pub report_name: String,
}

/// Reddit script-app credentials and request limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reddit {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Message templates and ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outreach {
    /// Empty means "ask on startup".
    #[serde(default)]
    pub poster_template: String,
    #[serde(default)]
    pub commenter_template: String,
    #[serde(default = "default_post_placeholder")]
    pub post_placeholder: String,
    #[serde(default = "default_comment_placeholder")]
    pub comment_placeholder: String,
    #[serde(default = "default_top_commenters")]
    pub top_commenters: usize,
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_post_placeholder() -> String {
    "link of the post".to_string()
}

fn default_comment_placeholder() -> String {
    "link of the comment".to_string()
}

fn default_top_commenters() -> usize {
    crate::model::COMMENTER_SLOTS
}

impl App {
    /// `data_dir` with a leading `~/` expanded against `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{}/{}", home.trim_end_matches('/'), rest);
            }
        }
        self.data_dir.clone()
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }

    /// SQLite URL of the report store; `DATABASE_URL` wins when set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/outreach.db", self.app.resolved_data_dir()))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.report_name.trim().is_empty() {
        return Err(ConfigError::Invalid("app.report_name must be non-empty"));
    }

    if cfg.reddit.client_id.trim().is_empty() {
        return Err(ConfigError::Invalid("reddit.client_id must be non-empty"));
    }
    if cfg.reddit.client_secret.trim().is_empty() {
        return Err(ConfigError::Invalid("reddit.client_secret must be non-empty"));
    }
    if cfg.reddit.username.trim().is_empty() {
        return Err(ConfigError::Invalid("reddit.username must be non-empty"));
    }
    if cfg.reddit.password.is_empty() {
        return Err(ConfigError::Invalid("reddit.password must be non-empty"));
    }
    if cfg.reddit.probe_timeout_ms == 0 {
        return Err(ConfigError::Invalid("reddit.probe_timeout_ms must be > 0"));
    }
    if cfg.reddit.request_timeout_ms == 0 {
        return Err(ConfigError::Invalid("reddit.request_timeout_ms must be > 0"));
    }

    if cfg.outreach.post_placeholder.is_empty() {
        return Err(ConfigError::Invalid("outreach.post_placeholder must be non-empty"));
    }
    if cfg.outreach.comment_placeholder.is_empty() {
        return Err(ConfigError::Invalid("outreach.comment_placeholder must be non-empty"));
    }
    if cfg.outreach.top_commenters == 0 || cfg.outreach.top_commenters > crate::model::COMMENTER_SLOTS {
        return Err(ConfigError::Invalid("outreach.top_commenters must be between 1 and 3"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  report_name: "reddit_automation_results"

reddit:
  client_id: "YOUR_REDDIT_CLIENT_ID"
  client_secret: "YOUR_REDDIT_CLIENT_SECRET"
  username: "your_reddit_username"
  password: "your_reddit_password"
  probe_timeout_ms: 10000
  request_timeout_ms: 30000

outreach:
  poster_template: "Hi! I came across your post (link of the post) and wanted to reach out."
  commenter_template: "Hi! Your comment (link of the comment) stood out to me."
  post_placeholder: "link of the post"
  comment_placeholder: "link of the comment"
  top_commenters: 3
"#
}
