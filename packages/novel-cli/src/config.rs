use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use novel_client::DEFAULT_BASE_URL;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub download_dir: PathBuf,
    pub connect_timeout: Duration,
    pub task_poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            api_url: env::var("NOVEL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            download_dir: env::var("NOVEL_DOWNLOAD_DIR")
                .unwrap_or_else(|_| "downloads".to_string())
                .into(),
            connect_timeout: seconds(
                "NOVEL_CONNECT_TIMEOUT_SECS",
                env::var("NOVEL_CONNECT_TIMEOUT_SECS").ok(),
                10,
            )?,
            task_poll_interval: seconds(
                "NOVEL_TASK_POLL_SECS",
                env::var("NOVEL_TASK_POLL_SECS").ok(),
                5,
            )?,
        })
    }

    /// Apply command-line overrides.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        self
    }
}

/// Parse a positive whole number of seconds, falling back to `default` when unset.
fn seconds(name: &str, value: Option<String>, default: u64) -> Result<Duration> {
    let secs = match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds", name))?,
        None => default,
    };
    ensure!(secs > 0, "{} must be at least 1 second", name);
    Ok(Duration::from_secs(secs))
}
