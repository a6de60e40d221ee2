use anyhow::{Context, Result, bail};
use reqwest::Url;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILE: &str = "cipher-tui.log";

/// Settings resolved once at start-up and handed to the components that
/// need them. Nothing else reads the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base address of the service, without a trailing slash.
    pub api_url: String,
    /// Where log output goes while the terminal is owned by the UI.
    pub log_file: PathBuf,
}

impl Config {
    /// Loads configuration from a dotenv file and the environment.
    ///
    /// # Arguments
    /// * `config_path` - `.env`-style file; skipped when it does not exist
    /// * `api_url` - command line override for `API_URL`
    /// * `log_file` - command line override for `LOG_FILE`
    ///
    /// # Environment Variables
    /// * `API_URL` - service base address (default: "http://localhost:8000")
    /// * `LOG_FILE` - log destination (default: "cipher-tui.log")
    pub fn load(
        config_path: &str,
        api_url: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Self> {
        if Path::new(config_path).exists() {
            dotenvy::from_filename(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path))?;
        }

        Self::resolve(
            api_url.or_else(|| env::var("API_URL").ok()),
            log_file.or_else(|| env::var("LOG_FILE").ok().map(PathBuf::from)),
        )
    }

    /// Applies defaults and validation to already collected values.
    pub fn resolve(api_url: Option<String>, log_file: Option<PathBuf>) -> Result<Self> {
        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_url: normalize_base_url(&api_url)?,
            log_file: log_file.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("Invalid API_URL: {}", raw))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("API_URL must use http or https, got {}", url.scheme());
    }
    Ok(trimmed.to_string())
}
