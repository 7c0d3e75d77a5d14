use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::TrackerError;
use crate::gate::{DEFAULT_CALLS, DEFAULT_PERIOD};

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct JiraConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RateLimitConfig {
    pub calls: u32,
    pub period_secs: u64,
    pub max_wait_secs: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: DEFAULT_CALLS,
            period_secs: DEFAULT_PERIOD.as_secs(),
            max_wait_secs: None,
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}

/// Everything needed to reach JIRA.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub url: String,
    pub username: String,
    pub api_token: String,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jira-mcp")
        .join("config.toml")
}

/// Reads the TOML config. An explicit `path` must exist; the default
/// location is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                return Ok(AppConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

impl AppConfig {
    /// Loads the config file, then lets the process environment override it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overrides values with `JIRA_*` variables found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), TrackerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = set("JIRA_URL") {
            self.jira.url = Some(url);
        }
        if let Some(username) = set("JIRA_USERNAME") {
            self.jira.username = Some(username);
        }
        if let Some(token) = set("JIRA_API_TOKEN") {
            self.jira.api_token = Some(token);
        }
        if let Some(calls) = set("JIRA_RATE_LIMIT_CALLS") {
            self.rate_limit.calls = parse_number("JIRA_RATE_LIMIT_CALLS", &calls)?;
        }
        if let Some(period) = set("JIRA_RATE_LIMIT_PERIOD") {
            self.rate_limit.period_secs = parse_number("JIRA_RATE_LIMIT_PERIOD", &period)?;
        }
        if let Some(wait) = set("JIRA_RATE_LIMIT_MAX_WAIT") {
            self.rate_limit.max_wait_secs = Some(parse_number("JIRA_RATE_LIMIT_MAX_WAIT", &wait)?);
        }
        Ok(())
    }

    /// The JIRA connection settings, or a `Config` error naming what is missing.
    pub fn credentials(&self) -> Result<Credentials, TrackerError> {
        let pick = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let url = pick(&self.jira.url);
        let username = pick(&self.jira.username);
        let api_token = pick(&self.jira.api_token);

        match (url, username, api_token) {
            (Some(url), Some(username), Some(api_token)) => Ok(Credentials {
                url,
                username,
                api_token,
            }),
            (url, username, api_token) => {
                let missing: Vec<&str> = [
                    ("JIRA_URL", url.is_none()),
                    ("JIRA_USERNAME", username.is_none()),
                    ("JIRA_API_TOKEN", api_token.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(TrackerError::Config(format!("missing {}", missing.join(", "))))
            }
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.rate_limit.calls == 0 {
            return Err(TrackerError::Config(
                "rate limit calls must be at least 1".into(),
            ));
        }
        if self.rate_limit.period_secs == 0 {
            return Err(TrackerError::Config(
                "rate limit period must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, TrackerError> {
    raw.trim()
        .parse()
        .map_err(|_| TrackerError::Config(format!("{name} must be a whole number, got '{raw}'")))
}
