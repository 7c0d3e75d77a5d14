use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9_]*-[0-9]+$").expect("issue key pattern is valid")
});

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Decodes tool arguments; a missing or `null` argument object counts as empty.
pub fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).context("Invalid arguments")
}

/// Trims and upper-cases an issue key, rejecting anything not shaped like `PROJ-123`.
pub fn issue_key(raw: &str) -> Result<String> {
    let key = raw.trim().to_uppercase();
    if !ISSUE_KEY.is_match(&key) {
        bail!("Issue key must be in format PROJECT-123, got '{raw}'");
    }
    Ok(key)
}

pub fn project_key(raw: &str) -> Result<String> {
    let key = raw.trim().to_uppercase();
    if key.is_empty() {
        bail!("Project key cannot be empty");
    }
    Ok(key)
}

/// Trimmed text that must not be blank. `what` names the argument in errors.
pub fn required_text(raw: &str, what: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        bail!("{what} cannot be empty");
    }
    Ok(text.to_string())
}

/// Like [`required_text`] but for arguments that may be left out entirely.
pub fn optional_text(raw: Option<String>, what: &str) -> Result<Option<String>> {
    raw.map(|s| required_text(&s, what)).transpose()
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    #[serde(default = "default_page_size")]
    pub max_results: u32,
    #[serde(default)]
    pub start_at: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Paging {
    pub fn validate(self) -> Result<Self> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.max_results) {
            bail!("max_results must be between 1 and {MAX_PAGE_SIZE}");
        }
        Ok(self)
    }
}
