use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use super::args;
use super::{keyed, Operations};

const TIME_UNITS: &[char] = &['w', 'd', 'h', 'm'];
const JIRA_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

#[derive(Debug, Deserialize)]
struct LogWorkArgs {
    issue_key: String,
    time_spent: String,
    comment: Option<String>,
    started_at: Option<String>,
}

/// Normalizes a JIRA duration such as `"2h 30m"` or `"1d"`.
pub fn time_spent(raw: &str) -> Result<String> {
    let spent = raw.trim().to_lowercase();
    if spent.is_empty() {
        bail!("Time spent cannot be empty");
    }
    for part in spent.split_whitespace() {
        let Some(amount) = part.strip_suffix(TIME_UNITS) else {
            bail!("Time must be specified in weeks (w), days (d), hours (h), or minutes (m)");
        };
        if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
            bail!("Time value must be a number followed by unit (e.g., '2h', '30m')");
        }
    }
    Ok(spent.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Converts an RFC 3339 (or zone-less, read as UTC) timestamp to the format
/// JIRA expects for `started`.
pub fn started_at(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt,
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc().fixed_offset())
            .with_context(|| format!("started_at must be an RFC 3339 timestamp, got '{raw}'"))?,
    };
    Ok(parsed.format(JIRA_DATETIME).to_string())
}

impl Operations {
    pub async fn log_work(&self, args: Value) -> Result<Value> {
        let args: LogWorkArgs = args::parse(args)?;
        let key = args::issue_key(&args.issue_key)?;
        let spent = time_spent(&args.time_spent)?;
        let comment = args.comment.filter(|c| !c.trim().is_empty());
        let started = args.started_at.as_deref().map(started_at).transpose()?;
        self.tracker.ensure_connected().await?;

        tracing::info!(
            "Logging {spent} on {key} (started {})",
            started.as_deref().unwrap_or("now")
        );
        let worklog = self
            .tracker
            .add_worklog(&key, &spent, comment.as_deref(), started.as_deref())
            .await
            .context("Error logging work")?;
        keyed(&key, &worklog)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::jira::mock::{Call, MockTransport};
    use crate::ops::tests::{call, operations};

    #[test]
    fn accepts_jira_durations() {
        assert_eq!(time_spent("2h 30m").unwrap(), "2h 30m");
        assert_eq!(time_spent(" 1D ").unwrap(), "1d");
        assert_eq!(time_spent("1w  2d").unwrap(), "1w 2d");
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["", "2", "2x", "h", "2.5h", "two h"] {
            assert!(time_spent(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn converts_started_timestamps() {
        assert_eq!(
            started_at("2024-03-01T09:30:00+02:00").unwrap(),
            "2024-03-01T09:30:00.000+0200"
        );
        assert_eq!(
            started_at("2024-03-01T09:30:00").unwrap(),
            "2024-03-01T09:30:00.000+0000"
        );
        assert!(started_at("yesterday").is_err());
    }

    #[tokio::test]
    async fn log_work_sends_normalized_values() {
        let (ops, mock) = operations(MockTransport::new());
        let out = call(
            &ops,
            "log_work",
            json!({
                "issue_key": "proj-3",
                "time_spent": "1H 15M",
                "comment": "Pairing",
                "started_at": "2024-03-01T09:30:00Z"
            }),
        )
        .await;
        assert_eq!(out["issue_key"], "PROJ-3");
        assert_eq!(out["time_spent"], "1h 15m");
        assert_eq!(out["comment"], "Pairing");
        assert!(mock.calls().contains(&Call::Worklog {
            key: "PROJ-3".into(),
            time_spent: "1h 15m".into(),
            started: Some("2024-03-01T09:30:00.000+0000".into()),
        }));
    }
}
