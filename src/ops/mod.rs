pub mod args;
pub mod comments;
pub mod issues;
pub mod projects;
pub mod worklog;

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::jira::Tracker;

pub const TOOL_NAMES: &[&str] = &[
    "get_issue",
    "search_issues",
    "create_issue",
    "update_issue",
    "clone_issue",
    "add_comment",
    "get_comments",
    "log_work",
    "get_projects",
];

/// Tool handlers. Each one validates its arguments, talks to JIRA through the
/// gated [`Tracker`] and shapes the reply.
pub struct Operations {
    tracker: Tracker,
}

impl Operations {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    /// Runs `tool` and encodes its reply as JSON bytes. Failures come back as
    /// `{"error": ...}`; `None` means there is no such tool.
    pub async fn call(&self, tool: &str, args: Value) -> Option<Vec<u8>> {
        tracing::debug!("{tool} called with arguments: {args}");
        let result = match tool {
            "get_issue" => self.get_issue(args).await,
            "search_issues" => self.search_issues(args).await,
            "create_issue" => self.create_issue(args).await,
            "update_issue" => self.update_issue(args).await,
            "clone_issue" => self.clone_issue(args).await,
            "add_comment" => self.add_comment(args).await,
            "get_comments" => self.get_comments(args).await,
            "log_work" => self.log_work(args).await,
            "get_projects" => self.get_projects(args).await,
            _ => return None,
        };
        Some(respond(tool, result))
    }
}

/// `item`'s fields prefixed with the issue key they belong to.
fn keyed<T: Serialize>(issue_key: &str, item: &T) -> Result<Value> {
    let mut out = Map::new();
    out.insert("issue_key".into(), json!(issue_key));
    if let Value::Object(fields) = serde_json::to_value(item)? {
        out.extend(fields);
    }
    Ok(Value::Object(out))
}

fn respond(tool: &str, result: Result<Value>) -> Vec<u8> {
    let value = match result {
        Ok(value) => {
            tracing::debug!("{tool} response: {value}");
            value
        }
        Err(e) => {
            tracing::error!("Error in {tool}: {e:#}");
            json!({ "error": format!("{e:#}") })
        }
    };
    // a Value always serializes
    serde_json::to_vec(&value).unwrap_or_default()
}
