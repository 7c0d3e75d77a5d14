use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::args::{self, Paging};
use super::Operations;
use crate::clone::{clone_record, CloneRequest};
use crate::projector::{project, RECORD_FIELDS, SEARCH_FIELDS};

#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    issue_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchIssuesArgs {
    jql: String,
    #[serde(flatten)]
    paging: Paging,
    #[serde(default)]
    fields: Vec<String>,
}

/// Accepts either `"Bug"` or `{"name": "Bug"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IssueTypeArg {
    Name(String),
    Object { name: String },
}

impl IssueTypeArg {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

impl Default for IssueTypeArg {
    fn default() -> Self {
        Self::Name("Task".into())
    }
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    project_key: String,
    summary: String,
    description: Option<String>,
    #[serde(default)]
    issue_type: IssueTypeArg,
    priority: Option<String>,
    assignee: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    custom_fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateIssueArgs {
    issue_key: String,
    summary: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    labels: Option<Vec<String>>,
    comment: Option<String>,
    #[serde(default)]
    custom_fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CloneIssueArgs {
    source_issue_key: String,
    project_key: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    issue_type: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    labels: Option<Vec<String>>,
    #[serde(default)]
    custom_fields: Map<String, Value>,
    #[serde(default)]
    copy_attachments: bool,
    #[serde(default = "default_true")]
    add_link_to_source: bool,
}

fn default_true() -> bool {
    true
}

impl CloneIssueArgs {
    fn into_request(self) -> Result<CloneRequest> {
        Ok(CloneRequest {
            source_key: args::issue_key(&self.source_issue_key)?,
            target_project: self
                .project_key
                .map(|p| args::project_key(&p))
                .transpose()?,
            summary: args::optional_text(self.summary, "Summary")?,
            description: self.description,
            issue_type: self.issue_type,
            priority: self.priority,
            assignee: self.assignee,
            labels: self.labels,
            custom_fields: self.custom_fields,
            copy_attachments: self.copy_attachments,
            link_to_source: self.add_link_to_source,
        })
    }
}

impl Operations {
    pub async fn get_issue(&self, args: Value) -> Result<Value> {
        let args: GetIssueArgs = args::parse(args)?;
        let key = args::issue_key(&args.issue_key)?;
        self.tracker.ensure_connected().await?;

        let record = self
            .tracker
            .fetch_record(&key)
            .await
            .context("Error getting issue")?;
        Ok(Value::Object(project(&record, RECORD_FIELDS)))
    }

    pub async fn search_issues(&self, args: Value) -> Result<Value> {
        let args: SearchIssuesArgs = args::parse(args)?;
        let jql = args::required_text(&args.jql, "JQL query")?;
        let paging = args.paging.validate()?;
        let fields: Vec<String> = if args.fields.is_empty() {
            SEARCH_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            args.fields
        };
        self.tracker.ensure_connected().await?;

        let page = self
            .tracker
            .search_records(&jql, paging.max_results, paging.start_at, &fields)
            .await
            .with_context(|| format!("Error searching issues with JQL '{jql}'"))?;
        let issues: Vec<Value> = page
            .records
            .iter()
            .map(|record| Value::Object(project(record, &fields)))
            .collect();

        Ok(json!({
            "total": page.total,
            "start_at": paging.start_at,
            "max_results": paging.max_results,
            "issues": issues,
        }))
    }

    pub async fn create_issue(&self, args: Value) -> Result<Value> {
        let args: CreateIssueArgs = args::parse(args)?;
        let project_key = args::project_key(&args.project_key)?;
        let summary = args::required_text(&args.summary, "Summary")?;
        let issue_type = args::required_text(&args.issue_type.into_name(), "Issue type")?;

        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": project_key }));
        fields.insert("summary".into(), json!(summary));
        fields.insert("issuetype".into(), json!({ "name": issue_type }));
        if let Some(description) = args.description.filter(|d| !d.is_empty()) {
            fields.insert("description".into(), json!(description));
        }
        if let Some(priority) = args.priority.filter(|p| !p.is_empty()) {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(assignee) = args.assignee.filter(|a| !a.is_empty()) {
            fields.insert("assignee".into(), json!({ "name": assignee }));
        }
        if !args.labels.is_empty() {
            fields.insert("labels".into(), json!(args.labels));
        }
        fields.extend(args.custom_fields);

        self.tracker.ensure_connected().await?;
        let record = self
            .tracker
            .create_record(fields)
            .await
            .context("Error creating issue")?;
        Ok(Value::Object(project(&record, RECORD_FIELDS)))
    }

    pub async fn update_issue(&self, args: Value) -> Result<Value> {
        let args: UpdateIssueArgs = args::parse(args)?;
        let key = args::issue_key(&args.issue_key)?;
        let summary = args::optional_text(args.summary, "Summary")?;
        let comment = args::optional_text(args.comment, "Comment")?;

        let mut fields = Map::new();
        if let Some(summary) = summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(description) = args.description {
            fields.insert("description".into(), json!(description));
        }
        if let Some(priority) = args.priority {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(assignee) = args.assignee {
            fields.insert("assignee".into(), json!({ "name": assignee }));
        }
        if let Some(labels) = args.labels {
            fields.insert("labels".into(), json!(labels));
        }
        fields.extend(args.custom_fields);

        self.tracker.ensure_connected().await?;
        // confirms the issue exists before changing anything
        self.tracker
            .fetch_record(&key)
            .await
            .context("Error updating issue")?;
        if !fields.is_empty() {
            self.tracker
                .update_record(&key, fields)
                .await
                .context("Error updating issue")?;
        }
        if let Some(comment) = &comment {
            self.tracker
                .add_comment(&key, comment, None)
                .await
                .context("Error adding comment")?;
        }

        let updated = self
            .tracker
            .fetch_record(&key)
            .await
            .context("Error updating issue")?;
        let mut out = project(&updated, RECORD_FIELDS);
        out.insert("comment_added".into(), json!(comment.is_some()));
        Ok(Value::Object(out))
    }

    pub async fn clone_issue(&self, args: Value) -> Result<Value> {
        let args: CloneIssueArgs = args::parse(args)?;
        let request = args.into_request()?;
        self.tracker.ensure_connected().await?;

        let outcome = clone_record(&self.tracker, request)
            .await
            .context("Error cloning issue")?;
        Ok(serde_json::to_value(outcome)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::jira::mock::{Call, MockTransport};
    use crate::ops::tests::{call, operations};

    fn five_issues() -> MockTransport {
        (1..=5).fold(MockTransport::new(), |mock, n| {
            mock.with_record(
                &format!("PROJ-{n}"),
                json!({
                    "summary": format!("Issue {n}"),
                    "status": { "name": "Open" },
                    "assignee": null,
                }),
            )
        })
    }

    #[tokio::test]
    async fn get_issue_projects_default_fields() {
        let (ops, _) = operations(MockTransport::new().with_record(
            "PROJ-1",
            json!({
                "summary": "Fix bug",
                "status": { "name": "In Progress" },
                "priority": { "name": "High" },
                "reporter": { "displayName": "Jane Doe" },
            }),
        ));
        let out = call(&ops, "get_issue", json!({ "issue_key": "proj-1" })).await;
        assert_eq!(out["key"], "PROJ-1");
        assert_eq!(out["status"], "In Progress");
        assert_eq!(out["reporter"], "Jane Doe");
        assert!(out["assignee"].is_null());
        assert!(out["description"].is_null());
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 11);
        assert_eq!(keys[0], "key");
    }

    #[tokio::test]
    async fn get_issue_not_found_is_error_reply() {
        let (ops, _) = operations(MockTransport::new());
        let out = call(&ops, "get_issue", json!({ "issue_key": "PROJ-9" })).await;
        let msg = out["error"].as_str().unwrap();
        assert!(msg.starts_with("Error getting issue"), "{msg}");
        assert!(msg.contains("PROJ-9"));
    }

    #[tokio::test]
    async fn search_pages_results() {
        let (ops, mock) = operations(five_issues());
        let out = call(
            &ops,
            "search_issues",
            json!({ "jql": "  project = PROJ ", "max_results": 2, "start_at": 0 }),
        )
        .await;
        assert_eq!(out["total"], 5);
        assert_eq!(out["issues"].as_array().unwrap().len(), 2);
        assert_eq!(out["issues"][0]["key"], "PROJ-1");
        assert_eq!(out["issues"][0]["status"], "Open");
        assert!(mock.calls().contains(&Call::Search {
            jql: "project = PROJ".into(),
            max_results: 2,
            start_at: 0,
        }));
    }

    #[tokio::test]
    async fn search_honours_requested_fields() {
        let (ops, _) = operations(five_issues());
        let out = call(
            &ops,
            "search_issues",
            json!({ "jql": "project = PROJ", "fields": ["summary", "nonexistent"] }),
        )
        .await;
        let first = out["issues"][0].as_object().unwrap();
        let keys: Vec<&String> = first.keys().collect();
        assert_eq!(keys, ["key", "summary", "nonexistent"]);
        assert!(first["nonexistent"].is_null());
    }

    #[tokio::test]
    async fn search_rejects_blank_jql() {
        let (ops, _) = operations(five_issues());
        let out = call(&ops, "search_issues", json!({ "jql": "   " })).await;
        assert!(out["error"].as_str().unwrap().contains("JQL query cannot be empty"));
    }

    #[tokio::test]
    async fn create_issue_builds_jira_fields() {
        let (ops, mock) = operations(MockTransport::new());
        let out = call(
            &ops,
            "create_issue",
            json!({
                "project_key": "proj",
                "summary": "  Implement feature ",
                "issue_type": { "name": "Story" },
                "priority": "High",
                "labels": ["feature"],
                "custom_fields": { "customfield_10010": { "value": "Red" } }
            }),
        )
        .await;
        assert_eq!(out["key"], "PROJ-101");
        assert_eq!(out["summary"], "Implement feature");
        assert_eq!(out["issuetype"], "Story");
        assert_eq!(out["priority"], "High");

        let created = mock
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::Create(fields) => Some(fields),
                _ => None,
            })
            .unwrap();
        assert_eq!(created["project"], json!({ "key": "PROJ" }));
        assert_eq!(created["customfield_10010"], json!({ "value": "Red" }));
        assert!(!created.contains_key("assignee"));
    }

    #[tokio::test]
    async fn create_issue_defaults_to_task() {
        let (ops, _) = operations(MockTransport::new());
        let out = call(
            &ops,
            "create_issue",
            json!({ "project_key": "PROJ", "summary": "Chore" }),
        )
        .await;
        assert_eq!(out["issuetype"], "Task");
    }

    #[tokio::test]
    async fn update_issue_applies_fields_and_comment() {
        let (ops, mock) = operations(
            MockTransport::new().with_record("PROJ-1", json!({ "summary": "Old", "labels": ["a"] })),
        );
        let out = call(
            &ops,
            "update_issue",
            json!({
                "issue_key": "PROJ-1",
                "summary": "New",
                "labels": [],
                "comment": "Updated the plan"
            }),
        )
        .await;
        assert_eq!(out["summary"], "New");
        assert_eq!(out["labels"], json!([]));
        assert_eq!(out["comment_added"], true);
        assert!(mock
            .calls()
            .contains(&Call::Comment("PROJ-1".into(), "Updated the plan".into())));
    }

    #[tokio::test]
    async fn update_issue_rejects_blank_summary() {
        let (ops, mock) = operations(MockTransport::new().with_record("PROJ-1", json!({})));
        let out = call(&ops, "update_issue", json!({ "issue_key": "PROJ-1", "summary": " " })).await;
        assert!(out["error"].as_str().unwrap().contains("Summary cannot be empty"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn clone_issue_returns_outcome() {
        let (ops, _) = operations(MockTransport::new().with_record(
            "PROJ-1",
            json!({
                "project": { "key": "PROJ" },
                "summary": "Fix bug",
                "issuetype": { "name": "Bug" },
            }),
        ));
        let out = call(&ops, "clone_issue", json!({ "source_issue_key": "proj-1" })).await;
        assert_eq!(out["summary"], "Clone of Fix bug");
        assert_eq!(out["source_issue"]["key"], "PROJ-1");
        assert_eq!(out["link_added"], true);
        assert_eq!(out["attachments_copied"], false);
    }

    #[tokio::test]
    async fn clone_issue_link_failure_still_succeeds() {
        let (ops, _) = operations(
            MockTransport::new()
                .with_record(
                    "PROJ-1",
                    json!({ "project": { "key": "PROJ" }, "summary": "Fix bug" }),
                )
                .with_link_failure(),
        );
        let out = call(&ops, "clone_issue", json!({ "source_issue_key": "PROJ-1" })).await;
        assert!(out.get("error").is_none());
        assert_eq!(out["link_added"], true);
        assert_eq!(out["warnings"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clone_issue_validates_source_key() {
        let (ops, _) = operations(MockTransport::new());
        let out = call(&ops, "clone_issue", json!({ "source_issue_key": "PROJ" })).await;
        assert!(out["error"].as_str().unwrap().contains("PROJECT-123"));
    }
}
