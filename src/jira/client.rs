use async_trait::async_trait;
use base64::Engine;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::Transport;
use crate::error::{Result, TrackerError};
use crate::model::record::{Comment, Container, RawRecord, SearchPage, Visibility, Worklog};

/// JIRA REST API v2 client using basic auth with an API token.
pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(base_url: &str, username: &str, api_token: &str) -> Self {
        let creds = format!("{username}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.base_url)
    }

    fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    fn issue_path(key: &str) -> String {
        format!("issue/{}", urlencoding::encode(key))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    fn send_json(&self, method: reqwest::Method, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(body)
    }
}

/// Passes successful responses through; maps 404 to `NotFound(what)` and any
/// other failure to `Api` with JIRA's error messages.
async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(TrackerError::NotFound(what.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TrackerError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

fn error_message(body: &str, status: StatusCode) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body.trim().chars().take(300).collect()
        };
    };
    let mut parts = parsed.error_messages;
    parts.extend(parsed.errors.into_iter().map(|(field, msg)| format!("{field}: {msg}")));
    if parts.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        parts.join("; ")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    issues: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    display_name: Option<String>,
    name: Option<String>,
}

impl User {
    fn label(self) -> Option<String> {
        self.display_name.or(self.name)
    }
}

#[derive(Deserialize)]
struct JiraComment {
    id: String,
    author: Option<User>,
    #[serde(default)]
    body: Value,
    created: Option<String>,
    updated: Option<String>,
}

impl From<JiraComment> for Comment {
    fn from(c: JiraComment) -> Self {
        let body = match c.body {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Comment {
            id: c.id,
            author: c.author.and_then(User::label),
            body,
            created: c.created,
            updated: c.updated,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraWorklog {
    id: String,
    author: Option<User>,
    time_spent: Option<String>,
    time_spent_seconds: Option<u64>,
    started: Option<String>,
    comment: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    id: String,
    key: String,
    name: String,
}

#[derive(Deserialize)]
struct AttachmentMeta {
    content: String,
}

#[async_trait]
impl Transport for JiraClient {
    async fn connect(&self) -> bool {
        let result = match self.get(&self.api("serverInfo")).send().await {
            Ok(resp) => check(resp, "serverInfo").await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => {
                tracing::info!("Connected to JIRA at {}", self.base_url);
                true
            }
            Err(e) => {
                tracing::error!("Failed to connect to JIRA: {e}");
                false
            }
        }
    }

    async fn fetch_record(&self, key: &str) -> Result<RawRecord> {
        let resp = self.get(&self.api(&Self::issue_path(key))).send().await?;
        let record: RawRecord = check(resp, key).await?.json().await?;
        Ok(record)
    }

    async fn search_records(
        &self,
        jql: &str,
        max_results: u32,
        start_at: u32,
        fields: &[String],
    ) -> Result<SearchPage> {
        let body = json!({
            "jql": jql,
            "startAt": start_at,
            "maxResults": max_results,
            "fields": fields,
        });
        let resp = self
            .send_json(reqwest::Method::POST, &self.api("search"), &body)
            .send()
            .await?;
        let search: SearchResponse = check(resp, "search").await?.json().await?;
        Ok(SearchPage {
            total: search.total,
            records: search.issues,
        })
    }

    async fn create_record(&self, fields: Map<String, Value>) -> Result<String> {
        let body = json!({ "fields": fields });
        let resp = self
            .send_json(reqwest::Method::POST, &self.api("issue"), &body)
            .send()
            .await?;
        let created: CreatedIssue = check(resp, "issue").await?.json().await?;
        Ok(created.key)
    }

    async fn update_record(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        let body = json!({ "fields": fields });
        let resp = self
            .send_json(reqwest::Method::PUT, &self.api(&Self::issue_path(key)), &body)
            .send()
            .await?;
        check(resp, key).await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        visibility: Option<&Visibility>,
    ) -> Result<Comment> {
        let mut payload = json!({ "body": body });
        if let Some(v) = visibility {
            payload["visibility"] = serde_json::to_value(v)?;
        }
        let url = self.api(&format!("{}/comment", Self::issue_path(key)));
        let resp = self
            .send_json(reqwest::Method::POST, &url, &payload)
            .send()
            .await?;
        let comment: JiraComment = check(resp, key).await?.json().await?;
        Ok(comment.into())
    }

    async fn list_comments(
        &self,
        key: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<(u64, Vec<Comment>)> {
        let url = self.api(&format!("{}/comment", Self::issue_path(key)));
        let resp = self
            .get(&url)
            .query(&[("startAt", start_at), ("maxResults", max_results)])
            .send()
            .await?;
        let page: CommentPage = check(resp, key).await?.json().await?;
        Ok((page.total, page.comments.into_iter().map(Comment::from).collect()))
    }

    async fn add_worklog(
        &self,
        key: &str,
        time_spent: &str,
        comment: Option<&str>,
        started: Option<&str>,
    ) -> Result<Worklog> {
        let mut payload = json!({ "timeSpent": time_spent });
        if let Some(c) = comment {
            payload["comment"] = json!(c);
        }
        if let Some(s) = started {
            payload["started"] = json!(s);
        }
        let url = self.api(&format!("{}/worklog", Self::issue_path(key)));
        let resp = self
            .send_json(reqwest::Method::POST, &url, &payload)
            .send()
            .await?;
        let wl: JiraWorklog = check(resp, key).await?.json().await?;
        Ok(Worklog {
            id: wl.id,
            author: wl.author.and_then(User::label),
            time_spent: wl.time_spent.unwrap_or_else(|| time_spent.to_string()),
            time_spent_seconds: wl.time_spent_seconds,
            started: wl.started,
            comment: wl.comment,
        })
    }

    async fn list_containers(&self, include_archived: bool) -> Result<Vec<Container>> {
        let mut request = self.get(&self.api("project"));
        if include_archived {
            request = request.query(&[("includeArchived", "true")]);
        }
        let resp = request.send().await?;
        let projects: Vec<Project> = check(resp, "project").await?.json().await?;
        Ok(projects
            .into_iter()
            .map(|p| Container {
                id: p.id,
                key: p.key,
                name: p.name,
            })
            .collect())
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "type": { "name": link_type },
            "inwardIssue": { "key": inward_key },
            "outwardIssue": { "key": outward_key },
        });
        if let Some(c) = comment {
            payload["comment"] = json!({ "body": c });
        }
        let resp = self
            .send_json(reqwest::Method::POST, &self.api("issueLink"), &payload)
            .send()
            .await?;
        check(resp, "issueLink").await?;
        Ok(())
    }

    async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>> {
        let meta_url = self.api(&format!("attachment/{}", urlencoding::encode(id)));
        let resp = self.get(&meta_url).send().await?;
        let meta: AttachmentMeta = check(resp, id).await?.json().await?;
        // credentials only go to the configured server
        if !self.is_own_url(&meta.content) {
            return Err(TrackerError::InvalidArgument(format!(
                "Attachment {id} content is outside {}: {}",
                self.base_url, meta.content
            )));
        }

        let resp = self
            .client
            .get(&meta.content)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;
        let bytes = check(resp, id).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn add_attachment(&self, key: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let url = self.api(&format!("{}/attachments", Self::issue_path(key)));
        let resp = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await?;
        check(resp, key).await?;
        Ok(())
    }
}
