use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::Transport;
use crate::error::{Result, TrackerError};
use crate::model::record::{Comment, Container, RawRecord, SearchPage, Visibility, Worklog};

/// Calls the mock has seen, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Fetch(String),
    Search { jql: String, max_results: u32, start_at: u32 },
    Create(Map<String, Value>),
    Update(String, Map<String, Value>),
    Comment(String, String),
    ListComments(String),
    Worklog { key: String, time_spent: String, started: Option<String> },
    Containers(bool),
    Link { link_type: String, inward: String, outward: String },
    FetchAttachment(String),
    AddAttachment { key: String, filename: String, bytes: Vec<u8> },
}

/// In-memory tracker used by handler and clone tests.
pub struct MockTransport {
    records: Mutex<HashMap<String, RawRecord>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    next_id: Mutex<u32>,
    connected: bool,
    fail_links: bool,
    failing_attachments: Vec<String>,
    containers: Vec<Container>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Mutex::new(100),
            connected: true,
            fail_links: false,
            failing_attachments: Vec::new(),
            containers: Vec::new(),
        }
    }

    pub fn with_record(self, key: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.records.lock().unwrap().insert(
            key.to_string(),
            RawRecord {
                id: format!("id-{key}"),
                key: key.to_string(),
                fields,
            },
        );
        self
    }

    pub fn with_containers(mut self, containers: Vec<Container>) -> Self {
        self.containers = containers;
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn with_link_failure(mut self) -> Self {
        self.fail_links = true;
        self
    }

    pub fn with_attachment_failure(mut self, id: &str) -> Self {
        self.failing_attachments.push(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn record(&self, key: &str) -> Option<RawRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> bool {
        self.push(Call::Connect);
        self.connected
    }

    async fn fetch_record(&self, key: &str) -> Result<RawRecord> {
        self.push(Call::Fetch(key.to_string()));
        self.record(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))
    }

    async fn search_records(
        &self,
        jql: &str,
        max_results: u32,
        start_at: u32,
        _fields: &[String],
    ) -> Result<SearchPage> {
        self.push(Call::Search {
            jql: jql.to_string(),
            max_results,
            start_at,
        });
        let mut all: Vec<RawRecord> = self.records.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        let total = all.len() as u64;
        let records = all
            .into_iter()
            .skip(start_at as usize)
            .take(max_results as usize)
            .collect();
        Ok(SearchPage { total, records })
    }

    async fn create_record(&self, fields: Map<String, Value>) -> Result<String> {
        self.push(Call::Create(fields.clone()));
        let project = fields
            .get("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .unwrap_or("NEW")
            .to_string();
        let key = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("{project}-{next}")
        };
        let mut stored = fields;
        stored.insert("status".into(), json!({ "name": "Open" }));
        self.records.lock().unwrap().insert(
            key.clone(),
            RawRecord {
                id: format!("id-{key}"),
                key: key.clone(),
                fields: stored,
            },
        );
        Ok(key)
    }

    async fn update_record(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        self.push(Call::Update(key.to_string(), fields.clone()));
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        record.fields.extend(fields);
        Ok(())
    }

    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        _visibility: Option<&Visibility>,
    ) -> Result<Comment> {
        self.push(Call::Comment(key.to_string(), body.to_string()));
        if self.record(key).is_none() {
            return Err(TrackerError::NotFound(key.to_string()));
        }
        Ok(Comment {
            id: "1".into(),
            author: Some("Bot".into()),
            body: body.to_string(),
            created: None,
            updated: None,
        })
    }

    async fn list_comments(
        &self,
        key: &str,
        _start_at: u32,
        _max_results: u32,
    ) -> Result<(u64, Vec<Comment>)> {
        self.push(Call::ListComments(key.to_string()));
        Ok((0, Vec::new()))
    }

    async fn add_worklog(
        &self,
        key: &str,
        time_spent: &str,
        comment: Option<&str>,
        started: Option<&str>,
    ) -> Result<Worklog> {
        self.push(Call::Worklog {
            key: key.to_string(),
            time_spent: time_spent.to_string(),
            started: started.map(String::from),
        });
        Ok(Worklog {
            id: "9".into(),
            author: Some("Bot".into()),
            time_spent: time_spent.to_string(),
            time_spent_seconds: None,
            started: started.map(String::from),
            comment: comment.map(String::from),
        })
    }

    async fn list_containers(&self, include_archived: bool) -> Result<Vec<Container>> {
        self.push(Call::Containers(include_archived));
        Ok(self.containers.clone())
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
        _comment: Option<&str>,
    ) -> Result<()> {
        self.push(Call::Link {
            link_type: link_type.to_string(),
            inward: inward_key.to_string(),
            outward: outward_key.to_string(),
        });
        if self.fail_links {
            return Err(TrackerError::Api {
                status: 404,
                message: "No issue link type with name 'Cloners' found.".into(),
            });
        }
        Ok(())
    }

    async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>> {
        self.push(Call::FetchAttachment(id.to_string()));
        if self.failing_attachments.iter().any(|f| f == id) {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        Ok(format!("content-{id}").into_bytes())
    }

    async fn add_attachment(&self, key: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        self.push(Call::AddAttachment {
            key: key.to_string(),
            filename: filename.to_string(),
            bytes,
        });
        Ok(())
    }
}
