use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::Transport;
use crate::error::{Result, TrackerError};
use crate::gate::RequestGate;
use crate::model::record::{Comment, Container, RawRecord, SearchPage, Visibility, Worklog};

/// Routes every remote call through the shared request gate.
#[derive(Clone)]
pub struct Tracker {
    transport: Arc<dyn Transport>,
    gate: Arc<RequestGate>,
    connected: Arc<AtomicBool>,
}

impl Tracker {
    pub fn new(transport: Arc<dyn Transport>, gate: Arc<RequestGate>) -> Self {
        Self {
            transport,
            gate,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connects on first use; later calls are free once a connect succeeded.
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }
        let ok = self
            .gate
            .run(|| async { Ok(self.transport.connect().await) })
            .await?;
        if !ok {
            return Err(TrackerError::Connection(
                "check the server URL and credentials".into(),
            ));
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    pub async fn fetch_record(&self, key: &str) -> Result<RawRecord> {
        self.gate.run(|| self.transport.fetch_record(key)).await
    }

    pub async fn search_records(
        &self,
        jql: &str,
        max_results: u32,
        start_at: u32,
        fields: &[String],
    ) -> Result<SearchPage> {
        self.gate
            .run(|| self.transport.search_records(jql, max_results, start_at, fields))
            .await
    }

    /// Creates the issue and reads it back, spending one credit per call.
    pub async fn create_record(&self, fields: Map<String, Value>) -> Result<RawRecord> {
        let key = self.gate.run(|| self.transport.create_record(fields)).await?;
        tracing::info!("Created issue {key}");
        self.fetch_record(&key).await
    }

    pub async fn update_record(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        self.gate.run(|| self.transport.update_record(key, fields)).await
    }

    pub async fn add_comment(
        &self,
        key: &str,
        body: &str,
        visibility: Option<&Visibility>,
    ) -> Result<Comment> {
        self.gate
            .run(|| self.transport.add_comment(key, body, visibility))
            .await
    }

    pub async fn list_comments(
        &self,
        key: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<(u64, Vec<Comment>)> {
        self.gate
            .run(|| self.transport.list_comments(key, start_at, max_results))
            .await
    }

    pub async fn add_worklog(
        &self,
        key: &str,
        time_spent: &str,
        comment: Option<&str>,
        started: Option<&str>,
    ) -> Result<Worklog> {
        self.gate
            .run(|| self.transport.add_worklog(key, time_spent, comment, started))
            .await
    }

    pub async fn list_containers(&self, include_archived: bool) -> Result<Vec<Container>> {
        self.gate
            .run(|| self.transport.list_containers(include_archived))
            .await
    }

    pub async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        self.gate
            .run(|| {
                self.transport
                    .create_link(link_type, inward_key, outward_key, comment)
            })
            .await
    }

    pub async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>> {
        self.gate.run(|| self.transport.fetch_attachment(id)).await
    }

    pub async fn add_attachment(&self, key: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        self.gate
            .run(|| self.transport.add_attachment(key, filename, bytes))
            .await
    }
}
