pub mod client;
pub mod tracker;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::record::{Comment, Container, RawRecord, SearchPage, Visibility, Worklog};

pub use client::JiraClient;
pub use tracker::Tracker;

/// The narrow set of remote calls the server needs from an issue tracker.
///
/// Implementations make exactly one remote request per method; throttling
/// happens a layer above in [`Tracker`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Checks the credentials against the server. Never errors.
    async fn connect(&self) -> bool;
    async fn fetch_record(&self, key: &str) -> Result<RawRecord>;
    async fn search_records(
        &self,
        jql: &str,
        max_results: u32,
        start_at: u32,
        fields: &[String],
    ) -> Result<SearchPage>;
    /// Creates an issue and returns its key.
    async fn create_record(&self, fields: Map<String, Value>) -> Result<String>;
    async fn update_record(&self, key: &str, fields: Map<String, Value>) -> Result<()>;
    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        visibility: Option<&Visibility>,
    ) -> Result<Comment>;
    /// Returns the total comment count alongside the requested page.
    async fn list_comments(
        &self,
        key: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<(u64, Vec<Comment>)>;
    async fn add_worklog(
        &self,
        key: &str,
        time_spent: &str,
        comment: Option<&str>,
        started: Option<&str>,
    ) -> Result<Worklog>;
    async fn list_containers(&self, include_archived: bool) -> Result<Vec<Container>>;
    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
        comment: Option<&str>,
    ) -> Result<()>;
    async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>>;
    async fn add_attachment(&self, key: &str, filename: &str, bytes: Vec<u8>) -> Result<()>;
}
