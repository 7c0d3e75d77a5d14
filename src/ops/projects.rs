use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::args::{self, Paging};
use super::Operations;

#[derive(Debug, Deserialize)]
struct GetProjectsArgs {
    #[serde(default)]
    include_archived: bool,
    #[serde(flatten)]
    paging: Paging,
}

impl Operations {
    /// JIRA returns every project at once, so paging happens here.
    pub async fn get_projects(&self, args: Value) -> Result<Value> {
        let args: GetProjectsArgs = args::parse(args)?;
        let paging = args.paging.validate()?;
        self.tracker.ensure_connected().await?;

        let containers = self
            .tracker
            .list_containers(args.include_archived)
            .await
            .context("Error getting projects")?;
        let total = containers.len();
        let projects: Vec<Value> = containers
            .into_iter()
            .skip(paging.start_at as usize)
            .take(paging.max_results as usize)
            .map(|p| json!({ "key": p.key, "name": p.name, "id": p.id }))
            .collect();

        Ok(json!({
            "total": total,
            "start_at": paging.start_at,
            "max_results": paging.max_results,
            "projects": projects,
        }))
    }
}
