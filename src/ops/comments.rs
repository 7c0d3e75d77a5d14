use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::args::{self, Paging};
use super::{keyed, Operations};
use crate::model::record::Visibility;

#[derive(Debug, Deserialize)]
struct AddCommentArgs {
    issue_key: String,
    comment: String,
    visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
struct GetCommentsArgs {
    issue_key: String,
    #[serde(flatten)]
    paging: Paging,
}

impl Operations {
    pub async fn add_comment(&self, args: Value) -> Result<Value> {
        let args: AddCommentArgs = args::parse(args)?;
        let key = args::issue_key(&args.issue_key)?;
        let body = args::required_text(&args.comment, "Comment")?;
        self.tracker.ensure_connected().await?;

        let comment = self
            .tracker
            .add_comment(&key, &body, args.visibility.as_ref())
            .await
            .context("Error adding comment")?;
        keyed(&key, &comment)
    }

    pub async fn get_comments(&self, args: Value) -> Result<Value> {
        let args: GetCommentsArgs = args::parse(args)?;
        let key = args::issue_key(&args.issue_key)?;
        let paging = args.paging.validate()?;
        self.tracker.ensure_connected().await?;

        let (total, comments) = self
            .tracker
            .list_comments(&key, paging.start_at, paging.max_results)
            .await
            .context("Error getting comments")?;
        Ok(json!({
            "issue_key": key,
            "total": total,
            "start_at": paging.start_at,
            "max_results": paging.max_results,
            "comments": comments,
        }))
    }
}
