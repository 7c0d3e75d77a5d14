//! Issue cloning: builds a new issue from a source issue plus caller overrides.
//!
//! Every top-level field resolves as "explicit override, else the source's
//! value, else left out". Custom fields are carried over from the source and
//! then overridden per key. Linking back to the source and copying
//! attachments run after the create and never fail the clone.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, TrackerError};
use crate::jira::Tracker;
use crate::model::record::{named, RawRecord};
use crate::projector::{project, ProjectedRecord, RECORD_FIELDS};

pub const EXTENSION_PREFIX: &str = "customfield_";
pub const CLONE_LINK_TYPE: &str = "Cloners";
const DEFAULT_ISSUE_TYPE: &str = "Task";

#[derive(Debug, Clone, Default)]
pub struct CloneRequest {
    pub source_key: String,
    pub target_project: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    /// `Some(vec![])` clears labels; `None` inherits them.
    pub labels: Option<Vec<String>>,
    pub custom_fields: Map<String, Value>,
    pub copy_attachments: bool,
    pub link_to_source: bool,
}

/// How a custom field value from the source is written to the clone.
///
/// Probed in declaration order: a value carrying an `id` is referenced by id,
/// then by option `value`, then by `name`; anything else is copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionValue {
    Id(Value),
    Value(Value),
    Name(Value),
    Raw(Value),
}

impl ExtensionValue {
    pub fn probe(raw: &Value) -> Self {
        if let Value::Object(obj) = raw {
            let attr = |name: &str| obj.get(name).filter(|v| !v.is_null()).cloned();
            if let Some(id) = attr("id") {
                return Self::Id(id);
            }
            if let Some(value) = attr("value") {
                return Self::Value(value);
            }
            if let Some(name) = attr("name") {
                return Self::Name(name);
            }
        }
        Self::Raw(raw.clone())
    }

    pub fn into_field(self) -> Value {
        match self {
            Self::Id(id) => json!({ "id": id }),
            Self::Value(value) => json!({ "value": value }),
            Self::Name(name) => json!({ "name": name }),
            Self::Raw(raw) => raw,
        }
    }
}

/// Non-null `customfield_*` values of `source`, normalized for re-submission.
pub fn extension_fields(source: &RawRecord) -> Map<String, Value> {
    source
        .fields
        .iter()
        .filter(|(id, value)| id.starts_with(EXTENSION_PREFIX) && !value.is_null())
        .map(|(id, value)| (id.clone(), ExtensionValue::probe(value).into_field()))
        .collect()
}

/// The complete field set for the new issue.
pub fn merged_fields(source: &RawRecord, request: &CloneRequest) -> Result<Map<String, Value>> {
    let project = request
        .target_project
        .as_deref()
        .or_else(|| source.project_key())
        .ok_or_else(|| {
            TrackerError::InvalidArgument(format!(
                "{} has no project; pass project_key",
                source.key
            ))
        })?;

    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project }));

    let summary = match &request.summary {
        Some(s) => s.clone(),
        None => format!("Clone of {}", source.summary().unwrap_or_default()),
    };
    fields.insert("summary".into(), Value::String(summary));

    let issue_type = request
        .issue_type
        .as_deref()
        .or_else(|| source.issue_type_name())
        .unwrap_or(DEFAULT_ISSUE_TYPE);
    fields.insert("issuetype".into(), json!({ "name": issue_type }));

    let description = match &request.description {
        Some(d) => Some(Value::String(d.clone())),
        None => source.field("description").cloned(),
    };
    if let Some(description) = description {
        fields.insert("description".into(), description);
    }

    let priority = match &request.priority {
        Some(p) => Some(p.as_str()),
        None => source.field("priority").and_then(named),
    };
    if let Some(priority) = priority {
        fields.insert("priority".into(), json!({ "name": priority }));
    }

    let assignee = match &request.assignee {
        Some(a) => Some(json!({ "name": a })),
        None => source.field("assignee").and_then(user_ref),
    };
    if let Some(assignee) = assignee {
        fields.insert("assignee".into(), assignee);
    }

    let labels = match &request.labels {
        Some(labels) => Some(json!(labels)),
        None => source.field("labels").cloned(),
    };
    if let Some(labels) = labels {
        fields.insert("labels".into(), labels);
    }

    let mut custom = extension_fields(source);
    custom.extend(request.custom_fields.clone());
    fields.extend(custom);

    Ok(fields)
}

/// Reference to a source user that JIRA accepts on create.
fn user_ref(user: &Value) -> Option<Value> {
    match user {
        Value::String(name) => Some(json!({ "name": name })),
        Value::Object(obj) => {
            if let Some(account_id) = obj.get("accountId").and_then(Value::as_str) {
                return Some(json!({ "accountId": account_id }));
            }
            obj.get("name")
                .and_then(Value::as_str)
                .map(|name| json!({ "name": name }))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub key: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneOutcome {
    #[serde(flatten)]
    pub record: ProjectedRecord,
    pub source_issue: SourceSummary,
    /// Whether linking was attempted, not whether it succeeded.
    pub link_added: bool,
    /// Whether attachment copying was attempted.
    pub attachments_copied: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub async fn clone_record(tracker: &Tracker, request: CloneRequest) -> Result<CloneOutcome> {
    let source = tracker.fetch_record(&request.source_key).await?;
    let fields = merged_fields(&source, &request)?;
    let created = tracker.create_record(fields).await?;
    tracing::info!("Cloned {} to {}", source.key, created.key);

    let mut warnings = Vec::new();

    if request.link_to_source {
        if let Err(e) = tracker
            .create_link(CLONE_LINK_TYPE, &created.key, &source.key, None)
            .await
        {
            tracing::warn!("Failed to link {} to {}: {e}", created.key, source.key);
            warnings.push(format!("link to {} failed: {e}", source.key));
        }
    }

    if request.copy_attachments {
        let attachments = source.attachments();
        let mut copied = 0;
        for attachment in &attachments {
            let result = match tracker.fetch_attachment(&attachment.id).await {
                Ok(bytes) => {
                    tracker
                        .add_attachment(&created.key, &attachment.filename, bytes)
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => copied += 1,
                Err(e) => {
                    tracing::warn!("Failed to copy attachment {}: {e}", attachment.filename);
                    warnings.push(format!("attachment {} failed: {e}", attachment.filename));
                }
            }
        }
        tracing::info!(
            "Copied {copied} of {} attachments from {} to {}",
            attachments.len(),
            source.key,
            created.key
        );
    }

    Ok(CloneOutcome {
        record: project(&created, RECORD_FIELDS),
        source_issue: SourceSummary {
            key: source.key.clone(),
            summary: source.summary().map(String::from),
        },
        link_added: request.link_to_source,
        attachments_copied: request.copy_attachments,
        warnings,
    })
}
