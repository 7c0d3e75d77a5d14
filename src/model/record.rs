use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An issue as returned by JIRA. `fields` stays untyped so unexpected
/// shapes never fail decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawRecord {
    /// Present and non-null field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    pub fn summary(&self) -> Option<&str> {
        self.field("summary").and_then(Value::as_str)
    }

    pub fn project_key(&self) -> Option<&str> {
        self.field("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
    }

    pub fn issue_type_name(&self) -> Option<&str> {
        self.field("issuetype").and_then(named)
    }

    pub fn attachments(&self) -> Vec<AttachmentRef> {
        self.field("attachment")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|a| serde_json::from_value(a.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `name` of a compound JIRA object, or the value itself if it is already a string.
pub fn named(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worklog {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub time_spent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One page of search results. `total` counts all matches, not just this page.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub total: u64,
    pub records: Vec<RawRecord>,
}

/// Comment visibility restriction, e.g. `{"type": "role", "value": "Administrators"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> RawRecord {
        serde_json::from_value(json!({ "id": "10001", "key": "PROJ-1", "fields": fields }))
            .unwrap()
    }

    #[test]
    fn decodes_without_fields() {
        let rec: RawRecord = serde_json::from_str(r#"{"key":"PROJ-9"}"#).unwrap();
        assert_eq!(rec.key, "PROJ-9");
        assert!(rec.fields.is_empty());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let rec = record(json!({ "summary": null, "project": { "key": "PROJ" } }));
        assert!(rec.field("summary").is_none());
        assert_eq!(rec.summary(), None);
        assert_eq!(rec.project_key(), Some("PROJ"));
    }

    #[test]
    fn issue_type_accepts_object_or_string() {
        let obj = record(json!({ "issuetype": { "id": "1", "name": "Bug" } }));
        assert_eq!(obj.issue_type_name(), Some("Bug"));
        let plain = record(json!({ "issuetype": "Story" }));
        assert_eq!(plain.issue_type_name(), Some("Story"));
    }

    #[test]
    fn attachments_skip_malformed_entries() {
        let rec = record(json!({
            "attachment": [
                { "id": "1", "filename": "a.png", "size": 10, "mimeType": "image/png" },
                { "filename": "missing-id.txt" }
            ]
        }));
        let attachments = rec.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "a.png");
        assert_eq!(attachments[0].mime_type.as_deref(), Some("image/png"));
    }
}
