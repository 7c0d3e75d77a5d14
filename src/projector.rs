use serde_json::{Map, Value};

use crate::model::record::RawRecord;

pub const RECORD_FIELDS: &[&str] = &[
    "key",
    "summary",
    "description",
    "status",
    "assignee",
    "reporter",
    "created",
    "updated",
    "issuetype",
    "priority",
    "labels",
];

pub const SEARCH_FIELDS: &[&str] = &[
    "key",
    "summary",
    "status",
    "assignee",
    "issuetype",
    "priority",
    "created",
    "updated",
];

/// A flat, ordered field name to value view of an issue.
pub type ProjectedRecord = Map<String, Value>;

/// Flattens `record` to the requested `fields`.
///
/// `key` always comes first. Known compound fields collapse to their display
/// name, everything else passes through untouched, and anything missing or of
/// an unexpected shape becomes `null`.
pub fn project<S: AsRef<str>>(record: &RawRecord, fields: &[S]) -> ProjectedRecord {
    let mut out = Map::new();
    out.insert("key".into(), Value::String(record.key.clone()));

    for name in fields.iter().map(AsRef::as_ref) {
        if name == "key" || out.contains_key(name) {
            continue;
        }
        let raw = record.fields.get(name).unwrap_or(&Value::Null);
        out.insert(name.to_string(), project_field(name, raw));
    }
    out
}

fn project_field(name: &str, raw: &Value) -> Value {
    match name {
        "assignee" | "reporter" => reduce(raw, &["displayName", "name", "emailAddress"]),
        "status" | "issuetype" | "priority" => reduce(raw, &["name"]),
        _ => raw.clone(),
    }
}

fn reduce(raw: &Value, labels: &[&str]) -> Value {
    match raw {
        Value::String(_) => raw.clone(),
        Value::Object(obj) => labels
            .iter()
            .find_map(|label| obj.get(*label).filter(|v| v.is_string()))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
