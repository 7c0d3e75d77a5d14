use serde_json::{json, Value};

/// Tool schemas advertised through `tools/list`.
pub fn tool_schemas() -> Value {
    json!({
        "tools": [
            get_issue_schema(),
            search_issues_schema(),
            create_issue_schema(),
            update_issue_schema(),
            clone_issue_schema(),
            add_comment_schema(),
            get_comments_schema(),
            log_work_schema(),
            get_projects_schema()
        ]
    })
}

fn issue_key(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
        "pattern": "^[A-Za-z][A-Za-z0-9_]*-[0-9]+$"
    })
}

fn page_size() -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 100,
        "default": 50,
        "description": "Maximum number of results to return"
    })
}

fn start_at() -> Value {
    json!({
        "type": "integer",
        "minimum": 0,
        "default": 0,
        "description": "Index of the first result to return"
    })
}

fn labels(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}

fn custom_fields() -> Value {
    json!({
        "type": "object",
        "description": "Custom field values keyed by field id, e.g. {\"customfield_10010\": \"value\"}"
    })
}

fn get_issue_schema() -> Value {
    json!({
        "name": "get_issue",
        "description": "Get a JIRA issue by key",
        "inputSchema": {
            "type": "object",
            "properties": {
                "issue_key": issue_key("The issue key, e.g. PROJ-123")
            },
            "required": ["issue_key"]
        }
    })
}

fn search_issues_schema() -> Value {
    json!({
        "name": "search_issues",
        "description": "Search for JIRA issues using JQL",
        "inputSchema": {
            "type": "object",
            "properties": {
                "jql": {
                    "type": "string",
                    "description": "JQL query, e.g. 'project = PROJ AND status = Open'"
                },
                "max_results": page_size(),
                "start_at": start_at(),
                "fields": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Fields to include in each result (optional, defaults to key, summary, status, assignee, issuetype, priority, created, updated)"
                }
            },
            "required": ["jql"]
        }
    })
}

fn create_issue_schema() -> Value {
    json!({
        "name": "create_issue",
        "description": "Create a new JIRA issue",
        "inputSchema": {
            "type": "object",
            "properties": {
                "project_key": { "type": "string", "description": "Key of the project to create the issue in" },
                "summary": { "type": "string", "description": "Issue summary" },
                "description": { "type": "string", "description": "Issue description (optional)" },
                "issue_type": {
                    "type": "string",
                    "default": "Task",
                    "description": "Issue type name, e.g. Task, Bug, Story"
                },
                "priority": { "type": "string", "description": "Priority name (optional)" },
                "assignee": { "type": "string", "description": "Assignee username (optional)" },
                "labels": labels("Labels to set (optional)"),
                "custom_fields": custom_fields()
            },
            "required": ["project_key", "summary"]
        }
    })
}

fn update_issue_schema() -> Value {
    json!({
        "name": "update_issue",
        "description": "Update fields of an existing JIRA issue and optionally add a comment",
        "inputSchema": {
            "type": "object",
            "properties": {
                "issue_key": issue_key("Key of the issue to update"),
                "summary": { "type": "string", "description": "New summary (optional)" },
                "description": { "type": "string", "description": "New description (optional)" },
                "priority": { "type": "string", "description": "New priority name (optional)" },
                "assignee": { "type": "string", "description": "New assignee username (optional)" },
                "labels": labels("Replacement labels (optional)"),
                "comment": { "type": "string", "description": "Comment to add after updating (optional)" },
                "custom_fields": custom_fields()
            },
            "required": ["issue_key"]
        }
    })
}

fn clone_issue_schema() -> Value {
    json!({
        "name": "clone_issue",
        "description": "Clone a JIRA issue, copying its fields and custom fields, optionally into another project",
        "inputSchema": {
            "type": "object",
            "properties": {
                "source_issue_key": issue_key("Key of the issue to clone"),
                "project_key": { "type": "string", "description": "Target project key (optional, defaults to the source project)" },
                "summary": { "type": "string", "description": "Summary override (optional)" },
                "description": { "type": "string", "description": "Description override (optional)" },
                "issue_type": { "type": "string", "description": "Issue type override (optional)" },
                "priority": { "type": "string", "description": "Priority override (optional)" },
                "assignee": { "type": "string", "description": "Assignee username override (optional)" },
                "labels": labels("Labels override; an empty list clears them (optional)"),
                "custom_fields": custom_fields(),
                "copy_attachments": {
                    "type": "boolean",
                    "default": false,
                    "description": "Copy the source issue's attachments"
                },
                "add_link_to_source": {
                    "type": "boolean",
                    "default": true,
                    "description": "Link the clone to its source issue"
                }
            },
            "required": ["source_issue_key"]
        }
    })
}

fn add_comment_schema() -> Value {
    json!({
        "name": "add_comment",
        "description": "Add a comment to a JIRA issue",
        "inputSchema": {
            "type": "object",
            "properties": {
                "issue_key": issue_key("Key of the issue to comment on"),
                "comment": { "type": "string", "description": "Comment text" },
                "visibility": {
                    "type": "object",
                    "description": "Restrict the comment to a role or group (optional)",
                    "properties": {
                        "type": { "type": "string", "enum": ["role", "group"] },
                        "value": { "type": "string" }
                    },
                    "required": ["type", "value"]
                }
            },
            "required": ["issue_key", "comment"]
        }
    })
}

fn get_comments_schema() -> Value {
    json!({
        "name": "get_comments",
        "description": "Get the comments of a JIRA issue",
        "inputSchema": {
            "type": "object",
            "properties": {
                "issue_key": issue_key("Key of the issue"),
                "max_results": page_size(),
                "start_at": start_at()
            },
            "required": ["issue_key"]
        }
    })
}

fn log_work_schema() -> Value {
    json!({
        "name": "log_work",
        "description": "Log time spent on a JIRA issue",
        "inputSchema": {
            "type": "object",
            "properties": {
                "issue_key": issue_key("Key of the issue"),
                "time_spent": { "type": "string", "description": "Duration in JIRA format, e.g. '2h 30m' or '1d'" },
                "comment": { "type": "string", "description": "Work description (optional)" },
                "started_at": { "type": "string", "description": "RFC 3339 start time (optional, defaults to now)" }
            },
            "required": ["issue_key", "time_spent"]
        }
    })
}

fn get_projects_schema() -> Value {
    json!({
        "name": "get_projects",
        "description": "List the JIRA projects visible to the configured user",
        "inputSchema": {
            "type": "object",
            "properties": {
                "include_archived": {
                    "type": "boolean",
                    "default": false,
                    "description": "Include archived projects"
                },
                "max_results": page_size(),
                "start_at": start_at()
            }
        }
    })
}
