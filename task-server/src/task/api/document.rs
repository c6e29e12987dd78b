//! JSON:API resource and error documents exchanged with clients.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::validation::FieldViolation;
use crate::task::{Task, TaskError};

/// Media type of every JSON:API document.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Resource type name of tasks.
pub const TASK_TYPE: &str = "task";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttributes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attributes: TaskAttributes,
}

impl TaskResource {
    /// Builds the in-memory task described by this resource.
    ///
    /// The `id` member becomes the task's surrogate ID.
    ///
    /// # Errors
    ///
    /// [`TaskError::Validation`] when the attributes are invalid.
    pub fn into_task(self) -> Result<Task, TaskError> {
        let task = Task::new(self.attributes.title)?.with_done(self.attributes.done);
        Ok(match self.id {
            Some(id) => task.with_surrogate_id(id),
            None => task,
        })
    }
}

impl From<&Task> for TaskResource {
    fn from(task: &Task) -> Self {
        Self {
            kind: TASK_TYPE.to_string(),
            id: task
                .id()
                .map(|id| id.to_string())
                .or_else(|| task.surrogate_id().map(str::to_string)),
            attributes: TaskAttributes {
                title: task.title().to_string(),
                done: task.done(),
                created_at: task.created_at(),
                updated_at: task.updated_at(),
            },
        }
    }
}

/// Document carrying a single task, or `null` data when there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    pub data: Option<TaskResource>,
}

impl TaskDocument {
    pub fn new(task: Option<&Task>) -> Self {
        Self {
            data: task.map(TaskResource::from),
        }
    }

    /// Parses an inbound document and extracts its task resource.
    ///
    /// Fails with a human readable cause when the body is not a task document.
    pub fn decode(body: &[u8]) -> Result<TaskResource, String> {
        let document: TaskDocument =
            serde_json::from_slice(body).map_err(|err| err.to_string())?;
        let resource = document
            .data
            .ok_or_else(|| "document has no primary data".to_string())?;
        if resource.kind != TASK_TYPE {
            return Err(format!(
                "resource type '{}' does not match '{}'",
                resource.kind, TASK_TYPE
            ));
        }
        Ok(resource)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMeta {
    /// Number of matching tasks across all pages.
    pub total: u64,
}

/// Document carrying one page of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListDocument {
    pub data: Vec<TaskResource>,
    pub meta: ListMeta,
}

impl TaskListDocument {
    pub fn new(tasks: &[Task], total: u64) -> Self {
        Self {
            data: tasks.iter().map(TaskResource::from).collect(),
            meta: ListMeta { total },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub title: String,
    pub detail: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ErrorObject {
    pub fn new(title: &str, detail: impl Into<String>, status: u16) -> Self {
        Self {
            title: title.to_string(),
            detail: detail.into(),
            status: status.to_string(),
            meta: None,
        }
    }

    /// Describes a failed validation rule, with the field context in `meta`.
    pub fn from_violation(violation: &FieldViolation, status: u16) -> Self {
        Self {
            meta: Some(serde_json::json!({
                "field": violation.field,
                "error": violation.rule,
                "expected": violation.expected,
                "received": violation.received,
            })),
            ..Self::new("Validation Error", violation.to_string(), status)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn can_decode_new_task() {
        let body = json!({
            "data": {"type": "task", "attributes": {"title": "write tests", "done": true}}
        });

        let task = TaskDocument::decode(body.to_string().as_bytes())
            .unwrap()
            .into_task()
            .unwrap();

        assert_eq!(task.title(), "write tests");
        assert!(task.done());
        assert!(task.is_new());
        assert_eq!(task.surrogate_id(), None);
    }

    #[test]
    fn keeps_document_id_as_surrogate() {
        let body = json!({
            "data": {"type": "task", "id": "abc", "attributes": {"title": "patched"}}
        });

        let task = TaskDocument::decode(body.to_string().as_bytes())
            .unwrap()
            .into_task()
            .unwrap();

        assert_eq!(task.surrogate_id(), Some("abc"));
        assert!(!task.done());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(TaskDocument::decode(b"{\"data\": ").is_err());
    }

    #[test]
    fn rejects_foreign_resource_type() {
        let body = json!({"data": {"type": "user", "attributes": {"title": "x"}}});

        let err = TaskDocument::decode(body.to_string().as_bytes()).unwrap_err();

        assert_eq!(err, "resource type 'user' does not match 'task'");
    }

    #[test]
    fn rejects_document_without_data() {
        let err = TaskDocument::decode(b"{\"data\": null}").unwrap_err();

        assert_eq!(err, "document has no primary data");
    }

    #[test]
    fn encodes_missing_task_as_null_data() {
        let document = serde_json::to_value(TaskDocument::new(None)).unwrap();

        assert_eq!(document, json!({"data": null}));
    }

    #[test]
    fn encodes_unsaved_task_without_id_or_timestamps() {
        let task = Task::new("draft").unwrap();

        let document = serde_json::to_value(TaskDocument::new(Some(&task))).unwrap();

        assert_eq!(
            document,
            json!({"data": {"type": "task", "attributes": {"title": "draft", "done": false}}})
        );
    }

    #[test]
    fn encodes_validation_context_in_meta() {
        let violation = FieldViolation {
            field: "title",
            rule: "required",
            expected: "string",
            received: Value::String(String::new()),
        };

        let object = serde_json::to_value(ErrorObject::from_violation(&violation, 400)).unwrap();

        assert_eq!(
            object,
            json!({
                "title": "Validation Error",
                "detail": "field 'title' failed validation on the 'required' rule",
                "status": "400",
                "meta": {"field": "title", "error": "required", "expected": "string", "received": ""}
            })
        );
    }
}
