use crate::task::api::document::{ErrorDocument, ErrorObject, TaskDocument, TaskListDocument};
use crate::task::{DEFAULT_LIMIT, DEFAULT_PAGE, Task, TaskError, TaskRepository, TaskSearch};
use crate::web::middleware::JsonApiMediaTypeLayer;
use axum::{
    Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
}

/// The task operation a request was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Search,
}

impl Operation {
    fn error_title(self) -> &'static str {
        match self {
            Operation::Create => "Save Error",
            Operation::Read => "Read Error",
            Operation::Update => "Update Error",
            Operation::Delete => "Delete Error",
            Operation::Search => "Search Error",
        }
    }
}

/// Error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    /// The request body is not a task document.
    #[error("{0}")]
    Decode(String),
    /// A query parameter is not an integer.
    #[error("Query parameter '{name}' must be an integer, got '{value}'")]
    InvalidQueryParameter { name: &'static str, value: String },
    /// A query parameter is an integer below 1.
    #[error("Query parameter '{name}' must be positive, got {value}")]
    NonPositiveQueryParameter { name: &'static str, value: i64 },
    /// A delete request did not name the task.
    #[error("ID parameter is required")]
    MissingPathIdentifier,
    /// The task operation itself failed.
    #[error("{source}")]
    Operation {
        operation: Operation,
        source: TaskError,
    },
}

impl TaskApiError {
    fn during(operation: Operation) -> impl FnOnce(TaskError) -> TaskApiError {
        move |source| TaskApiError::Operation { operation, source }
    }

    fn status_and_errors(&self) -> (StatusCode, Vec<ErrorObject>) {
        let internal = StatusCode::INTERNAL_SERVER_ERROR;
        let bad_request = StatusCode::BAD_REQUEST;
        match self {
            TaskApiError::Decode(detail) => (
                internal,
                vec![ErrorObject::new(
                    "Json Unmarshal Payload Error",
                    detail.as_str(),
                    internal.as_u16(),
                )],
            ),
            TaskApiError::InvalidQueryParameter { .. } => (
                internal,
                vec![ErrorObject::new(
                    Operation::Search.error_title(),
                    self.to_string(),
                    internal.as_u16(),
                )],
            ),
            TaskApiError::NonPositiveQueryParameter { .. } => (
                bad_request,
                vec![ErrorObject::new(
                    Operation::Search.error_title(),
                    self.to_string(),
                    bad_request.as_u16(),
                )],
            ),
            TaskApiError::MissingPathIdentifier => (
                internal,
                vec![ErrorObject::new(
                    Operation::Delete.error_title(),
                    self.to_string(),
                    internal.as_u16(),
                )],
            ),
            TaskApiError::Operation {
                source: TaskError::Validation(violations),
                ..
            } => (
                bad_request,
                violations
                    .iter()
                    .map(|violation| ErrorObject::from_violation(violation, bad_request.as_u16()))
                    .collect(),
            ),
            TaskApiError::Operation {
                operation,
                source: source @ TaskError::InvalidPagination { .. },
            } => (
                bad_request,
                vec![ErrorObject::new(
                    operation.error_title(),
                    source.to_string(),
                    bad_request.as_u16(),
                )],
            ),
            TaskApiError::Operation { operation, source } => (
                internal,
                vec![ErrorObject::new(
                    operation.error_title(),
                    source.to_string(),
                    internal.as_u16(),
                )],
            ),
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status, errors) = self.status_and_errors();
        if status.is_server_error() {
            tracing::error!("Task request failed: {}", self);
        } else {
            tracing::warn!("Task request rejected: {}", self);
        }
        (status, Json(ErrorDocument { errors })).into_response()
    }
}

fn decode_task(body: &[u8], operation: Operation) -> Result<Task, TaskApiError> {
    let resource = TaskDocument::decode(body).map_err(TaskApiError::Decode)?;
    resource.into_task().map_err(TaskApiError::during(operation))
}

/// Handler for POST /task/ - Creates a task from a resource document.
#[tracing::instrument(skip(state, body))]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<TaskDocument>), TaskApiError> {
    let task = decode_task(&body, Operation::Create)?;
    let repository = TaskRepository::new(&state.db);
    let created = repository
        .create(&task)
        .await
        .map_err(TaskApiError::during(Operation::Create))?;
    Ok((StatusCode::CREATED, Json(TaskDocument::new(Some(&created)))))
}

/// Handler for PATCH /task/ - Updates the task named by the document's `id`.
#[tracing::instrument(skip(state, body))]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    body: Bytes,
) -> Result<Json<TaskDocument>, TaskApiError> {
    let task = decode_task(&body, Operation::Update)?;
    let repository = TaskRepository::new(&state.db);
    let updated = repository
        .update(&task)
        .await
        .map_err(TaskApiError::during(Operation::Update))?;
    Ok(Json(TaskDocument::new(Some(&updated))))
}

/// Handler for DELETE /task/{id} - Removes a task.
#[tracing::instrument(skip(state))]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, TaskApiError> {
    let repository = TaskRepository::new(&state.db);
    repository
        .delete(&id)
        .await
        .map_err(TaskApiError::during(Operation::Delete))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /task/ - Always fails, a delete must name its task.
#[tracing::instrument]
pub async fn delete_without_id_handler() -> TaskApiError {
    TaskApiError::MissingPathIdentifier
}

/// Handler for GET /task/{query} - Reads a task by ID or title.
///
/// Responds with `null` data when nothing matches.
#[tracing::instrument(skip(state))]
pub async fn read_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(query): Path<String>,
) -> Result<Json<TaskDocument>, TaskApiError> {
    let repository = TaskRepository::new(&state.db);
    let task = repository
        .find_by_query(&query)
        .await
        .map_err(TaskApiError::during(Operation::Read))?;
    Ok(Json(TaskDocument::new(task.as_ref())))
}

/// Query parameters of a task search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    page: Option<String>,
    limit: Option<String>,
    query: Option<String>,
    done: Option<String>,
}

impl SearchParams {
    fn into_search(self) -> Result<TaskSearch, TaskApiError> {
        Ok(TaskSearch {
            text: self.query.unwrap_or_default(),
            done: self
                .done
                .filter(|done| !done.is_empty())
                .map(|done| parse_flag(&done).unwrap_or(false)),
            page: parse_window("page", self.page, DEFAULT_PAGE)?,
            limit: parse_window("limit", self.limit, DEFAULT_LIMIT)?,
        })
    }
}

fn parse_window(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, TaskApiError> {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return Ok(default);
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| TaskApiError::InvalidQueryParameter { name, value: raw })?;
    u64::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or(TaskApiError::NonPositiveQueryParameter { name, value })
}

/// Parses the boolean spellings accepted for the `done` filter.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Handler for GET /task/ - Searches tasks by title and done state, one page at a time.
#[tracing::instrument(skip(state))]
pub async fn search_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<TaskListDocument>, TaskApiError> {
    let search = params.into_search()?;
    let repository = TaskRepository::new(&state.db);
    let page = repository
        .search(&search)
        .await
        .map_err(TaskApiError::during(Operation::Search))?;
    Ok(Json(TaskListDocument::new(&page.tasks, page.total)))
}

/// Creates and returns the task router.
pub fn create_task_router(state: TaskState) -> Router {
    Router::new()
        .route(
            "/task/",
            get(search_tasks_handler)
                .post(create_task_handler)
                .patch(update_task_handler)
                .delete(delete_without_id_handler),
        )
        .route(
            "/task/{query}",
            get(read_task_handler).delete(delete_task_handler),
        )
        .layer(JsonApiMediaTypeLayer::new())
        .with_state(Arc::new(state))
}
