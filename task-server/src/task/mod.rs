use crate::entities::tasks;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::*;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;
pub mod clock;
pub mod validation;

use clock::{Clock, SystemClock};
use validation::FieldViolation;

/// Server-generated identifier of a persisted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh, random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the string form of an identifier.
    pub fn parse(value: &str) -> Result<Self, TaskError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| TaskError::InvalidIdentifier(value.to_string()))
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TaskId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A titled, completable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: Option<TaskId>,
    surrogate_id: Option<String>,
    title: String,
    done: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new, not yet persisted task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] when the title is empty.
    pub fn new(title: impl Into<String>) -> Result<Self, TaskError> {
        let task = Self {
            id: None,
            surrogate_id: None,
            title: title.into(),
            done: false,
            created_at: None,
            updated_at: None,
        };
        task.validate()?;
        Ok(task)
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Attaches the string form of an identifier received from a client.
    ///
    /// It is only resolved into a [`TaskId`] when an operation needs one.
    pub fn with_surrogate_id(mut self, surrogate_id: impl Into<String>) -> Self {
        self.surrogate_id = Some(surrogate_id.into());
        self
    }

    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    pub fn surrogate_id(&self) -> Option<&str> {
        self.surrogate_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns `true` when the task has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_done(&mut self, done: bool) {
        self.done = done;
    }

    /// Checks the task's attributes against the validation rules.
    pub fn validate(&self) -> Result<(), TaskError> {
        let violations = validation::validate(self);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Validation(violations))
        }
    }

    /// Returns the identifier, falling back to the surrogate when it parses.
    fn resolve_id(&self) -> Option<TaskId> {
        self.id.or_else(|| {
            self.surrogate_id
                .as_deref()
                .and_then(|surrogate_id| TaskId::parse(surrogate_id).ok())
        })
    }
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Self {
            id: Some(TaskId(model.id)),
            surrogate_id: None,
            title: model.title,
            done: model.done,
            created_at: Some(model.created_at.with_timezone(&Utc)),
            updated_at: Some(model.updated_at.with_timezone(&Utc)),
        }
    }
}

/// Error type for task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// One or more fields failed validation.
    #[error("Task is invalid: {}", describe_violations(.0))]
    Validation(Vec<FieldViolation>),
    /// A task with the same title already exists.
    #[error("Task with title '{title}' already exists")]
    Duplicate { title: String },
    /// The task has no identifier to address it by.
    #[error("ID is required to address a task")]
    MissingIdentifier,
    /// The given identifier is not syntactically valid.
    #[error("ID value is not valid ({0})")]
    InvalidIdentifier(String),
    /// The pagination window is out of range.
    #[error("Page and limit must be positive integers (page {page}, limit {limit})")]
    InvalidPagination { page: u64, limit: u64 },
    /// No stored task has the identifier.
    #[error("Task with ID {0} not found")]
    NotFound(TaskId),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn describe_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Filter and pagination window of a task search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSearch {
    /// Substring matched against titles; empty matches every task.
    pub text: String,
    /// Restricts results to one done state; `None` matches both.
    pub done: Option<bool>,
    /// 1-based page number.
    pub page: u64,
    /// Maximum number of tasks per page.
    pub limit: u64,
}

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

impl Default for TaskSearch {
    fn default() -> Self {
        Self {
            text: String::new(),
            done: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    /// Number of tasks matching the filter across all pages.
    pub total: u64,
}

pub struct TaskRepository<'a> {
    db: &'a DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl<'a> TaskRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> TaskRepository<'a> {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: &'a DatabaseConnection, clock: Arc<dyn Clock>) -> TaskRepository<'a> {
        TaskRepository { db, clock }
    }

    /// Finds a task by ID or by exact title.
    ///
    /// A query that parses as an identifier is looked up by ID only.
    ///
    /// # Returns
    ///
    /// `None` when nothing matches or the query is empty.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_query(&self, query: &str) -> Result<Option<Task>, TaskError> {
        if query.is_empty() {
            return Ok(None);
        }

        let model = match TaskId::parse(query) {
            Ok(id) => tasks::Entity::find_by_id(id.into_uuid()).one(self.db).await?,
            Err(_) => self.find_model_by_title(query).await?,
        };
        Ok(model.map(Task::from))
    }

    /// Lists the tasks matching the filter, ordered by title then ID.
    ///
    /// # Returns
    ///
    /// The requested page and the number of matches across all pages.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, search: &TaskSearch) -> Result<TaskPage, TaskError> {
        let invalid_pagination = || TaskError::InvalidPagination {
            page: search.page,
            limit: search.limit,
        };
        if search.page == 0 || search.limit == 0 {
            return Err(invalid_pagination());
        }
        // OFFSET and LIMIT are bound as signed 64-bit integers.
        let skip = (search.page - 1)
            .checked_mul(search.limit)
            .filter(|skip| i64::try_from(*skip).is_ok())
            .ok_or_else(invalid_pagination)?;
        if i64::try_from(search.limit).is_err() {
            return Err(invalid_pagination());
        }

        let mut query = tasks::Entity::find();
        if !search.text.is_empty() {
            query = query.filter(title_contains(
                self.db.get_database_backend(),
                &search.text,
            ));
        }
        if let Some(done) = search.done {
            query = query.filter(tasks::Column::Done.eq(done));
        }

        let total = query.clone().count(self.db).await?;
        let tasks = query
            .order_by_asc(tasks::Column::Title)
            .order_by_asc(tasks::Column::Id)
            .offset(skip)
            .limit(search.limit)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();

        Ok(TaskPage { tasks, total })
    }

    /// Persists a new task.
    ///
    /// # Returns
    ///
    /// The stored task, carrying its generated ID and timestamps.
    ///
    /// # Errors
    ///
    /// [`TaskError::Duplicate`] when the title is already taken.
    #[tracing::instrument(skip(self, task), fields(title = %task.title()))]
    pub async fn create(&self, task: &Task) -> Result<Task, TaskError> {
        task.validate()?;

        if self.find_model_by_title(task.title()).await?.is_some() {
            return Err(TaskError::Duplicate {
                title: task.title().to_string(),
            });
        }

        let now = self.clock.now().fixed_offset();
        let active_model = tasks::ActiveModel {
            id: ActiveValue::Set(TaskId::generate().into_uuid()),
            title: ActiveValue::Set(task.title().to_string()),
            done: ActiveValue::Set(task.done()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        // The unique index catches titles inserted since the lookup above.
        let created_model = active_model
            .insert(self.db)
            .await
            .map_err(|err| map_write_error(err, task.title()))?;

        tracing::info!("Created task {} '{}'", created_model.id, created_model.title);
        Ok(Task::from(created_model))
    }

    /// Stores the task's title and done state, restamping its update time.
    ///
    /// # Returns
    ///
    /// The stored task after the update.
    ///
    /// # Errors
    ///
    /// [`TaskError::MissingIdentifier`] when the task was never persisted and carries no
    /// parseable surrogate ID, [`TaskError::NotFound`] when no row has the ID.
    #[tracing::instrument(skip(self, task), fields(title = %task.title()))]
    pub async fn update(&self, task: &Task) -> Result<Task, TaskError> {
        task.validate()?;
        let id = task.resolve_id().ok_or(TaskError::MissingIdentifier)?;

        let active_model = tasks::ActiveModel {
            id: ActiveValue::Unchanged(id.into_uuid()),
            title: ActiveValue::Set(task.title().to_string()),
            done: ActiveValue::Set(task.done()),
            updated_at: ActiveValue::Set(self.clock.now().fixed_offset()),
            ..Default::default()
        };

        match active_model.update(self.db).await {
            Ok(updated_model) => Ok(Task::from(updated_model)),
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => {
                Err(TaskError::NotFound(id))
            }
            Err(err) => Err(map_write_error(err, task.title())),
        }
    }

    /// Deletes the task with the given ID.
    ///
    /// Deleting an ID with no stored task succeeds.
    ///
    /// # Errors
    ///
    /// [`TaskError::InvalidIdentifier`] when `id` does not parse.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        let id = TaskId::parse(id)?;
        self.delete_by_id(id).await
    }

    /// Deletes the stored record behind an in-memory task.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, task: &Task) -> Result<(), TaskError> {
        let id = task.resolve_id().ok_or(TaskError::MissingIdentifier)?;
        self.delete_by_id(id).await
    }

    async fn delete_by_id(&self, id: TaskId) -> Result<(), TaskError> {
        let result = tasks::Entity::delete_by_id(id.into_uuid())
            .exec(self.db)
            .await?;
        if result.rows_affected == 0 {
            tracing::warn!("No task with ID {} to delete", id);
        }
        Ok(())
    }

    async fn find_model_by_title(&self, title: &str) -> Result<Option<tasks::Model>, TaskError> {
        let model = tasks::Entity::find()
            .filter(tasks::Column::Title.eq(title))
            .one(self.db)
            .await?;
        Ok(model)
    }
}

/// Literal, case-sensitive substring match on the title.
fn title_contains(backend: DbBackend, text: &str) -> SimpleExpr {
    // LIKE would treat `%` and `_` as wildcards and folds ASCII case on SQLite.
    let position = match backend {
        DbBackend::Postgres => "strpos",
        _ => "instr",
    };
    Expr::expr(
        Func::cust(Alias::new(position))
            .arg(Expr::col((tasks::Entity, tasks::Column::Title)))
            .arg(text),
    )
    .gt(0)
}

fn map_write_error(err: DbErr, title: &str) -> TaskError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => TaskError::Duplicate {
            title: title.to_string(),
        },
        _ => TaskError::Database(err),
    }
}
