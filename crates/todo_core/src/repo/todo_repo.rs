//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `todos` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Patches are read-merge-write inside one immediate transaction.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Lists are in insertion order; `created_at` never decreases across inserts.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::todo::{NewTodo, Todo, TodoId, TodoPatch, TodoValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TODO_SELECT_SQL: &str = "SELECT
    uuid,
    user_id,
    title,
    description,
    is_completed,
    created_at
FROM todos";

const REQUIRED_COLUMNS: [&str; 6] = [
    "uuid",
    "user_id",
    "title",
    "description",
    "is_completed",
    "created_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse error taxonomy surfaced to callers of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The operation referenced a todo id that does not exist.
    NotFound,
    /// Input was missing or had the wrong shape.
    Validation,
    /// The storage medium failed or is unavailable.
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    NotFound(TodoId),
    InvalidData(String),
    /// The backend cannot serve requests (e.g. a poisoned lock).
    Unavailable(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Maps this error onto the not-found / validation / storage taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Storage,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::Unavailable(message) => write!(f, "todo storage unavailable: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Equality-filter conjunction for listing one user's todos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListQuery {
    pub user_id: String,
    pub is_completed: Option<bool>,
    /// Exact title match.
    pub title: Option<String>,
}

impl TodoListQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_completed: None,
            title: None,
        }
    }

    pub fn with_completion(mut self, is_completed: Option<bool>) -> Self {
        self.is_completed = is_completed;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns whether `todo` satisfies every supplied predicate.
    pub fn matches(&self, todo: &Todo) -> bool {
        todo.is_owned_by(&self.user_id)
            && self.is_completed.map_or(true, |flag| todo.is_completed == flag)
            && self.title.as_deref().map_or(true, |title| todo.title == title)
    }
}

/// Storage seam for todo records.
///
/// Implementations must apply each call fully or not at all.
pub trait TodoRepository {
    /// Persists a new todo and returns it with store-assigned fields.
    fn insert_todo(&self, todo: &NewTodo) -> RepoResult<Todo>;
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    /// Merges `patch` into an existing todo and returns the stored result.
    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo>;
    /// Permanently removes a todo. Fails with `NotFound` for unknown ids.
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
}

impl<T: TodoRepository + ?Sized> TodoRepository for &T {
    fn insert_todo(&self, todo: &NewTodo) -> RepoResult<Todo> {
        (**self).insert_todo(todo)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        (**self).get_todo(id)
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        (**self).patch_todo(id, patch)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        (**self).delete_todo(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        (**self).list_todos(query)
    }
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema drifted.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert_todo(&self, todo: &NewTodo) -> RepoResult<Todo> {
        let id = TodoId::new();
        let created_at: i64 = self.conn.query_row(
            "INSERT INTO todos (
                uuid,
                user_id,
                title,
                description,
                is_completed,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                MAX(
                    CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER),
                    COALESCE((SELECT MAX(created_at) FROM todos), 0)
                )
            )
            RETURNING created_at;",
            params![
                id.to_string(),
                todo.user_id.as_str(),
                todo.title.as_str(),
                todo.description.as_deref(),
                bool_to_int(todo.is_completed),
            ],
            |row| row.get(0),
        )?;

        Ok(todo.clone().into_todo(id, created_at))
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        select_by_id(self.conn, id)
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(mut todo) = select_by_id(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };

        patch.apply_to(&mut todo);
        tx.execute(
            "UPDATE todos
             SET
                title = ?1,
                description = ?2,
                is_completed = ?3
             WHERE uuid = ?4;",
            params![
                todo.title.as_str(),
                todo.description.as_deref(),
                bool_to_int(todo.is_completed),
                id.to_string(),
            ],
        )?;
        tx.commit()?;

        Ok(todo)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("{TODO_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.user_id.clone())];

        if let Some(is_completed) = query.is_completed {
            sql.push_str(" AND is_completed = ?");
            bind_values.push(Value::Integer(bool_to_int(is_completed)));
        }

        if let Some(title) = query.title.as_ref() {
            sql.push_str(" AND title = ?");
            bind_values.push(Value::Text(title.clone()));
        }

        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();

        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }
}

fn select_by_id(conn: &Connection, id: TodoId) -> RepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }

    Ok(None)
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let uuid_text: String = row.get("uuid")?;
    let id = TodoId::parse(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in todos.uuid"))
    })?;

    let is_completed = match row.get::<_, i64>("is_completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_completed value `{other}` in todos.is_completed"
            )));
        }
    };

    Ok(Todo {
        id,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        is_completed,
        created_at: row.get("created_at")?,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "todos")? {
        return Err(RepoError::MissingRequiredTable("todos"));
    }

    let present = table_columns(conn, "todos")?;
    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "todos",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
