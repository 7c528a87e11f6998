//! Todo store service.
//!
//! # Responsibility
//! - Expose create / update / delete / list entry points over an injected
//!   `TodoRepository`.
//! - Emit metadata-only diagnostic events for each operation.
//!
//! # Invariants
//! - Errors from the repository propagate unchanged; nothing is retried.
//! - User-supplied text (titles, descriptions, user ids) is never logged.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoPatch};
use crate::repo::todo_repo::{RepoResult, TodoListQuery, TodoRepository};
use log::{debug, warn};
use std::time::Instant;

/// The todo store: owns all todo records through its repository.
pub struct TodoStore<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoStore<R> {
    /// Creates a store over the provided storage backend.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Persists a new todo and returns its store-assigned id.
    pub fn create(&self, todo: NewTodo) -> RepoResult<TodoId> {
        observe("todo_create", || self.repo.insert_todo(&todo)).map(|stored| stored.id)
    }

    /// Applies a partial update and returns the record as stored.
    ///
    /// Only supplied `title`/`description` change; `is_completed` is always
    /// overwritten. Fails with `NotFound` when `id` does not exist.
    pub fn update(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        observe("todo_update", || self.repo.patch_todo(id, patch))
    }

    /// Permanently removes a todo. Fails with `NotFound` for unknown ids.
    pub fn delete(&self, id: TodoId) -> RepoResult<()> {
        observe("todo_delete", || self.repo.delete_todo(id))
    }

    /// Lists todos owned by `user_id`, optionally filtered by completion.
    pub fn list(&self, user_id: &str, is_completed: Option<bool>) -> RepoResult<Vec<Todo>> {
        self.query(&TodoListQuery::for_user(user_id).with_completion(is_completed))
    }

    /// Lists every todo owned by `user_id`. Same as `list(user_id, None)`.
    pub fn list_all(&self, user_id: &str) -> RepoResult<Vec<Todo>> {
        self.list(user_id, None)
    }

    /// Runs an arbitrary equality-filter query.
    pub fn query(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let todos = observe("todo_list", || self.repo.list_todos(query))?;
        debug!(
            "event=todo_list module=service status=ok filtered_completion={} filtered_title={} count={}",
            query.is_completed.is_some(),
            query.title.is_some(),
            todos.len()
        );
        Ok(todos)
    }

    pub fn get(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        observe("todo_get", || self.repo.get_todo(id))
    }
}

fn observe<T>(event: &'static str, op: impl FnOnce() -> RepoResult<T>) -> RepoResult<T> {
    let started_at = Instant::now();
    let result = op();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => debug!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={duration_ms} error_kind={}",
            err.kind().as_str()
        ),
    }
    result
}
