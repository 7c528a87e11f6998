//! Per-user todo store.
//! This crate owns the todo schema, its storage backends and the store API.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{call_function, handle_request, ApiError, ApiResponse, FunctionCall, FunctionKind};
pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::todo::{NewTodo, Todo, TodoId, TodoPatch, TodoValidationError};
pub use repo::memory_repo::MemoryTodoRepository;
pub use repo::todo_repo::{
    ErrorKind, RepoError, RepoResult, SqliteTodoRepository, TodoListQuery, TodoRepository,
};
pub use service::todo_service::TodoStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
