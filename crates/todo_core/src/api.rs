//! Request/response boundary for named store functions.
//!
//! # Responsibility
//! - Route `{path, args, format}` calls to store operations.
//! - Validate argument shape strictly before the store is touched.
//! - Wrap every outcome in a `status`-tagged response envelope.
//!
//! # Invariants
//! - Unknown fields, missing required fields and malformed ids are
//!   validation errors, never store errors.
//! - Queries cannot be invoked as mutations and vice versa.
//! - `handle_request` never panics and always yields an envelope.

use crate::model::todo::{NewTodo, TodoId, TodoPatch};
use crate::repo::todo_repo::{ErrorKind, RepoError, TodoRepository};
use crate::service::todo_service::TodoStore;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const SAVE_TODO: &str = "todoFunc:saveTodo";
pub const UPDATE_TODO: &str = "todoFunc:updateTodo";
pub const DELETE_TODO: &str = "todoFunc:deleteTodo";
pub const GET_TODOS: &str = "todoFunc:getTodos";
pub const GET_ALL_TODOS: &str = "todoFunc:getAllTodos";

const JSON_FORMAT: &str = "json";

/// Whether a function reads (`Query`) or writes (`Mutation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Query,
    Mutation,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }

    /// Kind registered for `path`, or `None` for unknown functions.
    pub fn of(path: &str) -> Option<Self> {
        match path {
            SAVE_TODO | UPDATE_TODO | DELETE_TODO => Some(Self::Mutation),
            GET_TODOS | GET_ALL_TODOS => Some(Self::Query),
            _ => None,
        }
    }
}

/// One named function call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCall {
    pub path: String,
    #[serde(default = "empty_args")]
    pub args: Value,
    #[serde(default = "json_format")]
    pub format: String,
}

impl FunctionCall {
    pub fn new(path: impl Into<String>, args: Value) -> Self {
        Self {
            path: path.into(),
            args,
            format: json_format(),
        }
    }
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

fn json_format() -> String {
    JSON_FORMAT.to_string()
}

/// Response envelope returned for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiResponse {
    Success {
        value: Value,
    },
    Error {
        #[serde(rename = "errorKind")]
        error_kind: ErrorKind,
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl From<Result<Value, ApiError>> for ApiResponse {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(err) => Self::Error {
                error_kind: err.kind(),
                error_message: err.to_string(),
            },
        }
    }
}

/// Boundary error: rejected input or a store failure.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Repo(RepoError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateTodoArgs {
    id: TodoId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    is_completed: bool,
}

impl UpdateTodoArgs {
    fn into_parts(self) -> (TodoId, TodoPatch) {
        (
            self.id,
            TodoPatch {
                title: self.title,
                description: self.description,
                is_completed: self.is_completed,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteTodoArgs {
    id: TodoId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetTodosArgs {
    user_id: String,
    #[serde(default)]
    is_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetAllTodosArgs {
    user_id: String,
}

/// Dispatches one call invoked as `kind` against `store`.
///
/// # Errors
/// - `ApiError::Validation` for unknown paths, kind mismatches, unsupported
///   formats and malformed arguments.
/// - `ApiError::Repo` for store failures, unchanged.
pub fn call_function<R: TodoRepository>(
    store: &TodoStore<R>,
    kind: FunctionKind,
    call: &FunctionCall,
) -> Result<Value, ApiError> {
    if call.format != JSON_FORMAT {
        return Err(ApiError::Validation(format!(
            "unsupported format `{}`; expected `{JSON_FORMAT}`",
            call.format
        )));
    }

    let registered = FunctionKind::of(&call.path).ok_or_else(|| {
        ApiError::Validation(format!("unknown function `{}`", call.path))
    })?;
    if registered != kind {
        return Err(ApiError::Validation(format!(
            "`{}` is a {} and cannot be called as a {}",
            call.path,
            registered.as_str(),
            kind.as_str()
        )));
    }

    match call.path.as_str() {
        SAVE_TODO => {
            let todo: NewTodo = parse_args(call)?;
            let id = store.create(todo)?;
            Ok(Value::String(id.to_string()))
        }
        UPDATE_TODO => {
            let (id, patch) = parse_args::<UpdateTodoArgs>(call)?.into_parts();
            store.update(id, &patch)?;
            Ok(Value::Null)
        }
        DELETE_TODO => {
            let args: DeleteTodoArgs = parse_args(call)?;
            store.delete(args.id)?;
            Ok(Value::Null)
        }
        GET_TODOS => {
            let args: GetTodosArgs = parse_args(call)?;
            to_json(&store.list(&args.user_id, args.is_completed)?)
        }
        GET_ALL_TODOS => {
            let args: GetAllTodosArgs = parse_args(call)?;
            to_json(&store.list_all(&args.user_id)?)
        }
        other => Err(ApiError::Validation(format!("unknown function `{other}`"))),
    }
}

/// Parses a raw JSON request body and dispatches it, always producing an
/// envelope.
pub fn handle_request<R: TodoRepository>(
    store: &TodoStore<R>,
    kind: FunctionKind,
    body: &str,
) -> ApiResponse {
    let result = serde_json::from_str::<FunctionCall>(body)
        .map_err(|err| ApiError::Validation(format!("malformed request: {err}")))
        .and_then(|call| call_function(store, kind, &call));

    if let Err(err) = &result {
        warn!(
            "event=api_call module=api status=error kind={} error_kind={}",
            kind.as_str(),
            err.kind().as_str()
        );
    }

    result.into()
}

fn parse_args<T: DeserializeOwned>(call: &FunctionCall) -> Result<T, ApiError> {
    serde_json::from_value(call.args.clone()).map_err(|err| {
        ApiError::Validation(format!("invalid arguments for `{}`: {err}", call.path))
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|err| ApiError::Repo(RepoError::InvalidData(format!("serialize failed: {err}"))))
}

#[cfg(test)]
mod tests {
    use super::{FunctionKind, DELETE_TODO, GET_TODOS, SAVE_TODO};

    #[test]
    fn registry_knows_kinds() {
        assert_eq!(FunctionKind::of(SAVE_TODO), Some(FunctionKind::Mutation));
        assert_eq!(FunctionKind::of(DELETE_TODO), Some(FunctionKind::Mutation));
        assert_eq!(FunctionKind::of(GET_TODOS), Some(FunctionKind::Query));
        assert_eq!(FunctionKind::of("todoFunc:nope"), None);
    }
}
