//! Todo domain model.
//!
//! # Responsibility
//! - Define the stored `Todo` record and the `TodoId` newtype.
//! - Express partial updates as an explicit `TodoPatch` merge.
//!
//! # Invariants
//! - `TodoId` never wraps the nil UUID.
//! - `title` and `is_completed` are always present on a stored todo.
//! - `description: None` (absent) is distinct from `Some("")`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier assigned by the store when a todo is created.
///
/// Wraps a UUID so todo ids cannot be confused with user ids or other
/// raw strings in signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TodoId(Uuid);

impl TodoId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID, rejecting the nil value.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, TodoValidationError> {
        if uuid.is_nil() {
            return Err(TodoValidationError::NilId);
        }
        Ok(Self(uuid))
    }

    /// Parses the hyphenated (or simple) textual UUID form.
    pub fn parse(value: &str) -> Result<Self, TodoValidationError> {
        let uuid = Uuid::parse_str(value.trim())
            .map_err(|_| TodoValidationError::MalformedId(value.to_string()))?;
        Self::from_uuid(uuid)
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TodoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TodoId {
    type Err = TodoValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TodoId {
    type Error = TodoValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TodoId> for String {
    fn from(value: TodoId) -> Self {
        value.to_string()
    }
}

/// Validation failures for todo identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// The nil UUID is reserved and never names a todo.
    NilId,
    /// The value is not a UUID at all.
    MalformedId(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "todo id must not be the nil uuid"),
            Self::MalformedId(value) => write!(f, "malformed todo id `{value}`"),
        }
    }
}

impl Error for TodoValidationError {}

/// A single task record owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    /// Owning user. Opaque and trusted; set once at creation.
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_completed: bool,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

impl Todo {
    /// Returns whether this todo belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Input for creating a todo. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTodo {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_completed: bool,
}

impl NewTodo {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, is_completed: bool) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            is_completed,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Materializes the stored record once identity and creation time exist.
    pub fn into_todo(self, id: TodoId, created_at: i64) -> Todo {
        Todo {
            id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            is_completed: self.is_completed,
            created_at,
        }
    }
}

/// Typed partial record for the update operation.
///
/// `title` and `description` change only when `Some`; `is_completed` is
/// mandatory and always overwrites. Ownership is not patchable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub is_completed: bool,
}

impl TodoPatch {
    /// A patch that only sets the completion flag.
    pub fn completion(is_completed: bool) -> Self {
        Self {
            title: None,
            description: None,
            is_completed,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Merges the supplied fields into `todo`, leaving omitted fields as-is.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = Some(description.clone());
        }
        todo.is_completed = self.is_completed;
    }
}
