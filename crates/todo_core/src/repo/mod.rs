//! Repository layer abstractions and storage backends.
//!
//! # Responsibility
//! - Define the storage seam (`TodoRepository`) injected into the store.
//! - Isolate SQLite query details from service orchestration.
//! - Provide an in-process backend with the same observable behavior.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage transport errors.
//! - Indexes accelerate equality filters but never change results.

pub mod memory_repo;
pub mod todo_repo;
