//! Domain model for the per-user todo list.
//!
//! # Responsibility
//! - Define the canonical `Todo` record and its typed identifier.
//! - Provide the typed create/patch inputs consumed by the store.
//!
//! # Invariants
//! - Every todo is identified by a non-nil `TodoId`.
//! - `user_id` is fixed at creation; no patch shape can carry it.
//! - Deletion is permanent; there is no tombstone state.

pub mod todo;
