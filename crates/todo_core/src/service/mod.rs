//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the store's public operations.
//! - Keep request boundaries decoupled from storage details.

pub mod todo_service;
