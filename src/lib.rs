//! Tandem Admin - backend for pairing students with language teachers
//!
//! This library provides the teacher suggestion engine and the status
//! transition handler used by the program's admin frontend, plus the REST
//! layer and storage behind them.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Suggester, SuggestionResult, MAX_SUGGESTIONS};
pub use error::AppError;
pub use models::{Status, StatusRef, StatusTransition, StatusUpdate, Student, Teacher};
pub use services::{InMemoryStore, PostgresStore, StatusTransitionHandler, Store};
