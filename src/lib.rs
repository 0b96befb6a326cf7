//! Waypoint - a curriculum runner for self-paced courses.
//!
//! This library provides the core functionality for the `wp` CLI tool:
//! parsing lesson content into steps, resolving lesson/task linkage and
//! earned XP, evaluating which lessons are unlocked, and tracking each
//! learner's exact resume position per lesson.

pub mod cli;
pub mod commands;
pub mod config;
pub mod content;
pub mod models;
pub mod progression;
pub mod storage;


/// Library-level error type for Waypoint operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No course found: run `wp course import <file>` first")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lesson is locked: {0}")]
    LessonLocked(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Waypoint operations.
pub type Result<T> = std::result::Result<T, Error>;
