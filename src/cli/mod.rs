//! CLI argument definitions for Waypoint.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Waypoint - a curriculum runner for self-paced courses.
///
/// Import a course with `wp course import`, then `wp lesson select` and
/// `wp next` to move through it.
#[derive(Parser, Debug)]
#[command(name = "wp")]
#[command(author, version, about = "A CLI curriculum runner that tracks lesson progress and XP-gated unlocks", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Project to operate on. Defaults to the configured default project,
    /// then to the most recently imported one.
    #[arg(short = 'P', long = "project", global = true, env = "WP_PROJECT")]
    pub project: Option<String>,

    /// Evaluate lesson accessibility as an administrator (sees every lesson)
    #[arg(long, global = true, env = "WP_ADMIN")]
    pub admin: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Course management commands
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },

    /// Lesson selection and inspection
    Lesson {
        #[command(subcommand)]
        command: LessonCommands,
    },

    /// Advance to the next step (marks the step you leave as completed)
    Next,

    /// Go back one step (marks nothing, saves nothing)
    Prev,

    /// Jump directly to a step index in the active lesson
    Goto {
        /// Step index (0-based; the tasks step is the last index)
        index: usize,
    },

    /// Task commands (the XP-earning side of a course)
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Saved progress commands
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },
}

/// Course subcommands
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    /// Import a course document (JSON), replacing lessons and tasks.
    /// Saved progress for matching lesson ids is preserved.
    Import {
        /// Path to the course JSON document
        file: PathBuf,
    },

    /// Show the course overview: lock states, XP, and progress per lesson
    Show,
}

/// Lesson subcommands
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    /// Select a lesson and restore the saved position
    Select {
        /// Lesson index (0-based) or lesson id
        lesson: String,

        /// Open at this step instead of the restored position (ignored when
        /// out of range)
        #[arg(long)]
        step: Option<usize>,
    },

    /// Show the active lesson: steps, cursor, and completed set
    Show,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks, optionally only those linked to one lesson
    List {
        /// Lesson index or id to filter by
        #[arg(long)]
        lesson: Option<String>,
    },

    /// Approve a task: it earns its XP and may unlock lessons
    Approve {
        /// Task id
        id: String,
    },

    /// Reopen a task: approval is withdrawn and lessons may re-lock
    Reopen {
        /// Task id
        id: String,
    },
}

/// Progress subcommands
#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Show saved progress records
    Show,

    /// Delete a lesson's saved progress (administrator reset)
    Reset {
        /// Lesson index or id
        lesson: String,
    },
}
