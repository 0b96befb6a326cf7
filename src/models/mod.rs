//! Data models for Waypoint entities.
//!
//! This module defines the core data structures:
//! - `Lesson` - An ordered unit of course material with content steps
//! - `Task` - An XP-earning work item linked to one or more lessons
//! - `ProgressRecord` - Per-lesson resume state for a learner
//! - `Course` - The import document bundling lessons and tasks
//!
//! Lesson content itself is a versioned payload; see [`crate::content`] for
//! the shapes it can take and the parser that normalizes them into steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::LessonContent;

/// An ordered unit of course material.
///
/// Ordering is positional within the course's lesson list and significant:
/// the lesson at index 0 is always accessible, and each lesson's
/// `xp_threshold` gates the *next* lesson in sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique identifier within the course
    #[serde(default)]
    pub id: String,

    /// Lesson title
    #[serde(default)]
    pub title: String,

    /// Longer description shown alongside the title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Versioned content payload, normalized into steps by `content::parse`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<LessonContent>,

    /// XP a learner must earn from this lesson's linked tasks before the
    /// next lesson in sequence unlocks. Zero means no threshold.
    #[serde(default)]
    pub xp_threshold: u32,

    /// Ids of tasks associated with this lesson
    #[serde(default)]
    pub linked_task_ids: Vec<String>,
}

impl Lesson {
    /// Create a new lesson with the given id and title.
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            description: None,
            content: None,
            xp_threshold: 0,
            linked_task_ids: Vec::new(),
        }
    }
}

/// Review state of a task submission.
///
/// A task earns its XP only once approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// An XP-earning work item.
///
/// Tasks are linked to lessons from the lesson side (`linked_task_ids`);
/// a task may belong to zero, one, or several lessons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the course
    #[serde(default)]
    pub id: String,

    /// Task title
    #[serde(default)]
    pub title: String,

    /// Skill pillar this task belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,

    /// XP awarded when the task is approved
    #[serde(default)]
    pub xp_value: u32,

    /// Completion signal: only `approved` tasks earn XP
    #[serde(default)]
    pub approval_status: ApprovalStatus,

    /// Whether the task is required (as opposed to optional practice)
    #[serde(default)]
    pub is_required: bool,
}

impl Task {
    /// Create a new task with the given id and title.
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            pillar: None,
            xp_value: 0,
            approval_status: ApprovalStatus::default(),
            is_required: false,
        }
    }

    /// Whether this task currently counts as completed for XP purposes.
    pub fn is_completed(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }
}

/// Lifecycle status of a learner's progress through one lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Derive the status from the completed content-step count.
    ///
    /// `Completed` requires at least one content step; a lesson with no
    /// content steps is never `Completed`.
    pub fn derive(completed: usize, content_steps: usize) -> Self {
        if content_steps > 0 && completed >= content_steps {
            Self::Completed
        } else if completed == 0 {
            Self::NotStarted
        } else {
            Self::InProgress
        }
    }
}

/// The exact resume position within a lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPosition {
    /// Content-step indices the learner has advanced past.
    /// Never includes the virtual tasks-step index.
    #[serde(default)]
    pub completed_steps: Vec<usize>,

    /// Last step index the learner was viewing
    #[serde(default)]
    pub current_step: usize,
}

/// Per-lesson progress for a learner, one record per `(learner, lesson)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Lesson this record belongs to
    pub lesson_id: String,

    /// Derived lifecycle status
    #[serde(default)]
    pub status: ProgressStatus,

    /// Derived completion percentage over content steps, clamped to 0..=100
    #[serde(default)]
    pub progress_percentage: f64,

    /// Exact resume position
    #[serde(default)]
    pub last_position: LastPosition,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Build a record from the completed set and cursor, deriving `status`
    /// and `progress_percentage` from the content-step total at call time.
    ///
    /// Only content-step indices are persisted; anything at or beyond
    /// `content_steps` (the virtual tasks step) is dropped.
    pub fn new(
        lesson_id: String,
        completed_steps: impl IntoIterator<Item = usize>,
        current_step: usize,
        content_steps: usize,
    ) -> Self {
        let mut completed: Vec<usize> = completed_steps
            .into_iter()
            .filter(|&i| i < content_steps)
            .collect();
        completed.sort_unstable();
        completed.dedup();

        let status = ProgressStatus::derive(completed.len(), content_steps);
        let progress_percentage = progress_percentage(completed.len(), content_steps);

        Self {
            lesson_id,
            status,
            progress_percentage,
            last_position: LastPosition {
                completed_steps: completed,
                current_step,
            },
            updated_at: Utc::now(),
        }
    }
}

/// Completion percentage over content steps, clamped to `0..=100`.
///
/// Zero when the lesson has no content steps.
pub fn progress_percentage(completed: usize, content_steps: usize) -> f64 {
    if content_steps == 0 {
        return 0.0;
    }
    (completed as f64 / content_steps as f64 * 100.0).clamp(0.0, 100.0)
}

/// A course import document: the project id plus its lessons and tasks.
///
/// Courses are authored elsewhere; this is the ingestion shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Project identifier; generated at import when absent
    #[serde(default, alias = "project_id")]
    pub project: Option<String>,

    /// Course title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Ordered lesson list
    #[serde(default)]
    pub lessons: Vec<Lesson>,

    /// Full task set for the project
    #[serde(default)]
    pub tasks: Vec<Task>,
}
