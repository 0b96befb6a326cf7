//! Lesson/task linkage resolution.
//!
//! Tasks are linked from the lesson side via `linked_task_ids`; this module
//! resolves that id set against the project's full task list and computes
//! the XP those tasks have earned.

use std::collections::HashSet;

use crate::models::{Lesson, Task};

/// The tasks linked to one lesson, split by requirement, plus earned XP.
#[derive(Debug, Clone, Default)]
pub struct TaskLinkage {
    /// All tasks from the project list referenced by the lesson
    pub linked: Vec<Task>,
    /// Linked tasks with `is_required` set
    pub required: Vec<Task>,
    /// Linked tasks without `is_required`
    pub optional: Vec<Task>,
    /// Sum of `xp_value` over linked tasks that are completed
    pub earned_xp: u32,
}

impl TaskLinkage {
    /// Whether the lesson has any linked tasks at all.
    pub fn has_tasks(&self) -> bool {
        !self.linked.is_empty()
    }

    /// Total XP the lesson's linked tasks could yield if all were approved.
    pub fn available_xp(&self) -> u32 {
        self.linked.iter().map(|t| t.xp_value).sum()
    }
}

/// Resolve the subset of `all_tasks` linked to `lesson`.
///
/// Ids referenced by the lesson but absent from the task list contribute
/// nothing; they are not an error. Incomplete tasks contribute zero XP
/// regardless of their `xp_value`.
pub fn resolve(lesson: &Lesson, all_tasks: &[Task]) -> TaskLinkage {
    if lesson.linked_task_ids.is_empty() {
        return TaskLinkage::default();
    }

    let ids: HashSet<&str> = lesson.linked_task_ids.iter().map(String::as_str).collect();
    let linked: Vec<Task> = all_tasks
        .iter()
        .filter(|t| ids.contains(t.id.as_str()))
        .cloned()
        .collect();

    let earned_xp = linked
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| t.xp_value)
        .sum();

    let (required, optional) = linked.iter().cloned().partition(|t: &Task| t.is_required);

    TaskLinkage {
        linked,
        required,
        optional,
        earned_xp,
    }
}
