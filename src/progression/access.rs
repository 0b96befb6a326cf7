//! Lesson accessibility: XP gates and cascading locks.
//!
//! A lesson's `xp_threshold` gates the *next* lesson in sequence, and locks
//! cascade: a later lesson is never reachable through a chain containing a
//! locked one. Both checks here are pure functions of their inputs: there
//! is no "unlocked once, always unlocked" caching, so un-approving a task
//! may re-lock lessons, which is permitted.

use serde::Serialize;

use super::linkage;
use crate::models::{Lesson, Task};

/// The nearest preceding lesson whose XP threshold is unmet, and how much
/// XP is still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Blocker {
    /// Index of the blocking lesson in the course's lesson list
    pub lesson_index: usize,
    /// XP still required to satisfy the blocking lesson's threshold
    pub missing_xp: u32,
}

/// Whether the lesson at `lesson_index` is unlocked.
///
/// Administrators see everything, and the first lesson is never gated.
/// Otherwise every preceding lesson with a threshold must have earned
/// enough XP from its linked tasks; the scan runs forward from the start
/// and stops at the first unmet threshold.
pub fn is_accessible(
    lesson_index: usize,
    lessons: &[Lesson],
    all_tasks: &[Task],
    is_admin: bool,
) -> bool {
    if is_admin {
        return true;
    }
    if lesson_index == 0 {
        return true;
    }
    if lesson_index >= lessons.len() {
        return false;
    }

    // Forward scan: the first unmet threshold locks everything after it.
    for index in 1..=lesson_index {
        if threshold_unmet(&lessons[index - 1], all_tasks) {
            return false;
        }
    }
    true
}

/// Find the blocker for a locked lesson: scanning backward from the
/// immediately preceding lesson, the first one with an unmet threshold.
///
/// Returns `None` when nothing blocks (the lesson is accessible, or is the
/// first lesson).
pub fn blocking_lesson(
    lesson_index: usize,
    lessons: &[Lesson],
    all_tasks: &[Task],
) -> Option<Blocker> {
    let last = lesson_index.min(lessons.len()).checked_sub(1)?;

    for index in (0..=last).rev() {
        let lesson = &lessons[index];
        if lesson.xp_threshold == 0 {
            continue;
        }
        let earned = linkage::resolve(lesson, all_tasks).earned_xp;
        if earned < lesson.xp_threshold {
            return Some(Blocker {
                lesson_index: index,
                missing_xp: lesson.xp_threshold - earned,
            });
        }
    }
    None
}

fn threshold_unmet(lesson: &Lesson, all_tasks: &[Task]) -> bool {
    lesson.xp_threshold > 0
        && linkage::resolve(lesson, all_tasks).earned_xp < lesson.xp_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;

    fn lesson(id: &str, threshold: u32, task_ids: &[&str]) -> Lesson {
        let mut l = Lesson::new(id.to_string(), format!("Lesson {id}"));
        l.xp_threshold = threshold;
        l.linked_task_ids = task_ids.iter().map(|s| s.to_string()).collect();
        l
    }

    fn task(id: &str, xp: u32, status: ApprovalStatus) -> Task {
        let mut t = Task::new(id.to_string(), format!("Task {id}"));
        t.xp_value = xp;
        t.is_required = true;
        t.approval_status = status;
        t
    }

    #[test]
    fn test_first_lesson_always_accessible() {
        let lessons = vec![lesson("a", 500, &["t"])];
        let tasks = vec![task("t", 0, ApprovalStatus::Pending)];
        assert!(is_accessible(0, &lessons, &tasks, false));
        assert!(is_accessible(0, &[], &[], false));
    }

    #[test]
    fn test_admin_sees_everything() {
        let lessons = vec![lesson("a", 100, &["t"]), lesson("b", 0, &[])];
        let tasks = vec![task("t", 150, ApprovalStatus::Pending)];
        assert!(!is_accessible(1, &lessons, &tasks, false));
        assert!(is_accessible(1, &lessons, &tasks, true));
    }

    #[test]
    fn test_unmet_threshold_locks_next() {
        // Lesson a requires 100 XP; its only task is worth 150 but pending.
        let lessons = vec![lesson("a", 100, &["t"]), lesson("b", 0, &[])];
        let mut tasks = vec![task("t", 150, ApprovalStatus::Pending)];
        assert!(!is_accessible(1, &lessons, &tasks, false));

        // Approving the task pushes earned XP to 150 >= 100.
        tasks[0].approval_status = ApprovalStatus::Approved;
        assert!(is_accessible(1, &lessons, &tasks, false));
    }

    #[test]
    fn test_zero_threshold_never_gates() {
        let lessons = vec![lesson("a", 0, &["t"]), lesson("b", 0, &[])];
        let tasks = vec![task("t", 10, ApprovalStatus::Pending)];
        assert!(is_accessible(1, &lessons, &tasks, false));
    }

    #[test]
    fn test_locks_cascade() {
        // a gates b; b and c themselves have no thresholds. Locking at b
        // must also lock c and d (monotonic lock propagation).
        let lessons = vec![
            lesson("a", 100, &["t"]),
            lesson("b", 0, &[]),
            lesson("c", 0, &[]),
            lesson("d", 0, &[]),
        ];
        let tasks = vec![task("t", 100, ApprovalStatus::Pending)];
        assert!(!is_accessible(1, &lessons, &tasks, false));
        assert!(!is_accessible(2, &lessons, &tasks, false));
        assert!(!is_accessible(3, &lessons, &tasks, false));
    }

    #[test]
    fn test_relocking_is_permitted() {
        let lessons = vec![lesson("a", 100, &["t"]), lesson("b", 0, &[])];
        let mut tasks = vec![task("t", 100, ApprovalStatus::Approved)];
        assert!(is_accessible(1, &lessons, &tasks, false));

        // Un-approving the task takes the XP away again.
        tasks[0].approval_status = ApprovalStatus::Pending;
        assert!(!is_accessible(1, &lessons, &tasks, false));
    }

    #[test]
    fn test_out_of_range_index_is_locked() {
        let lessons = vec![lesson("a", 0, &[])];
        assert!(!is_accessible(5, &lessons, &[], false));
        assert!(is_accessible(5, &lessons, &[], true));
    }

    #[test]
    fn test_blocker_is_nearest_preceding_unmet() {
        // Both a and c have unmet thresholds; for a lesson after c the
        // blocker is c (nearest), not a (earliest).
        let lessons = vec![
            lesson("a", 100, &["ta"]),
            lesson("b", 0, &[]),
            lesson("c", 200, &["tc"]),
            lesson("d", 0, &[]),
        ];
        let tasks = vec![
            task("ta", 100, ApprovalStatus::Pending),
            task("tc", 50, ApprovalStatus::Approved),
        ];
        let blocker = blocking_lesson(3, &lessons, &tasks).unwrap();
        assert_eq!(blocker.lesson_index, 2);
        assert_eq!(blocker.missing_xp, 150);
    }

    #[test]
    fn test_blocker_skips_thresholdless_neighbor() {
        // The immediately preceding lesson has no threshold; the blocker is
        // further back.
        let lessons = vec![
            lesson("a", 100, &["t"]),
            lesson("b", 0, &[]),
            lesson("c", 0, &[]),
        ];
        let tasks = vec![task("t", 0, ApprovalStatus::Pending)];
        let blocker = blocking_lesson(2, &lessons, &tasks).unwrap();
        assert_eq!(blocker.lesson_index, 0);
        assert_eq!(blocker.missing_xp, 100);
    }

    #[test]
    fn test_no_blocker_when_open() {
        let lessons = vec![lesson("a", 0, &[]), lesson("b", 0, &[])];
        assert_eq!(blocking_lesson(1, &lessons, &[]), None);
        assert_eq!(blocking_lesson(0, &lessons, &[]), None);
    }
}
