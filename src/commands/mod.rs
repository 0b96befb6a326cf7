//! Command implementations for the Waypoint CLI.
//!
//! This module contains the business logic behind each CLI command. Every
//! command returns a typed result implementing [`Output`]; the binary picks
//! JSON or human rendering.
//!
//! Fetch failures for lessons and tasks degrade to empty collections (with
//! a warning) so a broken read leaves navigation and accessibility in the
//! conservative first-lesson-only state instead of crashing the CLI.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::content::{self, Step, StepContent};
use crate::models::{ApprovalStatus, Course, Lesson, ProgressRecord, ProgressStatus, Task};
use crate::progression::{
    self, Blocker, Cursor, Progression, SessionState, StepSpace, TaskLinkage,
};
use crate::storage::{self, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Format for human-readable output.
    fn to_human(&self) -> String;

    /// Serialize to JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Resolve the project to operate on.
///
/// Priority: `--project` flag / `WP_PROJECT` env > configured default >
/// most recently imported project.
pub fn resolve_project(flag: Option<String>, config: &Config) -> Result<String> {
    if let Some(project) = flag {
        return Ok(project);
    }
    if let Some(project) = &config.default_project {
        return Ok(project.clone());
    }
    let data_root = storage::data_root()?;
    storage::default_project(&data_root)?.ok_or(Error::NotInitialized)
}

// === Course Commands ===

/// Result of `wp course import`.
#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub lessons: usize,
    pub tasks: usize,
}

impl Output for ImportResult {
    fn to_human(&self) -> String {
        format!(
            "Imported \"{}\" into project {}: {} lessons, {} tasks",
            self.title.as_deref().unwrap_or("course"),
            self.project,
            self.lessons,
            self.tasks
        )
    }
}

/// Import a course document, creating the project store on first use.
///
/// Lessons and tasks are replaced wholesale; saved progress for matching
/// lesson ids survives re-import.
pub fn course_import(file: &Path, project_override: Option<String>) -> Result<ImportResult> {
    let json = fs::read_to_string(file)?;
    let mut course: Course = serde_json::from_str(&json)
        .map_err(|e| Error::InvalidInput(format!("invalid course document: {e}")))?;

    let project = project_override
        .or_else(|| course.project.clone())
        .unwrap_or_else(|| format!("proj-{}", short_id()));

    assign_missing_ids(&mut course);
    validate_course(&course)?;

    let data_root = storage::data_root()?;
    let mut storage = Storage::init_at(&data_root, &project)?;
    storage.replace_course(&course)?;

    Ok(ImportResult {
        project,
        title: course.title.clone(),
        lessons: course.lessons.len(),
        tasks: course.tasks.len(),
    })
}

fn assign_missing_ids(course: &mut Course) {
    for lesson in &mut course.lessons {
        if lesson.id.is_empty() {
            lesson.id = format!("les-{}", short_id());
        }
    }
    for task in &mut course.tasks {
        if task.id.is_empty() {
            task.id = format!("tsk-{}", short_id());
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

fn validate_course(course: &Course) -> Result<()> {
    let mut lesson_ids = HashSet::new();
    for lesson in &course.lessons {
        if !lesson_ids.insert(lesson.id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "duplicate lesson id: {}",
                lesson.id
            )));
        }
    }
    let mut task_ids = HashSet::new();
    for task in &course.tasks {
        if !task_ids.insert(task.id.as_str()) {
            return Err(Error::InvalidInput(format!("duplicate task id: {}", task.id)));
        }
    }
    // Linked ids pointing at no known task are tolerated: they simply
    // contribute nothing until the task shows up.
    for lesson in &course.lessons {
        for task_id in &lesson.linked_task_ids {
            if !task_ids.contains(task_id.as_str()) {
                tracing::debug!(lesson = %lesson.id, task = %task_id, "linked task not in document");
            }
        }
    }
    Ok(())
}

/// One row of the course overview.
#[derive(Debug, Serialize)]
pub struct LessonSummary {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub content_steps: usize,
    pub linked_tasks: usize,
    pub xp_threshold: u32,
    pub earned_xp: u32,
    pub available_xp: u32,
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker: Option<Blocker>,
    pub status: ProgressStatus,
    pub progress_percentage: f64,
}

/// Result of `wp course show`.
#[derive(Debug, Serialize)]
pub struct CourseOverview {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub earned_xp: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_lesson: Option<String>,
    pub lessons: Vec<LessonSummary>,
}

impl Output for CourseOverview {
    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({}) - {} XP earned",
            self.title.as_deref().unwrap_or("Course"),
            self.project,
            self.earned_xp
        );
        for lesson in &self.lessons {
            let active = self.active_lesson.as_deref() == Some(lesson.id.as_str());
            let marker = if active { ">" } else { " " };
            let state = if !lesson.accessible {
                "locked"
            } else {
                match lesson.status {
                    ProgressStatus::NotStarted => "open",
                    ProgressStatus::InProgress => "in progress",
                    ProgressStatus::Completed => "done",
                }
            };
            let _ = write!(
                out,
                "{marker} {:>2}. {} [{state}] {} steps",
                lesson.index, lesson.title, lesson.content_steps
            );
            if lesson.linked_tasks > 0 {
                let _ = write!(
                    out,
                    ", {} tasks ({}/{} XP)",
                    lesson.linked_tasks,
                    lesson.earned_xp,
                    lesson.available_xp
                );
            }
            if lesson.xp_threshold > 0 {
                let _ = write!(out, ", unlocks next at {} XP", lesson.xp_threshold);
            }
            if let Some(blocker) = &lesson.blocker {
                let _ = write!(
                    out,
                    " (blocked by lesson {}, {} XP short)",
                    blocker.lesson_index, blocker.missing_xp
                );
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

/// Show the course overview with lock states, XP, and per-lesson progress.
pub fn course_show(storage: &Storage, is_admin: bool) -> Result<CourseOverview> {
    let lessons = lessons_or_empty(storage);
    let tasks = tasks_or_empty(storage);
    let session = storage.load_session()?;

    let records: HashMap<String, ProgressRecord> = match storage.progress_records() {
        Ok(records) => records
            .into_iter()
            .map(|record| (record.lesson_id.clone(), record))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load progress records, continuing with none");
            HashMap::new()
        }
    };

    let mut summaries = Vec::with_capacity(lessons.len());
    for (index, lesson) in lessons.iter().enumerate() {
        let linkage = progression::resolve(lesson, &tasks);
        let accessible = progression::is_accessible(index, &lessons, &tasks, is_admin);
        let blocker = if accessible {
            None
        } else {
            progression::blocking_lesson(index, &lessons, &tasks)
        };
        let steps = content::parse(lesson.content.as_ref());
        let (status, progress_percentage) = records
            .get(&lesson.id)
            .map(|record| (record.status, record.progress_percentage))
            .unwrap_or((ProgressStatus::NotStarted, 0.0));

        summaries.push(LessonSummary {
            index,
            id: lesson.id.clone(),
            title: lesson.title.clone(),
            content_steps: steps.len(),
            linked_tasks: linkage.linked.len(),
            xp_threshold: lesson.xp_threshold,
            earned_xp: linkage.earned_xp,
            available_xp: linkage.available_xp(),
            accessible,
            blocker,
            status,
            progress_percentage,
        });
    }

    let earned_xp = tasks
        .iter()
        .filter(|task| task.is_completed())
        .map(|task| task.xp_value)
        .sum();

    Ok(CourseOverview {
        project: storage.project().to_string(),
        title: storage.course_title()?,
        earned_xp,
        active_lesson: session.active_lesson,
        lessons: summaries,
    })
}

// === Lesson Commands ===

/// One step row in a lesson view. The virtual tasks step appears as the
/// last row with kind `tasks`.
#[derive(Debug, Serialize)]
pub struct StepView {
    pub index: usize,
    pub id: String,
    pub kind: &'static str,
    pub has_content: bool,
    pub completed: bool,
    pub current: bool,
}

/// One linked task row in a lesson view.
#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub xp_value: u32,
    pub approval_status: ApprovalStatus,
    pub is_required: bool,
}

/// Result of `wp lesson select` and `wp lesson show`.
#[derive(Debug, Serialize)]
pub struct LessonView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub cursor: Cursor,
    pub content_steps: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_step: Option<usize>,
    pub completed_steps: Vec<usize>,
    pub content_complete: bool,
    pub earned_xp: u32,
    pub steps: Vec<StepView>,
    pub linked_tasks: Vec<TaskView>,
}

impl Output for LessonView {
    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Lesson {}: {} ({})", self.index, self.title, self.id);
        let position = match self.cursor {
            Cursor::Content { index } => format!("content step {index}"),
            Cursor::Tasks => "the tasks step".to_string(),
        };
        let _ = writeln!(
            out,
            "At {position}; {} of {} content steps complete",
            self.completed_steps.len(),
            self.content_steps
        );
        for step in &self.steps {
            let marker = if step.current {
                ">"
            } else if step.completed {
                "x"
            } else {
                " "
            };
            let _ = writeln!(out, "  [{marker}] {}. {} ({})", step.index, step.id, step.kind);
        }
        if !self.linked_tasks.is_empty() {
            let approved = self
                .linked_tasks
                .iter()
                .filter(|task| task.approval_status == ApprovalStatus::Approved)
                .count();
            let _ = writeln!(
                out,
                "Tasks: {approved} of {} approved, {} XP earned",
                self.linked_tasks.len(),
                self.earned_xp
            );
        }
        out.trim_end().to_string()
    }
}

/// Select a lesson and restore the saved position.
///
/// Locked lessons are refused for non-admins, naming the blocking lesson.
/// `initial_step` deep-links straight to a step when it is in range.
pub fn lesson_select(
    storage: &mut Storage,
    lesson_ref: &str,
    initial_step: Option<usize>,
    is_admin: bool,
) -> Result<LessonView> {
    let lessons = lessons_or_empty(storage);
    let tasks = tasks_or_empty(storage);
    let index = find_lesson_index(&lessons, lesson_ref)?;

    if !progression::is_accessible(index, &lessons, &tasks, is_admin) {
        let message = match progression::blocking_lesson(index, &lessons, &tasks) {
            Some(blocker) => format!(
                "complete more tasks in lesson {}: {} XP still needed",
                blocker.lesson_index, blocker.missing_xp
            ),
            None => format!("lesson {index} is not reachable yet"),
        };
        return Err(Error::LessonLocked(message));
    }

    let lesson = &lessons[index];
    let steps = content::parse(lesson.content.as_ref());
    let linkage = progression::resolve(lesson, &tasks);
    let space = StepSpace::new(steps.len(), linkage.has_tasks());

    let session = storage.load_session()?;
    let progress = storage.progress_store()?;
    let mut controller = Progression::new(progress, session);
    controller.select_lesson(&lesson.id, space, initial_step)?;
    let (progress, session) = controller.into_parts();
    progress.flush();
    storage.save_session(&session)?;

    Ok(build_lesson_view(index, lesson, &steps, space, &linkage, &session))
}

/// Show the active lesson without touching restoration state.
pub fn lesson_show(storage: &Storage) -> Result<LessonView> {
    let lessons = lessons_or_empty(storage);
    let tasks = tasks_or_empty(storage);
    let session = storage.load_session()?;

    let active = session
        .active_lesson
        .clone()
        .ok_or_else(no_active_lesson)?;
    let index = lessons
        .iter()
        .position(|lesson| lesson.id == active)
        .ok_or_else(|| Error::NotFound(format!("Lesson not found: {active}")))?;

    let lesson = &lessons[index];
    let steps = content::parse(lesson.content.as_ref());
    let linkage = progression::resolve(lesson, &tasks);
    let space = StepSpace::new(steps.len(), linkage.has_tasks());

    Ok(build_lesson_view(index, lesson, &steps, space, &linkage, &session))
}

fn build_lesson_view(
    index: usize,
    lesson: &Lesson,
    steps: &[Step],
    space: StepSpace,
    linkage: &TaskLinkage,
    session: &SessionState,
) -> LessonView {
    let current = session.current_step;

    let mut step_views: Vec<StepView> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| StepView {
            index: i,
            id: step.id.clone(),
            kind: step_kind(step),
            has_content: step.has_content(),
            completed: session.completed_steps.contains(&i),
            current: i == current,
        })
        .collect();

    if let Some(tasks_index) = space.tasks_step() {
        step_views.push(StepView {
            index: tasks_index,
            id: "tasks".to_string(),
            kind: "tasks",
            has_content: linkage.has_tasks(),
            // The tasks step is a durable landing page, never "completed".
            completed: false,
            current: current == tasks_index,
        });
    }

    let content_complete = space.content_steps() > 0
        && (0..space.content_steps()).all(|i| session.completed_steps.contains(&i));

    let cursor = if space.is_tasks(current) {
        Cursor::Tasks
    } else {
        Cursor::Content { index: current }
    };

    LessonView {
        index,
        id: lesson.id.clone(),
        title: lesson.title.clone(),
        cursor,
        content_steps: space.content_steps(),
        total_steps: space.total_steps(),
        tasks_step: space.tasks_step(),
        completed_steps: session.completed_steps.iter().copied().collect(),
        content_complete,
        earned_xp: linkage.earned_xp,
        steps: step_views,
        linked_tasks: linkage
            .linked
            .iter()
            .map(|task| TaskView {
                id: task.id.clone(),
                title: task.title.clone(),
                xp_value: task.xp_value,
                approval_status: task.approval_status,
                is_required: task.is_required,
            })
            .collect(),
    }
}

fn step_kind(step: &Step) -> &'static str {
    match step.content {
        StepContent::Text { .. } => "text",
        StepContent::Video { .. } => "video",
        StepContent::File { .. } => "file",
    }
}

// === Navigation Commands ===

/// Result of `wp next`, `wp prev`, and `wp goto`.
#[derive(Debug, Serialize)]
pub struct NavResult {
    pub lesson_id: String,
    pub cursor: Cursor,
    pub content_steps: usize,
    pub total_steps: usize,
    pub completed_steps: Vec<usize>,
    pub content_complete: bool,
    pub status: ProgressStatus,
}

impl Output for NavResult {
    fn to_human(&self) -> String {
        let position = match self.cursor {
            Cursor::Content { index } => {
                format!("content step {} of {}", index, self.total_steps)
            }
            Cursor::Tasks => "the tasks step".to_string(),
        };
        let mut line = format!("Now at {position} in {}", self.lesson_id);
        if self.content_complete {
            line.push_str(" (all content steps complete)");
        }
        line
    }
}

enum NavAction {
    Next,
    Prev,
    Goto(usize),
}

/// Advance to the next step, marking the departed step completed.
pub fn step_next(storage: &mut Storage) -> Result<NavResult> {
    navigate(storage, NavAction::Next)
}

/// Move back one step.
pub fn step_prev(storage: &mut Storage) -> Result<NavResult> {
    navigate(storage, NavAction::Prev)
}

/// Jump directly to a step index.
pub fn step_goto(storage: &mut Storage, index: usize) -> Result<NavResult> {
    navigate(storage, NavAction::Goto(index))
}

fn navigate(storage: &mut Storage, action: NavAction) -> Result<NavResult> {
    let lessons = lessons_or_empty(storage);
    let tasks = tasks_or_empty(storage);
    let session = storage.load_session()?;

    let active = session
        .active_lesson
        .clone()
        .ok_or_else(no_active_lesson)?;
    let lesson = lessons
        .iter()
        .find(|lesson| lesson.id == active)
        .ok_or_else(|| Error::NotFound(format!("Lesson not found: {active}")))?;

    let steps = content::parse(lesson.content.as_ref());
    let linkage = progression::resolve(lesson, &tasks);
    let space = StepSpace::new(steps.len(), linkage.has_tasks());

    let progress = storage.progress_store()?;
    let mut controller = Progression::new(progress, session);
    // The active lesson is already initialized, so this only re-attaches
    // the step space; local state is untouched.
    controller.select_lesson(&active, space, None)?;

    let cursor = match action {
        NavAction::Next => controller.next_step()?,
        NavAction::Prev => controller.prev_step()?,
        NavAction::Goto(index) => controller.go_to_step(index)?,
    };
    let content_complete = controller.is_content_complete();

    let (progress, session) = controller.into_parts();
    progress.flush();
    storage.save_session(&session)?;

    let completed: Vec<usize> = session
        .completed_steps
        .iter()
        .copied()
        .filter(|&i| i < space.content_steps())
        .collect();

    Ok(NavResult {
        lesson_id: active,
        cursor,
        content_steps: space.content_steps(),
        total_steps: space.total_steps(),
        status: ProgressStatus::derive(completed.len(), space.content_steps()),
        completed_steps: completed,
        content_complete,
    })
}

// === Task Commands ===

/// Result of `wp task list`.
#[derive(Debug, Serialize)]
pub struct TaskList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
    pub earned_xp: u32,
    pub tasks: Vec<Task>,
}

impl Output for TaskList {
    fn to_human(&self) -> String {
        let mut out = String::new();
        match &self.lesson {
            Some(lesson) => {
                let _ = writeln!(out, "Tasks linked to {lesson} ({} XP earned):", self.earned_xp);
            }
            None => {
                let _ = writeln!(out, "Tasks ({} XP earned):", self.earned_xp);
            }
        }
        if self.tasks.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for task in &self.tasks {
            let marker = if task.is_completed() { "x" } else { " " };
            let requirement = if task.is_required { "required" } else { "optional" };
            let _ = writeln!(
                out,
                "  [{marker}] {} {} ({} XP, {requirement})",
                task.id, task.title, task.xp_value
            );
        }
        out.trim_end().to_string()
    }
}

/// List tasks, optionally only those linked to one lesson.
pub fn task_list(storage: &Storage, lesson_ref: Option<&str>) -> Result<TaskList> {
    let tasks = tasks_or_empty(storage);
    match lesson_ref {
        None => {
            let earned_xp = tasks
                .iter()
                .filter(|task| task.is_completed())
                .map(|task| task.xp_value)
                .sum();
            Ok(TaskList {
                lesson: None,
                earned_xp,
                tasks,
            })
        }
        Some(reference) => {
            let lessons = lessons_or_empty(storage);
            let index = find_lesson_index(&lessons, reference)?;
            let linkage = progression::resolve(&lessons[index], &tasks);
            Ok(TaskList {
                lesson: Some(lessons[index].id.clone()),
                earned_xp: linkage.earned_xp,
                tasks: linkage.linked,
            })
        }
    }
}

/// Result of `wp task approve` / `wp task reopen`.
#[derive(Debug, Serialize)]
pub struct TaskChange {
    pub id: String,
    pub approval_status: ApprovalStatus,
    pub xp_value: u32,
    /// Lesson indices that became accessible through this change
    pub newly_unlocked: Vec<usize>,
    /// Lesson indices that stopped being accessible through this change
    pub newly_locked: Vec<usize>,
}

impl Output for TaskChange {
    fn to_human(&self) -> String {
        let verb = match self.approval_status {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Pending => "Reopened",
            ApprovalStatus::Rejected => "Rejected",
        };
        let mut line = format!("{verb} {} ({} XP)", self.id, self.xp_value);
        if !self.newly_unlocked.is_empty() {
            let _ = write!(line, ". Unlocked lessons: {:?}", self.newly_unlocked);
        }
        if !self.newly_locked.is_empty() {
            let _ = write!(line, ". Locked lessons: {:?}", self.newly_locked);
        }
        line
    }
}

/// Approve a task: its XP starts counting toward thresholds.
pub fn task_approve(storage: &mut Storage, id: &str) -> Result<TaskChange> {
    set_task_approval(storage, id, ApprovalStatus::Approved)
}

/// Reopen a task: its XP stops counting and lessons may re-lock.
pub fn task_reopen(storage: &mut Storage, id: &str) -> Result<TaskChange> {
    set_task_approval(storage, id, ApprovalStatus::Pending)
}

fn set_task_approval(
    storage: &mut Storage,
    id: &str,
    status: ApprovalStatus,
) -> Result<TaskChange> {
    let lessons = lessons_or_empty(storage);
    let before = accessibility_map(&lessons, &tasks_or_empty(storage));

    storage.set_task_approval(id, status)?;
    let task = storage.get_task(id)?;

    let after = accessibility_map(&lessons, &tasks_or_empty(storage));
    let newly_unlocked = (0..lessons.len())
        .filter(|&i| after[i] && !before[i])
        .collect();
    let newly_locked = (0..lessons.len())
        .filter(|&i| before[i] && !after[i])
        .collect();

    Ok(TaskChange {
        id: id.to_string(),
        approval_status: status,
        xp_value: task.xp_value,
        newly_unlocked,
        newly_locked,
    })
}

/// Accessibility flags from the learner's point of view (admins are never
/// locked out in the first place).
fn accessibility_map(lessons: &[Lesson], tasks: &[Task]) -> Vec<bool> {
    (0..lessons.len())
        .map(|index| progression::is_accessible(index, lessons, tasks, false))
        .collect()
}

// === Progress Commands ===

/// Result of `wp progress show`.
#[derive(Debug, Serialize)]
pub struct ProgressList {
    pub records: Vec<ProgressRecord>,
}

impl Output for ProgressList {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No saved progress.".to_string();
        }
        let mut out = String::new();
        for record in &self.records {
            let _ = writeln!(
                out,
                "{}: {:?} {:.0}% (completed {:?}, current step {})",
                record.lesson_id,
                record.status,
                record.progress_percentage,
                record.last_position.completed_steps,
                record.last_position.current_step
            );
        }
        out.trim_end().to_string()
    }
}

/// Show all saved progress records.
pub fn progress_show(storage: &Storage) -> Result<ProgressList> {
    Ok(ProgressList {
        records: storage.progress_records()?,
    })
}

/// Result of `wp progress reset`.
#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub lesson_id: String,
}

impl Output for ResetResult {
    fn to_human(&self) -> String {
        format!("Reset progress for {}", self.lesson_id)
    }
}

/// Delete a lesson's saved progress.
///
/// Local session state is cleared only when the delete succeeds; a failed
/// reset leaves everything as it was.
pub fn progress_reset(storage: &mut Storage, lesson_ref: &str) -> Result<ResetResult> {
    let lessons = lessons_or_empty(storage);
    let index = find_lesson_index(&lessons, lesson_ref)?;
    let lesson_id = lessons[index].id.clone();

    let session = storage.load_session()?;
    let progress = storage.progress_store()?;
    let mut controller = Progression::new(progress, session);
    controller.reset(&lesson_id)?;
    let (progress, session) = controller.into_parts();
    progress.flush();
    storage.save_session(&session)?;

    Ok(ResetResult { lesson_id })
}

// === Helpers ===

fn no_active_lesson() -> Error {
    Error::InvalidInput("no active lesson: run `wp lesson select` first".to_string())
}

fn lessons_or_empty(storage: &Storage) -> Vec<Lesson> {
    match storage.lessons() {
        Ok(lessons) => lessons,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load lessons, continuing with none");
            Vec::new()
        }
    }
}

fn tasks_or_empty(storage: &Storage) -> Vec<Task> {
    match storage.tasks() {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load tasks, continuing with none");
            Vec::new()
        }
    }
}

/// Find a lesson by 0-based index or by id.
fn find_lesson_index(lessons: &[Lesson], reference: &str) -> Result<usize> {
    if let Ok(index) = reference.parse::<usize>() {
        if index < lessons.len() {
            return Ok(index);
        }
        return Err(Error::NotFound(format!("Lesson not found: {reference}")));
    }
    lessons
        .iter()
        .position(|lesson| lesson.id == reference)
        .ok_or_else(|| Error::NotFound(format!("Lesson not found: {reference}")))
}
