//! The progression controller: lesson selection, step navigation, and
//! restoration of saved position.
//!
//! The controller is single-writer by construction: one navigation event is
//! handled to completion before the next. Persistence is reached only
//! through the [`ProgressStore`] seam, and saves are fire-and-forget: a
//! failed save never rolls back local navigation, and a failed load falls
//! back to a fresh start instead of blocking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::space::StepSpace;
use crate::models::ProgressRecord;
use crate::{Error, Result};

/// Where the cursor points within the active lesson's step space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cursor {
    /// A content step
    Content { index: usize },
    /// The virtual tasks step appended after all content steps
    Tasks,
}

/// Persistence operations the controller needs.
///
/// `save` is fire-and-forget: implementations queue the write, keep writes
/// for one lesson in issue order, and log failures themselves. `reset` is
/// synchronous, because callers must know whether the delete actually happened.
pub trait ProgressStore {
    /// Load the saved record for a lesson, if any.
    fn load(&mut self, lesson_id: &str) -> Result<Option<ProgressRecord>>;

    /// Queue a save of the completed content steps and cursor. Status and
    /// percentage are derived from `content_steps` at call time.
    fn save(
        &mut self,
        lesson_id: &str,
        completed_steps: &BTreeSet<usize>,
        current_step: usize,
        content_steps: usize,
    );

    /// Delete the saved record for a lesson.
    fn reset(&mut self, lesson_id: &str) -> Result<()>;
}

/// Transient per-learner view state.
///
/// Deliberately separate from persisted progress records: this is the
/// optimistic local position for the current session, plus the explicit
/// marker recording which lesson has already been through restoration (so
/// re-selecting the same lesson never clobbers in-progress state).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The currently selected lesson
    pub active_lesson: Option<String>,

    /// Step index the learner is viewing
    #[serde(default)]
    pub current_step: usize,

    /// Content-step indices advanced past in this session (optimistic;
    /// mirrors what the store has been asked to persist)
    #[serde(default)]
    pub completed_steps: BTreeSet<usize>,

    /// The lesson that restoration has already run for
    pub initialized_lesson: Option<String>,
}

/// The stateful navigation core for one learner.
pub struct Progression<S> {
    store: S,
    session: SessionState,
    /// Step space of the active lesson; rebuilt on every selection
    space: StepSpace,
}

impl<S: ProgressStore> Progression<S> {
    /// Create a controller over a store, resuming the given session state.
    pub fn new(store: S, session: SessionState) -> Self {
        Self {
            store,
            session,
            space: StepSpace::new(0, false),
        }
    }

    /// The current session state.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Tear down into the store and final session state.
    pub fn into_parts(self) -> (S, SessionState) {
        (self.store, self.session)
    }

    /// Select a lesson, restoring the saved position.
    ///
    /// Restoration runs once per lesson per contiguous selection: when the
    /// requested lesson is the one already initialized, local in-progress
    /// state is kept as-is instead of being clobbered by a re-read.
    /// Switching to a different lesson replaces the marker, so coming back
    /// later restores from the store again.
    ///
    /// `initial_step` is an explicit override (a deep link); it takes
    /// precedence over restoration but only when it falls inside the step
    /// space.
    ///
    /// A load failure is not fatal: the lesson starts fresh.
    pub fn select_lesson(
        &mut self,
        lesson_id: &str,
        space: StepSpace,
        initial_step: Option<usize>,
    ) -> Result<()> {
        self.space = space;
        self.session.active_lesson = Some(lesson_id.to_string());

        if self.session.initialized_lesson.as_deref() == Some(lesson_id) {
            // Already initialized: keep local state. A deep link still
            // repositions the cursor.
            if let Some(step) = initial_step {
                if space.contains(step) {
                    self.session.current_step = step;
                }
            }
            return Ok(());
        }

        let record = match self.store.load(lesson_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(lesson = lesson_id, error = %e, "failed to load saved progress, starting fresh");
                None
            }
        };

        let content_steps = space.content_steps();
        let completed: BTreeSet<usize> = record
            .as_ref()
            .map(|r| {
                r.last_position
                    .completed_steps
                    .iter()
                    .copied()
                    .filter(|&i| i < content_steps)
                    .collect()
            })
            .unwrap_or_default();

        let restored = match record {
            None => 0,
            Some(_) => {
                if completed.len() >= content_steps {
                    // Content-complete: land on the tasks step when there
                    // is one, else start over from the top.
                    space.tasks_step().unwrap_or(0)
                } else {
                    // Lowest-indexed content step not yet completed. Not
                    // necessarily max(completed) + 1, since steps can be
                    // completed out of order via direct jumps.
                    (0..content_steps)
                        .find(|i| !completed.contains(i))
                        .unwrap_or(0)
                }
            }
        };

        let cursor = match initial_step {
            Some(step) if space.contains(step) => step,
            _ => restored,
        };

        tracing::debug!(
            lesson = lesson_id,
            cursor,
            completed = completed.len(),
            "restored lesson position"
        );

        self.session.current_step = cursor;
        self.session.completed_steps = completed;
        self.session.initialized_lesson = Some(lesson_id.to_string());
        Ok(())
    }

    /// Advance to the next step.
    ///
    /// Marks the step being *left* as completed (not the destination) and
    /// queues a persistence write. Valid only below the last step.
    pub fn next_step(&mut self) -> Result<Cursor> {
        let lesson_id = self.active_lesson()?.to_string();
        let total = self.space.total_steps();
        let current = self.session.current_step;

        if total == 0 || current >= total - 1 {
            return Err(Error::InvalidInput(
                "already at the last step of this lesson".to_string(),
            ));
        }

        self.session.completed_steps.insert(current);
        self.session.current_step = current + 1;

        self.store.save(
            &lesson_id,
            &self.session.completed_steps,
            self.session.current_step,
            self.space.content_steps(),
        );

        Ok(self.cursor())
    }

    /// Move back one step. Read-only navigation: completed steps are
    /// untouched and nothing is persisted.
    pub fn prev_step(&mut self) -> Result<Cursor> {
        self.active_lesson()?;
        if self.session.current_step == 0 {
            return Err(Error::InvalidInput(
                "already at the first step of this lesson".to_string(),
            ));
        }
        self.session.current_step -= 1;
        Ok(self.cursor())
    }

    /// Jump directly to a step (e.g. via a step indicator). Marks nothing
    /// completed and persists nothing.
    pub fn go_to_step(&mut self, index: usize) -> Result<Cursor> {
        self.active_lesson()?;
        if !self.space.contains(index) {
            return Err(Error::InvalidInput(format!(
                "step index {index} is out of range (0..{})",
                self.space.total_steps()
            )));
        }
        self.session.current_step = index;
        Ok(self.cursor())
    }

    /// Reset saved progress for a lesson.
    ///
    /// Local state and the restoration marker are cleared only after the
    /// store delete succeeds; a failed reset must not present a false
    /// fresh start while the store still holds the old record.
    pub fn reset(&mut self, lesson_id: &str) -> Result<()> {
        self.store.reset(lesson_id)?;

        if self.session.initialized_lesson.as_deref() == Some(lesson_id) {
            self.session.initialized_lesson = None;
        }
        if self.session.active_lesson.as_deref() == Some(lesson_id) {
            self.session.current_step = 0;
            self.session.completed_steps.clear();
        }
        Ok(())
    }

    /// The cursor position within the active lesson.
    pub fn cursor(&self) -> Cursor {
        if self.space.is_tasks(self.session.current_step) {
            Cursor::Tasks
        } else {
            Cursor::Content {
                index: self.session.current_step,
            }
        }
    }

    /// Whether every content step of the active lesson has been completed.
    ///
    /// The tasks step has no terminal state of its own; it is a durable
    /// landing page.
    pub fn is_content_complete(&self) -> bool {
        let content_steps = self.space.content_steps();
        content_steps > 0
            && (0..content_steps).all(|i| self.session.completed_steps.contains(&i))
    }

    /// The active lesson id, or an error directing the user to select one.
    pub fn active_lesson(&self) -> Result<&str> {
        self.session
            .active_lesson
            .as_deref()
            .ok_or_else(|| {
                Error::InvalidInput("no active lesson: run `wp lesson select` first".to_string())
            })
    }
}
