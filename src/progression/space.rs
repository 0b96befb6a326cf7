//! The navigable step index space for a lesson.

/// The step index space for one lesson.
///
/// Two regions: indices `0..content_steps` address content steps and, when
/// the lesson has linked tasks, index `content_steps` addresses a single
/// virtual tasks step appended after the last content step. There is no
/// index beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpace {
    content_steps: usize,
    tasks_step: Option<usize>,
}

impl StepSpace {
    /// Build the step space from the content step count and whether the
    /// lesson has any linked tasks.
    pub fn new(content_steps: usize, has_linked_tasks: bool) -> Self {
        Self {
            content_steps,
            tasks_step: has_linked_tasks.then_some(content_steps),
        }
    }

    /// Number of content steps.
    pub fn content_steps(&self) -> usize {
        self.content_steps
    }

    /// Index of the virtual tasks step, if the lesson has one.
    pub fn tasks_step(&self) -> Option<usize> {
        self.tasks_step
    }

    /// Total number of navigable steps.
    pub fn total_steps(&self) -> usize {
        self.content_steps + usize::from(self.tasks_step.is_some())
    }

    /// Whether `index` addresses a step in this space.
    pub fn contains(&self, index: usize) -> bool {
        index < self.total_steps()
    }

    /// Whether `index` addresses a content step.
    pub fn is_content(&self, index: usize) -> bool {
        index < self.content_steps
    }

    /// Whether `index` addresses the virtual tasks step.
    pub fn is_tasks(&self, index: usize) -> bool {
        self.tasks_step == Some(index)
    }
}
