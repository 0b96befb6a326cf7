//! The curriculum progression engine.
//!
//! Everything here is deliberately free of I/O except the controller's
//! calls through the [`ProgressStore`] seam:
//!
//! - [`linkage`] resolves which tasks belong to a lesson and the XP earned
//! - [`access`] decides which lessons are unlocked (XP gates cascade)
//! - [`space`] defines the navigable step index space for a lesson
//! - [`controller`] is the stateful navigation core tying them together

pub mod access;
pub mod controller;
pub mod linkage;
pub mod space;

pub use access::{blocking_lesson, is_accessible, Blocker};
pub use controller::{Cursor, Progression, ProgressStore, SessionState};
pub use linkage::{resolve, TaskLinkage};
pub use space::StepSpace;
