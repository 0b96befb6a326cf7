//! Common test utilities for waypoint integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/waypoint/` directory or read their config.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `data_dir`: holds waypoint's data (via the `WP_DATA_DIR` env var)
/// - `work_dir`: scratch space for course documents and config
///
/// The `wp()` method returns a `Command` that sets the isolation env vars
/// per invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub work_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with the gated sample course imported.
    pub fn with_course() -> Self {
        let env = Self::new();
        env.import(GATED_COURSE);
        env
    }

    /// Get a Command for the wp binary with isolated data and config dirs.
    pub fn wp(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wp"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("WP_DATA_DIR", self.data_dir.path());
        // Keep the user's real config and env out of the picture.
        cmd.env("XDG_CONFIG_HOME", self.work_dir.path().join("config"));
        cmd.env_remove("WP_PROJECT");
        cmd.env_remove("WP_ADMIN");
        cmd
    }

    /// Write a course document into the work dir and import it.
    pub fn import(&self, json: &str) {
        let path = self.course_file(json);
        self.wp()
            .args(["course", "import"])
            .arg(&path)
            .assert()
            .success();
    }

    /// Write a course document into the work dir, returning its path.
    pub fn course_file(&self, json: &str) -> PathBuf {
        let path = self.work_dir.path().join("course.json");
        fs::write(&path, json).unwrap();
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A three-lesson course with XP gating:
///
/// - lesson 0 "Ownership": 3 text steps, one required 150 XP task, and a
///   100 XP threshold gating lesson 1
/// - lesson 1 "Borrowing": 2 text steps, ungated
/// - lesson 2 "Lifetimes": 1 text step, ungated (but behind the cascade)
pub const GATED_COURSE: &str = r#"{
    "project": "demo",
    "title": "Rust Basics",
    "lessons": [
        {
            "id": "les-0",
            "title": "Ownership",
            "xp_threshold": 100,
            "linked_task_ids": ["tsk-1"],
            "content": {"version": 2, "steps": [
                {"id": "s1", "order": 0, "type": "text", "html": "<p>moves</p>"},
                {"id": "s2", "order": 1, "type": "text", "html": "<p>copies</p>"},
                {"id": "s3", "order": 2, "type": "text", "html": "<p>drops</p>"}
            ]}
        },
        {
            "id": "les-1",
            "title": "Borrowing",
            "content": {"version": 2, "steps": [
                {"id": "s1", "order": 0, "type": "text", "html": "<p>refs</p>"},
                {"id": "s2", "order": 1, "type": "video", "video_url": "https://example.com/borrow"}
            ]}
        },
        {
            "id": "les-2",
            "title": "Lifetimes",
            "content": {"version": 2, "steps": [
                {"id": "s1", "order": 0, "type": "text", "html": "<p>ticks</p>"}
            ]}
        }
    ],
    "tasks": [
        {
            "id": "tsk-1",
            "title": "Implement a stack",
            "pillar": "collections",
            "xp_value": 150,
            "is_required": true
        }
    ]
}"#;
