//! Storage layer for Waypoint data.
//!
//! Each project gets its own SQLite database under the data root:
//!
//! - **Data root**: `~/.local/share/waypoint/` (or `WP_DATA_DIR`)
//! - **Project dir**: `<data root>/<sha256(project id)[..12]>/course.db`
//! - **Registry**: `<data root>/projects.json`, most recently imported last
//!
//! The database holds the course content (lessons, tasks, linkage), the
//! per-lesson progress records, and the single-row session state. Progress
//! writes flow through [`progress::ProgressDb`] and its write queue; the
//! rest of the tables are plain synchronous CRUD.

pub mod progress;
pub mod queue;

pub use progress::ProgressDb;
pub use queue::{ProgressSink, WriteQueue};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::content::LessonContent;
use crate::models::{ApprovalStatus, Course, Lesson, ProgressRecord, Task};
use crate::progression::SessionState;
use crate::{Error, Result};

/// The data root: `WP_DATA_DIR` if set, else the platform data directory.
pub fn data_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("WP_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(base.join("waypoint"))
}

/// The storage directory for one project under a data root.
///
/// Project ids are opaque strings, so the directory name is a hash rather
/// than the id itself.
pub fn project_dir(data_root: &Path, project: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(project.as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    data_root.join(&hash_hex[..12])
}

/// One entry in the project registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    pub imported_at: String,
}

fn registry_path(data_root: &Path) -> PathBuf {
    data_root.join("projects.json")
}

/// List known projects, oldest import first.
pub fn list_projects(data_root: &Path) -> Result<Vec<ProjectEntry>> {
    let path = registry_path(data_root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&json)?)
}

/// The project the CLI should target when none is named: the most recently
/// imported one.
pub fn default_project(data_root: &Path) -> Result<Option<String>> {
    Ok(list_projects(data_root)?.pop().map(|entry| entry.id))
}

/// Record a project in the registry, moving it to the most-recent slot.
fn register_project(data_root: &Path, project: &str) -> Result<()> {
    let mut entries = list_projects(data_root)?;
    entries.retain(|entry| entry.id != project);
    entries.push(ProjectEntry {
        id: project.to_string(),
        imported_at: Utc::now().to_rfc3339(),
    });
    fs::create_dir_all(data_root)?;
    fs::write(
        registry_path(data_root),
        serde_json::to_string_pretty(&entries)?,
    )?;
    Ok(())
}

/// Storage manager for a single project.
pub struct Storage {
    /// Root directory for this project's data
    pub root: PathBuf,
    project: String,
    conn: Connection,
}

impl Storage {
    /// Open existing storage for the given project.
    pub fn open(project: &str) -> Result<Self> {
        Self::open_at(&data_root()?, project)
    }

    /// Open existing storage for a project under an explicit data root.
    pub fn open_at(data_root: &Path, project: &str) -> Result<Self> {
        let root = project_dir(data_root, project);
        if !root.exists() {
            return Err(Error::NotInitialized);
        }
        let conn = open_db(&root.join("course.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            root,
            project: project.to_string(),
            conn,
        })
    }

    /// Initialize storage for a project, creating it if needed.
    pub fn init(project: &str) -> Result<Self> {
        Self::init_at(&data_root()?, project)
    }

    /// Initialize storage for a project under an explicit data root.
    pub fn init_at(data_root: &Path, project: &str) -> Result<Self> {
        let root = project_dir(data_root, project);
        fs::create_dir_all(&root)?;
        let conn = open_db(&root.join("course.db"))?;
        Self::init_schema(&conn)?;
        register_project(data_root, project)?;
        Ok(Self {
            root,
            project: project.to_string(),
            conn,
        })
    }

    /// Check whether storage exists for the given project.
    pub fn exists_at(data_root: &Path, project: &str) -> bool {
        project_dir(data_root, project).join("course.db").exists()
    }

    /// The project id this storage belongs to.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Path to the project database file.
    pub fn db_path(&self) -> PathBuf {
        self.root.join("course.db")
    }

    /// Open the queued progress store over this project's database.
    pub fn progress_store(&self) -> Result<ProgressDb> {
        ProgressDb::open(&self.db_path())
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS lessons (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT,
                xp_threshold INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_lessons_position ON lessons(position);

            CREATE TABLE IF NOT EXISTS lesson_tasks (
                lesson_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                PRIMARY KEY (lesson_id, task_id),
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_lesson_tasks_task ON lesson_tasks(task_id);

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                pillar TEXT,
                xp_value INTEGER NOT NULL DEFAULT 0,
                approval_status TEXT NOT NULL DEFAULT 'pending',
                is_required INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(approval_status);

            CREATE TABLE IF NOT EXISTS progress (
                lesson_id TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'not_started',
                progress_percentage REAL NOT NULL DEFAULT 0,
                completed_steps TEXT NOT NULL DEFAULT '[]',
                current_step INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                state TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Self::run_migrations(conn)?;
        Ok(())
    }

    /// Run database migrations for schema changes.
    /// This handles adding new columns to existing databases.
    fn run_migrations(conn: &Connection) -> Result<()> {
        // Migration: tasks gained a pillar column after the first release.
        // SQLite has no IF NOT EXISTS for ALTER TABLE, so check the schema.
        let has_pillar: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM pragma_table_info('tasks') WHERE name = 'pillar'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !has_pillar {
            conn.execute("ALTER TABLE tasks ADD COLUMN pillar TEXT", [])?;
        }

        Ok(())
    }

    // === Course Operations ===

    /// Replace the stored course content with an imported document.
    ///
    /// Lessons, tasks, and linkage are replaced wholesale in one
    /// transaction; progress records and session state are preserved.
    pub fn replace_course(&mut self, course: &Course) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM lesson_tasks", [])?;
        tx.execute("DELETE FROM lessons", [])?;
        tx.execute("DELETE FROM tasks", [])?;

        for (position, lesson) in course.lessons.iter().enumerate() {
            let content = lesson
                .content
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            tx.execute(
                "INSERT INTO lessons (id, position, title, description, content, xp_threshold)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    lesson.id,
                    position as i64,
                    lesson.title,
                    lesson.description,
                    content,
                    lesson.xp_threshold,
                ],
            )?;
            for task_id in &lesson.linked_task_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO lesson_tasks (lesson_id, task_id) VALUES (?1, ?2)",
                    params![lesson.id, task_id],
                )?;
            }
        }

        for task in &course.tasks {
            let status = serde_json::to_string(&task.approval_status)?;
            tx.execute(
                "INSERT OR REPLACE INTO tasks
                 (id, title, pillar, xp_value, approval_status, is_required)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    task.id,
                    task.title,
                    task.pillar,
                    task.xp_value,
                    status.trim_matches('"'),
                    task.is_required,
                ],
            )?;
        }

        if let Some(title) = &course.title {
            set_meta(&tx, "course_title", title)?;
        }
        set_meta(&tx, "imported_at", &Utc::now().to_rfc3339())?;

        tx.commit()?;
        Ok(())
    }

    /// The stored course title, if the import document carried one.
    pub fn course_title(&self) -> Result<Option<String>> {
        get_meta(&self.conn, "course_title")
    }

    // === Lesson Operations ===

    /// Load the ordered lesson list.
    ///
    /// A lesson whose stored content no longer parses is returned with no
    /// content (its step sequence is empty) rather than failing the whole
    /// course.
    pub fn lessons(&self) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, content, xp_threshold
             FROM lessons ORDER BY position",
        )?;
        let rows: Vec<(String, String, Option<String>, Option<String>, u32)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut linked_stmt = self
            .conn
            .prepare("SELECT task_id FROM lesson_tasks WHERE lesson_id = ?1 ORDER BY rowid")?;

        let mut lessons = Vec::with_capacity(rows.len());
        for (id, title, description, content_json, xp_threshold) in rows {
            let content = content_json.and_then(|json| {
                match serde_json::from_str::<LessonContent>(&json) {
                    Ok(content) => Some(content),
                    Err(e) => {
                        tracing::warn!(lesson = %id, error = %e, "malformed lesson content, treating as empty");
                        None
                    }
                }
            });
            let linked_task_ids: Vec<String> = linked_stmt
                .query_map([&id], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;

            lessons.push(Lesson {
                id,
                title,
                description,
                content,
                xp_threshold,
                linked_task_ids,
            });
        }
        Ok(lessons)
    }

    // === Task Operations ===

    /// Load the full task list in import order.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, pillar, xp_value, approval_status, is_required
             FROM tasks ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, title, pillar, xp_value, status, is_required) = row?;
            let approval_status: ApprovalStatus = serde_json::from_str(&format!("\"{status}\""))
                .map_err(|_| Error::Other(format!("unknown approval status: {status}")))?;
            tasks.push(Task {
                id,
                title,
                pillar,
                xp_value,
                approval_status,
                is_required,
            });
        }
        Ok(tasks)
    }

    /// Get a task by id.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.tasks()?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(format!("Task not found: {id}")))
    }

    /// Update a task's approval status.
    pub fn set_task_approval(&mut self, id: &str, status: ApprovalStatus) -> Result<()> {
        let status_json = serde_json::to_string(&status)?;
        let rows = self.conn.execute(
            "UPDATE tasks SET approval_status = ?1 WHERE id = ?2",
            params![status_json.trim_matches('"'), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("Task not found: {id}")));
        }
        Ok(())
    }

    // === Progress Operations ===

    /// Load one lesson's saved progress record.
    pub fn load_progress(&self, lesson_id: &str) -> Result<Option<ProgressRecord>> {
        progress::load_progress(&self.conn, lesson_id)
    }

    /// List every saved progress record.
    pub fn progress_records(&self) -> Result<Vec<ProgressRecord>> {
        progress::list_progress(&self.conn)
    }

    // === Session Operations ===

    /// Load the session state, or a fresh default when absent or
    /// unreadable. Session state is transient view state; losing it only
    /// costs the in-flight cursor, never saved progress.
    pub fn load_session(&self) -> Result<SessionState> {
        let json: Option<String> = self
            .conn
            .query_row("SELECT state FROM session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            None => Ok(SessionState::default()),
            Some(json) => match serde_json::from_str(&json) {
                Ok(session) => Ok(session),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed session state, starting a fresh session");
                    Ok(SessionState::default())
                }
            },
        }
    }

    /// Persist the session state.
    pub fn save_session(&mut self, session: &SessionState) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, state) VALUES (1, ?1)",
            [serde_json::to_string(session)?],
        )?;
        Ok(())
    }
}

/// Open a database connection that tolerates the progress writer thread
/// sharing the file.
fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn sample_course() -> Course {
        let mut lesson_a = Lesson::new("les-a".to_string(), "Basics".to_string());
        lesson_a.xp_threshold = 100;
        lesson_a.linked_task_ids = vec!["tsk-1".to_string(), "tsk-2".to_string()];
        lesson_a.content = serde_json::from_str(
            r#"{"version":2,"steps":[{"id":"s1","order":0,"type":"text","html":"<p>hi</p>"}]}"#,
        )
        .ok();

        let lesson_b = Lesson::new("les-b".to_string(), "Advanced".to_string());

        let mut task = Task::new("tsk-1".to_string(), "Practice".to_string());
        task.xp_value = 100;
        task.is_required = true;

        Course {
            project: Some("proj".to_string()),
            title: Some("Test Course".to_string()),
            lessons: vec![lesson_a, lesson_b],
            tasks: vec![task],
        }
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let env = TestEnv::new();
        let err = Storage::open_at(env.data_root(), "ghost").unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_course_round_trip() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");
        storage.replace_course(&sample_course()).unwrap();

        let lessons = storage.lessons().unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].id, "les-a");
        assert_eq!(lessons[0].xp_threshold, 100);
        assert_eq!(lessons[0].linked_task_ids, vec!["tsk-1", "tsk-2"]);
        assert!(lessons[0].content.is_some());
        assert_eq!(lessons[1].id, "les-b");

        let tasks = storage.tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].xp_value, 100);

        assert_eq!(
            storage.course_title().unwrap().as_deref(),
            Some("Test Course")
        );
    }

    #[test]
    fn test_reimport_preserves_progress() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");
        storage.replace_course(&sample_course()).unwrap();

        let record = ProgressRecord::new("les-a".to_string(), vec![0], 1, 2);
        progress::put_progress(&storage.conn, &record).unwrap();

        storage.replace_course(&sample_course()).unwrap();
        assert!(storage.load_progress("les-a").unwrap().is_some());
    }

    #[test]
    fn test_malformed_content_degrades_to_empty() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");
        storage.replace_course(&sample_course()).unwrap();

        storage
            .conn
            .execute(
                "UPDATE lessons SET content = '{not json' WHERE id = 'les-a'",
                [],
            )
            .unwrap();

        let lessons = storage.lessons().unwrap();
        assert!(lessons[0].content.is_none());
        assert!(crate::content::parse(lessons[0].content.as_ref()).is_empty());
    }

    #[test]
    fn test_task_approval_update() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");
        storage.replace_course(&sample_course()).unwrap();

        storage
            .set_task_approval("tsk-1", ApprovalStatus::Approved)
            .unwrap();
        assert!(storage.get_task("tsk-1").unwrap().is_completed());

        let err = storage
            .set_task_approval("ghost", ApprovalStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_session_round_trip() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");

        let mut session = SessionState::default();
        session.active_lesson = Some("les-a".to_string());
        session.current_step = 3;
        session.completed_steps = [0, 1, 2].into_iter().collect();
        session.initialized_lesson = Some("les-a".to_string());

        storage.save_session(&session).unwrap();
        assert_eq!(storage.load_session().unwrap(), session);
    }

    #[test]
    fn test_malformed_session_starts_fresh() {
        let env = TestEnv::new();
        let mut storage = env.init_storage("proj");
        storage
            .conn
            .execute(
                "INSERT OR REPLACE INTO session (id, state) VALUES (1, '{broken')",
                [],
            )
            .unwrap();
        assert_eq!(storage.load_session().unwrap(), SessionState::default());
    }

    #[test]
    fn test_registry_tracks_most_recent_project() {
        let env = TestEnv::new();
        env.init_storage("first");
        env.init_storage("second");
        assert_eq!(
            default_project(env.data_root()).unwrap().as_deref(),
            Some("second")
        );

        // Re-initializing moves a project back to the most-recent slot.
        env.init_storage("first");
        assert_eq!(
            default_project(env.data_root()).unwrap().as_deref(),
            Some("first")
        );

        let ids: Vec<String> = list_projects(env.data_root())
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }
}
