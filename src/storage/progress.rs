//! Durable progress: the store adapter over the per-project database.
//!
//! Reads go straight to the database. Writes go through the ordered
//! [`WriteQueue`] so navigation never waits on persistence: `save` derives
//! `status` and `progress_percentage` from the content-step total at call
//! time, then hands the record to the writer thread. `reset` is synchronous
//! and joins the queue behind pending saves, so a failed delete is reported
//! and a successful one really is the last word.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::queue::{ProgressSink, WriteQueue};
use crate::models::{LastPosition, ProgressRecord, ProgressStatus};
use crate::progression::ProgressStore;
use crate::{Error, Result};

/// Load one lesson's saved record.
pub(crate) fn load_progress(
    conn: &Connection,
    lesson_id: &str,
) -> Result<Option<ProgressRecord>> {
    let row = conn
        .query_row(
            "SELECT lesson_id, status, progress_percentage, completed_steps, current_step, updated_at
             FROM progress WHERE lesson_id = ?1",
            [lesson_id],
            raw_row,
        )
        .optional()?;
    row.map(record_from_raw).transpose()
}

/// List every saved record, ordered by lesson id.
pub(crate) fn list_progress(conn: &Connection) -> Result<Vec<ProgressRecord>> {
    let mut stmt = conn.prepare(
        "SELECT lesson_id, status, progress_percentage, completed_steps, current_step, updated_at
         FROM progress ORDER BY lesson_id",
    )?;
    let rows: Vec<RawRow> = stmt
        .query_map([], raw_row)?
        .collect::<rusqlite::Result<_>>()?;
    rows.into_iter().map(record_from_raw).collect()
}

/// Insert or replace one lesson's record as a single row write.
pub(crate) fn put_progress(conn: &Connection, record: &ProgressRecord) -> Result<()> {
    let status = serde_json::to_string(&record.status)?;
    conn.execute(
        "INSERT OR REPLACE INTO progress
         (lesson_id, status, progress_percentage, completed_steps, current_step, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.lesson_id,
            status.trim_matches('"'),
            record.progress_percentage,
            serde_json::to_string(&record.last_position.completed_steps)?,
            record.last_position.current_step as i64,
            record.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Delete one lesson's record. Deleting an absent record is not an error.
pub(crate) fn delete_progress(conn: &Connection, lesson_id: &str) -> Result<()> {
    conn.execute("DELETE FROM progress WHERE lesson_id = ?1", [lesson_id])?;
    Ok(())
}

type RawRow = (String, String, f64, String, i64, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn record_from_raw(
    (lesson_id, status, progress_percentage, completed_json, current_step, updated_at): RawRow,
) -> Result<ProgressRecord> {
    let status: ProgressStatus = serde_json::from_str(&format!("\"{status}\""))
        .map_err(|_| Error::Other(format!("unknown progress status: {status}")))?;
    let completed_steps: Vec<usize> = serde_json::from_str(&completed_json)?;
    let updated_at = updated_at
        .parse::<DateTime<Utc>>()
        .map_err(|e| Error::Other(format!("invalid updated_at: {e}")))?;

    Ok(ProgressRecord {
        lesson_id,
        status,
        progress_percentage,
        last_position: LastPosition {
            completed_steps,
            current_step: current_step as usize,
        },
        updated_at,
    })
}

/// The progress store for one project: reads inline, writes queued.
pub struct ProgressDb {
    reader: Connection,
    queue: WriteQueue,
}

impl ProgressDb {
    /// Open the adapter over a project database.
    pub fn open(db_path: &Path) -> Result<Self> {
        let reader = open_conn(db_path.to_path_buf())?;
        let sink = SqliteSink::open(db_path.to_path_buf())?;
        Ok(Self {
            reader,
            queue: WriteQueue::spawn(Box::new(sink)),
        })
    }

    /// Block until every queued write has been applied.
    pub fn flush(&self) {
        self.queue.flush();
    }
}

impl ProgressStore for ProgressDb {
    fn load(&mut self, lesson_id: &str) -> Result<Option<ProgressRecord>> {
        load_progress(&self.reader, lesson_id)
    }

    fn save(
        &mut self,
        lesson_id: &str,
        completed_steps: &BTreeSet<usize>,
        current_step: usize,
        content_steps: usize,
    ) {
        let record = ProgressRecord::new(
            lesson_id.to_string(),
            completed_steps.iter().copied(),
            current_step,
            content_steps,
        );
        self.queue.put(record);
    }

    fn reset(&mut self, lesson_id: &str) -> Result<()> {
        self.queue.delete(lesson_id)
    }
}

/// Writer-side connection, owned by the queue's worker thread.
struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            conn: open_conn(path)?,
        })
    }
}

impl ProgressSink for SqliteSink {
    fn put(&mut self, record: &ProgressRecord) -> Result<()> {
        put_progress(&self.conn, record)
    }

    fn delete(&mut self, lesson_id: &str) -> Result<()> {
        delete_progress(&self.conn, lesson_id)
    }
}

/// Open a connection that tolerates the writer thread sharing the file.
fn open_conn(path: PathBuf) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn completed(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_save_flush_load_round_trip() {
        let env = TestEnv::new();
        let storage = env.init_storage("proj");
        let mut db = ProgressDb::open(&storage.db_path()).unwrap();

        db.save("les-1", &completed(&[0, 1]), 2, 4);
        db.flush();

        let record = db.load("les-1").unwrap().unwrap();
        assert_eq!(record.last_position.completed_steps, vec![0, 1]);
        assert_eq!(record.last_position.current_step, 2);
        assert_eq!(record.status, ProgressStatus::InProgress);
        assert_eq!(record.progress_percentage, 50.0);
    }

    #[test]
    fn test_save_derives_completed_status() {
        let env = TestEnv::new();
        let storage = env.init_storage("proj");
        let mut db = ProgressDb::open(&storage.db_path()).unwrap();

        // Index 3 is the virtual tasks step for a 3-content-step lesson; it
        // must not be persisted.
        db.save("les-1", &completed(&[0, 1, 2, 3]), 3, 3);
        db.flush();

        let record = db.load("les-1").unwrap().unwrap();
        assert_eq!(record.status, ProgressStatus::Completed);
        assert_eq!(record.last_position.completed_steps, vec![0, 1, 2]);
        assert_eq!(record.progress_percentage, 100.0);
    }

    #[test]
    fn test_load_absent_is_none() {
        let env = TestEnv::new();
        let storage = env.init_storage("proj");
        let mut db = ProgressDb::open(&storage.db_path()).unwrap();
        assert!(db.load("les-missing").unwrap().is_none());
    }

    #[test]
    fn test_reset_deletes_record() {
        let env = TestEnv::new();
        let storage = env.init_storage("proj");
        let mut db = ProgressDb::open(&storage.db_path()).unwrap();

        db.save("les-1", &completed(&[0]), 1, 3);
        db.reset("les-1").unwrap();

        assert!(db.load("les-1").unwrap().is_none());
    }

    #[test]
    fn test_newest_save_wins() {
        let env = TestEnv::new();
        let storage = env.init_storage("proj");
        let mut db = ProgressDb::open(&storage.db_path()).unwrap();

        db.save("les-1", &completed(&[0]), 1, 4);
        db.save("les-1", &completed(&[0, 1]), 2, 4);
        db.save("les-1", &completed(&[0, 1, 2]), 3, 4);
        db.flush();

        let record = db.load("les-1").unwrap().unwrap();
        assert_eq!(record.last_position.current_step, 3);
        assert_eq!(record.last_position.completed_steps, vec![0, 1, 2]);
    }
}
