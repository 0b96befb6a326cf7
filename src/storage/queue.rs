//! Ordered, coalescing write queue for progress saves.
//!
//! Saves are fire-and-forget from the controller's perspective, but must be
//! applied in issue order per lesson: an older save completing late must
//! never overwrite a newer one. The queue owns a worker thread draining
//! operations FIFO; consecutive saves for the same lesson coalesce down to
//! the newest record (last intended state wins). Switching lessons never
//! cancels queued writes for the previous lesson; they still complete,
//! against the correct lesson's record.
//!
//! Save failures are logged and never surface to navigation; deletes are
//! synchronous because a reset must know whether the record is really gone.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::models::ProgressRecord;
use crate::{Error, Result};

/// Destination for progress writes.
///
/// Implemented by the SQLite store; tests substitute recording or failing
/// sinks.
pub trait ProgressSink: Send + 'static {
    /// Insert or replace one lesson's record.
    fn put(&mut self, record: &ProgressRecord) -> Result<()>;

    /// Delete one lesson's record.
    fn delete(&mut self, lesson_id: &str) -> Result<()>;
}

enum Op {
    Put(ProgressRecord),
    Delete {
        lesson_id: String,
        ack: mpsc::SyncSender<Result<()>>,
    },
    Flush(mpsc::SyncSender<()>),
}

/// Handle to the writer thread. Dropping it drains and applies everything
/// still queued.
pub struct WriteQueue {
    tx: Option<mpsc::Sender<Op>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteQueue {
    /// Start a writer thread over the given sink.
    pub fn spawn(sink: Box<dyn ProgressSink>) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || run_worker(sink, &rx));
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queue a save. Fire-and-forget: failures are logged by the worker.
    pub fn put(&self, record: ProgressRecord) {
        if let Some(tx) = &self.tx {
            if tx.send(Op::Put(record)).is_err() {
                tracing::warn!("progress writer is gone, dropping save");
            }
        }
    }

    /// Delete a lesson's record, waiting for the outcome.
    ///
    /// The delete joins the queue behind any saves already issued for the
    /// lesson, so it is applied as the last intended state.
    pub fn delete(&self, lesson_id: &str) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::Other("progress writer is gone".to_string()))?;
        let (ack, outcome) = mpsc::sync_channel(1);
        tx.send(Op::Delete {
            lesson_id: lesson_id.to_string(),
            ack,
        })
        .map_err(|_| Error::Other("progress writer is gone".to_string()))?;
        outcome
            .recv()
            .map_err(|_| Error::Other("progress writer exited before acknowledging".to_string()))?
    }

    /// Block until every write queued so far has been applied.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack, done) = mpsc::sync_channel(1);
        if tx.send(Op::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is left and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(mut sink: Box<dyn ProgressSink>, rx: &mpsc::Receiver<Op>) {
    while let Ok(op) = rx.recv() {
        match op {
            Op::Put(record) => {
                // Greedily drain queued saves, keeping only the newest per
                // lesson. Deletes and flushes act as barriers.
                let mut batch: Vec<ProgressRecord> = vec![record];
                let mut barrier = None;
                while let Ok(next) = rx.try_recv() {
                    match next {
                        Op::Put(newer) => {
                            batch.retain(|queued| queued.lesson_id != newer.lesson_id);
                            batch.push(newer);
                        }
                        other => {
                            barrier = Some(other);
                            break;
                        }
                    }
                }
                for record in &batch {
                    apply_put(sink.as_mut(), record);
                }
                if let Some(op) = barrier {
                    apply_barrier(sink.as_mut(), op);
                }
            }
            other => apply_barrier(sink.as_mut(), other),
        }
    }
}

fn apply_put(sink: &mut dyn ProgressSink, record: &ProgressRecord) {
    if let Err(e) = sink.put(record) {
        // Local state stays the source of truth until the next save lands.
        tracing::warn!(lesson = %record.lesson_id, error = %e, "failed to save progress");
    }
}

fn apply_barrier(sink: &mut dyn ProgressSink, op: Op) {
    match op {
        Op::Put(_) => unreachable!("puts are batched before barriers"),
        Op::Delete { lesson_id, ack } => {
            let _ = ack.send(sink.delete(&lesson_id));
        }
        Op::Flush(ack) => {
            let _ = ack.send(());
        }
    }
}
