//! Debounced autosave.
//!
//! A single writer task owns the pending record. Every `schedule` pushes the
//! deadline to now + quiet period; the record is written only once the
//! deadline passes without a newer schedule. Clearing goes through the same
//! task, so a delete never overtakes a write already in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::store::{PersistedRecord, PersistenceStore};
use crate::error::StoreError;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(10);

enum Command {
    Schedule(PersistedRecord),
    Clear(oneshot::Sender<Result<(), StoreError>>),
    Flush(oneshot::Sender<()>),
}

pub struct AutoSaver {
    store: Arc<dyn PersistenceStore>,
    tx: mpsc::UnboundedSender<Command>,
    saved: watch::Receiver<Option<DateTime<Utc>>>,
    task: JoinHandle<()>,
}

impl AutoSaver {
    pub fn start(store: Arc<dyn PersistenceStore>, quiet_period: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (saved_tx, saved) = watch::channel(None);
        let task = tokio::spawn(run_writer(store.clone(), quiet_period, rx, saved_tx));
        Self {
            store,
            tx,
            saved,
            task,
        }
    }

    /// Replace the pending record and restart the quiet period.
    pub fn schedule(&self, record: PersistedRecord) {
        let _ = self.tx.send(Command::Schedule(record));
    }

    /// Drop the pending record and delete the persisted one. Resolves after
    /// any write the task had already started.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Clear(ack)).is_ok() {
            if let Ok(result) = done.await {
                return result;
            }
        }
        self.store.delete().await
    }

    /// Write the pending record now and wait for the write.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Time of the most recent successful write.
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        *self.saved.borrow()
    }

    /// Flush the pending record and stop the writer task.
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            tracing::warn!(target: "castforge.autosave", error = %e, "autosave task ended abnormally");
        }
    }
}

async fn run_writer(
    store: Arc<dyn PersistenceStore>,
    quiet_period: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    saved: watch::Sender<Option<DateTime<Utc>>>,
) {
    let mut pending: Option<PersistedRecord> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Schedule(record)) => {
                    pending = Some(record);
                    deadline = Some(Instant::now() + quiet_period);
                    tracing::trace!(target: "castforge.autosave", stage = "autosave.scheduled");
                }
                Some(Command::Clear(ack)) => {
                    deadline = None;
                    if pending.take().is_some() {
                        tracing::debug!(target: "castforge.autosave", stage = "autosave.cancelled");
                    }
                    let _ = ack.send(store.delete().await);
                }
                Some(Command::Flush(ack)) => {
                    deadline = None;
                    if let Some(record) = pending.take() {
                        write(store.as_ref(), record, &saved).await;
                    }
                    let _ = ack.send(());
                }
                None => {
                    if let Some(record) = pending.take() {
                        write(store.as_ref(), record, &saved).await;
                    }
                    break;
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(record) = pending.take() {
                    write(store.as_ref(), record, &saved).await;
                }
            }
        }
    }
}

async fn write(
    store: &dyn PersistenceStore,
    record: PersistedRecord,
    saved: &watch::Sender<Option<DateTime<Utc>>>,
) {
    let now = Utc::now();
    let record = record.stamped(now);
    match store.save(&record).await {
        Ok(()) => {
            tracing::info!(
                target: "castforge.autosave",
                stage = "autosave.written",
                research_chars = record.research_text.len(),
                script_chars = record.script_text.len(),
                keywords = record.keywords.len()
            );
            let _ = saved.send(Some(now));
        }
        Err(e) => {
            tracing::error!(
                target: "castforge.autosave",
                stage = "autosave.failed",
                error = %e
            );
        }
    }
}
