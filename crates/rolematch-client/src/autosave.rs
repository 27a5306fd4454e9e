//! Debounced, single-flight autosave task.
//!
//! One task owns all writes to the store. Edits send `Schedule`, which
//! (re)arms a debounce timer; when it fires the task saves inline, so a
//! second save cannot start until the first has finished. Commands that
//! arrive during a save queue up in the channel and are handled afterwards.
//!
//! ```text
//!   EditorHandle            mpsc              Autosave task
//!   ┌──────────────┐  ───────────────▶  ┌──────────────────────────┐
//!   │ .edit()      │  Schedule          │ debounce timer (reset)   │
//!   │ .flush()     │  Flush + oneshot   │ begin_save → upsert →    │
//!   └──────────────┘  ◀───────────────  │ finish_save              │
//!                                       │ conflict → fetch, resync │
//!                                       └──────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use rolematch_backend::{DocumentStore, StoreError, StoreResult};
use rolematch_types::DocumentKey;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, warn};

use crate::editor::Editor;
use crate::handle::Shared;

/// Command sent from the handle to the autosave task.
pub(crate) enum SaveCommand {
    /// An edit landed; restart the debounce window.
    Schedule,
    /// Save now, skipping the debounce, and report the outcome.
    Flush {
        reply: oneshot::Sender<StoreResult<()>>,
    },
}

pub(crate) struct Autosave {
    shared: Arc<Shared>,
    store: Arc<dyn DocumentStore>,
    debounce: Duration,
}

impl Autosave {
    /// Spawn the task. It runs until every sender is dropped.
    pub(crate) fn spawn(
        shared: Arc<Shared>,
        store: Arc<dyn DocumentStore>,
        debounce: Duration,
    ) -> (mpsc::UnboundedSender<SaveCommand>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = Self {
            shared,
            store,
            debounce,
        };
        (tx, tokio::spawn(task.run(rx)))
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<SaveCommand>) {
        let timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(timer);
        let mut armed = false;

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(SaveCommand::Schedule) => {
                        timer.as_mut().reset(Instant::now() + self.debounce);
                        armed = true;
                    }
                    Some(SaveCommand::Flush { reply }) => {
                        armed = false;
                        let _ = reply.send(self.save_now().await);
                    }
                    None => break,
                },
                () = &mut timer, if armed => {
                    armed = false;
                    // Failures are recorded in the editor status.
                    let _ = self.save_now().await;
                }
            }
        }
        debug!("autosave shutting down: channel closed");
    }

    async fn save_now(&self) -> StoreResult<()> {
        let Some(write) = self.shared.update(Editor::begin_save) else {
            return Ok(());
        };
        let span = tracing::info_span!(
            "save.document",
            key = %write.key,
            base = ?write.expected_version,
        );
        let key = write.key.clone();
        let result = self.store.upsert(write).instrument(span).await;
        self.shared.update(|editor| editor.finish_save(&result));
        if result.as_ref().is_err_and(StoreError::is_conflict) {
            self.resync(&key).await;
        }
        result.map(|_| ())
    }

    /// Re-read the document after a conflicting save. Own-author change
    /// events are skipped, so this is the only path to a newer base written
    /// by the same user in another session.
    async fn resync(&self, key: &DocumentKey) {
        let span = tracing::info_span!("load.resync", key = %key);
        match self.store.fetch(key).instrument(span).await {
            Ok(stored) => {
                self.shared.update(|editor| editor.resync(stored));
            }
            Err(e) => warn!(key = %key, error = %e, "re-read after conflict failed"),
        }
    }
}
