//! Editor handle: the async, shareable face of an open document.
//!
//! [`EditorHandle::open`] subscribes to the store's change feed, loads the
//! document, and spawns the autosave task and the remote listener. Edits go
//! through the handle, which applies them to the [`Editor`] synchronously and
//! then pokes the autosave task.
//!
//! ```text
//!                 ┌────────────── Arc<Shared> ──────────────┐
//!                 │  Mutex<Editor>   watch<SaveStatus>      │
//!                 └──────▲──────────────▲──────────────▲────┘
//!   EditorHandle ────────┘              │              │
//!     .edit() ── Schedule ──▶ Autosave task ── upsert ──▶ DocumentStore
//!                                       │                       │
//!                              Remote listener ◀── ChangeFeed ──┘
//! ```

use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use rolematch_backend::{DocumentStore, StoreError};
use rolematch_types::{
    BulkAddReport, ColorTag, Edit, EditError, EditOutcome, GroupId, Principal, Progress, RoleId,
    Roster, StakeholderId,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug};

use crate::autosave::{Autosave, SaveCommand};
use crate::config::ClientConfig;
use crate::constants::DELETE_GROUP_PROMPT;
use crate::editor::{Editor, SaveStamp, SaveStatus};
use crate::export::{ExportFile, ExportFormat, export_file};
use crate::remote;

/// Errors from editor handle operations.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("save failed: {0}")]
    Save(#[from] StoreError),

    #[error("editor shut down")]
    Shutdown,
}

/// Asks the user to confirm a destructive edit.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Editor state shared between the handle and its tasks.
pub(crate) struct Shared {
    editor: Mutex<Editor>,
    status_tx: watch::Sender<SaveStatus>,
}

impl Shared {
    /// Mutate the editor, then publish its status if it changed.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let (result, status) = {
            let mut editor = self.editor.lock();
            let result = f(&mut *editor);
            (result, editor.status())
        };
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
        result
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Editor) -> R) -> R {
        f(&*self.editor.lock())
    }
}

/// An open document with autosave and live updates.
///
/// Dropping the handle stops both background tasks. Call
/// [`shutdown`](Self::shutdown) to write pending edits first.
pub struct EditorHandle {
    shared: Arc<Shared>,
    save_tx: mpsc::UnboundedSender<SaveCommand>,
    status_rx: watch::Receiver<SaveStatus>,
    autosave: JoinHandle<()>,
    remote: JoinHandle<()>,
}

impl EditorHandle {
    /// Open the configured document as `user`.
    ///
    /// Never fails: an unreachable store leaves the editor on defaults.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        user: Principal,
        config: &ClientConfig,
    ) -> Self {
        let key = config.document_key();
        let editor = Editor::new(key.clone(), user)
            .with_notice_ttl(config.notice_ttl())
            .with_policy(config.conflict_policy);
        let (status_tx, status_rx) = watch::channel(editor.status());
        let shared = Arc::new(Shared {
            editor: Mutex::new(editor),
            status_tx,
        });

        // Subscribe before fetching so no write slips between the two.
        let sub = store.subscribe(&key);
        let result = store
            .fetch(&key)
            .instrument(tracing::info_span!("load.document", key = %key))
            .await;
        shared.update(|editor| editor.finish_load(result));

        let remote = remote::spawn(shared.clone(), sub);
        let (save_tx, autosave) = Autosave::spawn(shared.clone(), store, config.save_debounce());

        Self {
            shared,
            save_tx,
            status_rx,
            autosave,
            remote,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn status(&self) -> SaveStatus {
        *self.status_rx.borrow()
    }

    /// Watch status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status_rx.clone()
    }

    /// Copy of the current roster.
    pub fn snapshot(&self) -> Roster {
        self.shared.read(|editor| editor.roster().clone())
    }

    pub fn progress(&self) -> Progress {
        self.shared.read(Editor::progress)
    }

    pub fn notice(&self) -> Option<String> {
        self.shared.read(|editor| editor.notice().map(str::to_string))
    }

    pub fn base_version(&self) -> u64 {
        self.shared.read(Editor::base_version)
    }

    pub fn last_saved(&self) -> Option<SaveStamp> {
        self.shared.read(|editor| editor.last_saved().cloned())
    }

    /// "you" or the email of whoever wrote last.
    pub fn saved_by(&self) -> Option<String> {
        self.shared.read(|editor| editor.saved_by_label().map(str::to_string))
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Apply an edit locally and schedule a save.
    pub fn edit(&self, edit: Edit) -> Result<EditOutcome, EditError> {
        let outcome = self.shared.update(|editor| editor.apply(&edit))?;
        if self.save_tx.send(SaveCommand::Schedule).is_err() {
            debug!("autosave task gone, edit will not be saved");
        }
        Ok(outcome)
    }

    pub fn rename_group(&self, group: GroupId, name: impl Into<String>) -> Result<(), EditError> {
        self.edit(Edit::RenameGroup {
            group,
            name: name.into(),
        })
        .map(drop)
    }

    pub fn set_group_subtitle(
        &self,
        group: GroupId,
        subtitle: impl Into<String>,
    ) -> Result<(), EditError> {
        self.edit(Edit::SetGroupSubtitle {
            group,
            subtitle: subtitle.into(),
        })
        .map(drop)
    }

    pub fn set_group_color(&self, group: GroupId, color: ColorTag) -> Result<(), EditError> {
        self.edit(Edit::SetGroupColor { group, color }).map(drop)
    }

    pub fn rename_role(
        &self,
        group: GroupId,
        role: RoleId,
        title: impl Into<String>,
    ) -> Result<(), EditError> {
        self.edit(Edit::RenameRole {
            group,
            role,
            title: title.into(),
        })
        .map(drop)
    }

    pub fn assign_role(
        &self,
        group: GroupId,
        role: RoleId,
        stakeholder: Option<StakeholderId>,
    ) -> Result<(), EditError> {
        self.edit(Edit::AssignRole {
            group,
            role,
            stakeholder,
        })
        .map(drop)
    }

    pub fn assign_extra_role(
        &self,
        role: RoleId,
        stakeholder: Option<StakeholderId>,
    ) -> Result<(), EditError> {
        self.edit(Edit::AssignExtraRole { role, stakeholder }).map(drop)
    }

    /// Append a templated group and return its id.
    pub fn add_group(&self) -> Result<GroupId, EditError> {
        match self.edit(Edit::AddGroup)? {
            EditOutcome::GroupAdded(id) => Ok(id),
            other => unreachable!("AddGroup produced {other:?}"),
        }
    }

    /// Delete a group if `confirm` agrees. Returns whether it was deleted.
    pub fn delete_group(&self, group: GroupId, confirm: &dyn Confirm) -> Result<bool, EditError> {
        if self.shared.read(|editor| editor.roster().group(group).is_none()) {
            return Err(EditError::UnknownGroup(group));
        }
        if !confirm.confirm(DELETE_GROUP_PROMPT) {
            debug!(?group, "group deletion declined");
            return Ok(false);
        }
        self.edit(Edit::DeleteGroup { group })?;
        Ok(true)
    }

    /// Add a stakeholder. A duplicate name is an error and raises a notice.
    pub fn add_stakeholder(&self, name: impl Into<String>) -> Result<StakeholderId, EditError> {
        match self.edit(Edit::AddStakeholder { name: name.into() })? {
            EditOutcome::StakeholderAdded(id) => Ok(id),
            other => unreachable!("AddStakeholder produced {other:?}"),
        }
    }

    /// Remove a stakeholder; returns how many assignments were cleared.
    pub fn remove_stakeholder(&self, stakeholder: StakeholderId) -> Result<usize, EditError> {
        match self.edit(Edit::RemoveStakeholder { stakeholder })? {
            EditOutcome::StakeholderRemoved { cleared } => Ok(cleared),
            other => unreachable!("RemoveStakeholder produced {other:?}"),
        }
    }

    pub fn bulk_add_stakeholders(&self, text: impl Into<String>) -> Result<BulkAddReport, EditError> {
        match self.edit(Edit::BulkAddStakeholders { text: text.into() })? {
            EditOutcome::BulkAdded(report) => Ok(report),
            other => unreachable!("BulkAddStakeholders produced {other:?}"),
        }
    }

    // ========================================================================
    // Save / export / lifecycle
    // ========================================================================

    /// Save pending edits now, bypassing the debounce.
    pub async fn flush(&self) -> Result<(), EditorError> {
        let (reply, rx) = oneshot::channel();
        self.save_tx
            .send(SaveCommand::Flush { reply })
            .map_err(|_| EditorError::Shutdown)?;
        rx.await.map_err(|_| EditorError::Shutdown)??;
        Ok(())
    }

    /// Render the current roster for download.
    pub fn export(&self, format: ExportFormat) -> ExportFile {
        self.shared
            .read(|editor| export_file(editor.roster(), format, Local::now()))
    }

    /// Flush pending edits, then stop the background tasks.
    pub async fn shutdown(self) -> Result<(), EditorError> {
        self.flush().await
    }
}

impl Drop for EditorHandle {
    fn drop(&mut self) {
        self.autosave.abort();
        self.remote.abort();
    }
}
