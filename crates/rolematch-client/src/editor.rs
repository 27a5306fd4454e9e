//! Editor core: the load/merge/save state machine for one document.
//!
//! Synchronous and I/O free. The async pieces
//! ([`crate::autosave`], [`crate::remote`]) drive it from outside: they ask
//! it for a write, perform the store call, and hand the result back.
//!
//! # State Machine
//!
//! ```text
//!            finish_load (found, absent, or failed)
//!   Loading ──────────────────────────────────────▶ Saved
//!
//!   any edit ─────────────────────────────────────▶ Unsaved
//!
//!   Unsaved ── begin_save ──▶ Saving ── finish_save(Ok) ──▶ Saved
//!                                  │                    └─▶ Unsaved (edited meanwhile)
//!                                  └── finish_save(Err) ──▶ Error
//!
//!   Error (version conflict) ── resync(newer stored doc) ──▶ Saved
//!
//!   foreign change (newer version, other author) ─────────▶ Saved
//! ```
//!
//! Dirtiness is tracked with generations: every accepted edit bumps
//! `generation`; a save records which generation it carried. State is clean
//! when the last persisted (or adopted) generation equals the current one.

use std::time::Duration;

use rolematch_backend::{DocumentWrite, StoreError};
use rolematch_types::{
    Document, DocumentKey, Edit, EditError, EditOutcome, PoolError, Principal, Progress, Roster,
    default_roster,
};
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ConflictPolicy;
use crate::constants::NOTICE_TTL;

/// Local save status, as shown next to the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Loading,
    Saved,
    Unsaved,
    Saving,
    Error,
}

impl SaveStatus {
    /// Human label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Loading => "Loading...",
            SaveStatus::Saved => "Saved",
            SaveStatus::Unsaved => "Unsaved",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Error => "Save failed",
        }
    }
}

/// A short-lived message for the user (duplicate names and the like).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// When and by whom the stored document was last written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveStamp {
    /// Unix millis.
    pub at: u64,
    pub by: Principal,
}

/// What happened to a change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Written by this user; already reflected locally.
    OwnEcho,
    /// Not newer than the local base version.
    Stale,
    /// Local state replaced.
    Adopted,
}

/// Synchronous editor state for a single document.
#[derive(Debug)]
pub struct Editor {
    key: DocumentKey,
    user: Principal,
    roster: Roster,
    /// Version the local roster derives from. 0 = never stored.
    base_version: u64,
    status: SaveStatus,
    generation: u64,
    clean_generation: u64,
    in_flight: Option<u64>,
    last_saved: Option<SaveStamp>,
    notice: Option<Notice>,
    notice_ttl: Duration,
    policy: ConflictPolicy,
}

impl Editor {
    pub fn new(key: DocumentKey, user: Principal) -> Self {
        Self {
            key,
            user,
            roster: default_roster(),
            base_version: 0,
            status: SaveStatus::Loading,
            generation: 0,
            clean_generation: 0,
            in_flight: None,
            last_saved: None,
            notice: None,
            notice_ttl: NOTICE_TTL,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn user(&self) -> &Principal {
        &self.user
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    pub fn progress(&self) -> Progress {
        self.roster.progress()
    }

    pub fn last_saved(&self) -> Option<&SaveStamp> {
        self.last_saved.as_ref()
    }

    /// "you" if the last write was ours, else the writer's email.
    pub fn saved_by_label(&self) -> Option<&str> {
        self.last_saved.as_ref().map(|stamp| {
            if stamp.by.id == self.user.id {
                "you"
            } else {
                stamp.by.email.as_str()
            }
        })
    }

    /// True when local edits have not reached the store.
    pub fn is_dirty(&self) -> bool {
        self.generation != self.clean_generation
    }

    /// The current notice, unless it has expired.
    pub fn notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| Instant::now() < n.expires_at)
            .map(|n| n.message.as_str())
    }

    fn raise_notice(&mut self, message: String) {
        debug!(%message, "notice");
        self.notice = Some(Notice {
            message,
            expires_at: Instant::now() + self.notice_ttl,
        });
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Adopt the result of the initial fetch.
    ///
    /// An absent document or a failed fetch falls back to defaults; defaults
    /// are not written back until the first edit.
    pub fn finish_load(&mut self, result: Result<Option<Document>, StoreError>) {
        match result {
            Ok(Some(doc)) => {
                debug!(key = %self.key, version = doc.version, "loaded document");
                self.adopt(doc);
            }
            Ok(None) => {
                info!(key = %self.key, "no stored document, starting from defaults");
                self.roster = default_roster();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "load failed, starting from defaults");
                self.roster = default_roster();
            }
        }
        self.clean_generation = self.generation;
        self.status = SaveStatus::Saved;
    }

    fn adopt(&mut self, doc: Document) {
        self.base_version = doc.version;
        if let (Some(at), Some(by)) = (doc.updated_at, doc.updated_by) {
            self.last_saved = Some(SaveStamp { at, by });
        }
        self.roster = doc.roster.prune_dangling();
    }

    // ========================================================================
    // Edit
    // ========================================================================

    /// Apply an edit to local state.
    ///
    /// On success the status becomes `Unsaved` immediately and the caller
    /// should schedule a save. A duplicate stakeholder name is rejected with
    /// a notice and leaves state and status untouched.
    pub fn apply(&mut self, edit: &Edit) -> Result<EditOutcome, EditError> {
        match edit.apply(&self.roster) {
            Ok(applied) => {
                self.roster = applied.roster;
                self.generation += 1;
                self.status = SaveStatus::Unsaved;
                if let EditOutcome::BulkAdded(report) = &applied.outcome {
                    if report.duplicates > 0 {
                        self.raise_notice(format!(
                            "{} duplicate name(s) skipped",
                            report.duplicates
                        ));
                    }
                }
                debug!(op = edit.name(), generation = self.generation, "edit applied");
                Ok(applied.outcome)
            }
            Err(e) => {
                if let EditError::Pool(PoolError::Duplicate { .. }) = &e {
                    self.raise_notice(e.to_string());
                }
                debug!(op = edit.name(), error = %e, "edit rejected");
                Err(e)
            }
        }
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Start a save of the current roster, if there is anything to save.
    pub fn begin_save(&mut self) -> Option<DocumentWrite> {
        if !self.is_dirty() || self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(self.generation);
        self.status = SaveStatus::Saving;
        Some(DocumentWrite {
            key: self.key.clone(),
            roster: self.roster.clone(),
            author: self.user.clone(),
            expected_version: match self.policy {
                ConflictPolicy::Checked => Some(self.base_version),
                ConflictPolicy::LastWriterWins => None,
            },
        })
    }

    /// Record the outcome of the save started by [`begin_save`](Self::begin_save).
    pub fn finish_save(&mut self, result: &Result<Document, StoreError>) {
        let Some(saved_generation) = self.in_flight.take() else {
            return;
        };
        match result {
            Ok(doc) => {
                self.clean_generation = self.clean_generation.max(saved_generation);
                self.base_version = self.base_version.max(doc.version);
                if let (Some(at), Some(by)) = (doc.updated_at, doc.updated_by.clone()) {
                    self.last_saved = Some(SaveStamp { at, by });
                }
                self.status = if self.is_dirty() {
                    SaveStatus::Unsaved
                } else {
                    SaveStatus::Saved
                };
                debug!(key = %self.key, version = doc.version, status = %self.status, "save finished");
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "save failed");
                // A foreign update adopted during the save already made us clean.
                self.status = if self.is_dirty() {
                    SaveStatus::Error
                } else {
                    SaveStatus::Saved
                };
            }
        }
    }

    /// Adopt the stored document after a save was rejected as a version
    /// conflict.
    ///
    /// The writer may be this same user in another session, whose change
    /// event [`apply_remote`](Self::apply_remote) skips as an echo. Returns
    /// `false`, leaving state alone, when `stored` is missing or not newer
    /// than the base version.
    pub fn resync(&mut self, stored: Option<Document>) -> bool {
        let Some(doc) = stored.filter(|doc| doc.version > self.base_version) else {
            return false;
        };
        info!(
            key = %self.key,
            from = self.base_version,
            to = doc.version,
            "save conflicted, adopting stored document"
        );
        self.adopt(doc);
        self.clean_generation = self.generation;
        self.status = SaveStatus::Saved;
        true
    }

    // ========================================================================
    // Remote
    // ========================================================================

    /// Apply a change event from the store.
    ///
    /// Events from this user and events no newer than the base version are
    /// ignored. Anything else replaces local state wholesale, discarding
    /// unsaved edits.
    pub fn apply_remote(&mut self, doc: &Document) -> RemoteOutcome {
        if doc.updated_by.as_ref().is_some_and(|p| p.id == self.user.id) {
            return RemoteOutcome::OwnEcho;
        }
        if doc.version <= self.base_version {
            return RemoteOutcome::Stale;
        }

        if self.is_dirty() {
            info!(key = %self.key, version = doc.version, "foreign update replaces unsaved edits");
        }
        self.adopt(doc.clone());
        self.clean_generation = self.generation;
        self.status = SaveStatus::Saved;
        RemoteOutcome::Adopted
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rolematch_types::{GroupId, StakeholderId, now_millis};

    fn me() -> Principal {
        Principal::from_email("amy@example.org")
    }

    fn them() -> Principal {
        Principal::from_email("bo@example.org")
    }

    fn loaded() -> Editor {
        let mut editor = Editor::new(DocumentKey::main(), me());
        editor.finish_load(Ok(None));
        editor
    }

    fn stored(roster: Roster, version: u64, by: Principal) -> Document {
        Document {
            key: DocumentKey::main(),
            roster,
            version,
            updated_at: Some(now_millis()),
            updated_by: Some(by),
        }
    }

    fn rename_first(editor: &mut Editor, name: &str) {
        let group = editor.roster().groups[0].id;
        editor
            .apply(&Edit::RenameGroup {
                group,
                name: name.into(),
            })
            .unwrap();
    }

    #[test]
    fn test_new_editor_is_loading() {
        let editor = Editor::new(DocumentKey::main(), me());
        assert_eq!(editor.status(), SaveStatus::Loading);
        assert_eq!(editor.status().to_string(), "loading");
    }

    #[test]
    fn test_load_absent_uses_defaults_and_is_clean() {
        let editor = loaded();
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.roster(), &default_roster());
        assert!(!editor.is_dirty());
        assert_eq!(editor.base_version(), 0);
    }

    #[test]
    fn test_load_failure_falls_back_to_defaults() {
        let mut editor = Editor::new(DocumentKey::main(), me());
        editor.finish_load(Err(StoreError::unavailable("down")));
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.roster().groups.len(), 6);
    }

    #[test]
    fn test_load_existing_document() {
        let mut roster = default_roster();
        roster.groups.truncate(2);
        let mut editor = Editor::new(DocumentKey::main(), me());
        editor.finish_load(Ok(Some(stored(roster, 7, them()))));
        assert_eq!(editor.roster().groups.len(), 2);
        assert_eq!(editor.base_version(), 7);
        assert_eq!(editor.saved_by_label(), Some("bo@example.org"));
    }

    #[test]
    fn test_edit_marks_unsaved_synchronously() {
        let mut editor = loaded();
        rename_first(&mut editor, "Renamed");
        assert_eq!(editor.status(), SaveStatus::Unsaved);
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_rejected_edit_leaves_status() {
        let mut editor = loaded();
        let err = editor
            .apply(&Edit::DeleteGroup {
                group: GroupId::new(),
            })
            .unwrap_err();
        assert!(matches!(err, EditError::UnknownGroup(_)));
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.notice(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_add_raises_notice_without_state_change() {
        let mut editor = loaded();
        editor
            .apply(&Edit::AddStakeholder {
                name: "Alice".into(),
            })
            .unwrap();
        let write = editor.begin_save().expect("dirty after add");
        editor.finish_save(&Ok(stored(write.roster, 1, me())));
        assert_eq!(editor.status(), SaveStatus::Saved);

        let before = editor.roster().clone();
        let err = editor.apply(&Edit::AddStakeholder {
            name: "  ALICE ".into(),
        });
        assert!(err.is_err());
        assert_eq!(editor.roster(), &before);
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(
            editor.notice(),
            Some("\"ALICE\" is already in the stakeholder pool")
        );

        tokio::time::advance(NOTICE_TTL + Duration::from_millis(1)).await;
        assert_eq!(editor.notice(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_duplicates_notice() {
        let mut editor = loaded();
        editor
            .apply(&Edit::BulkAddStakeholders {
                text: "Alice, bob\nAlice".into(),
            })
            .unwrap();
        assert_eq!(editor.roster().stakeholders.names(), vec!["Alice", "bob"]);
        assert_eq!(editor.notice(), Some("1 duplicate name(s) skipped"));
        assert_eq!(editor.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn test_save_cycle() {
        let mut editor = loaded();
        assert!(editor.begin_save().is_none(), "nothing to save when clean");

        rename_first(&mut editor, "A");
        let write = editor.begin_save().expect("dirty");
        assert_eq!(editor.status(), SaveStatus::Saving);
        assert_eq!(write.expected_version, Some(0));
        assert_eq!(write.author, me());
        assert!(editor.begin_save().is_none(), "single flight");

        editor.finish_save(&Ok(stored(write.roster, 1, me())));
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.base_version(), 1);
        assert_eq!(editor.saved_by_label(), Some("you"));
    }

    #[test]
    fn test_edit_during_save_stays_unsaved() {
        let mut editor = loaded();
        rename_first(&mut editor, "A");
        let write = editor.begin_save().unwrap();
        rename_first(&mut editor, "B");
        assert_eq!(editor.status(), SaveStatus::Unsaved);

        editor.finish_save(&Ok(stored(write.roster, 1, me())));
        assert_eq!(editor.status(), SaveStatus::Unsaved);
        assert!(editor.is_dirty());

        let next = editor.begin_save().unwrap();
        assert_eq!(next.expected_version, Some(1));
        assert_eq!(next.roster.groups[0].name, "B");
    }

    #[test]
    fn test_save_failure_is_error_then_retry_on_edit() {
        let mut editor = loaded();
        rename_first(&mut editor, "A");
        editor.begin_save().unwrap();
        editor.finish_save(&Err(StoreError::unavailable("down")));
        assert_eq!(editor.status(), SaveStatus::Error);
        assert!(editor.is_dirty());

        rename_first(&mut editor, "B");
        assert_eq!(editor.status(), SaveStatus::Unsaved);
        assert!(editor.begin_save().is_some());
    }

    #[test]
    fn test_last_writer_wins_skips_version() {
        let mut editor =
            Editor::new(DocumentKey::main(), me()).with_policy(ConflictPolicy::LastWriterWins);
        editor.finish_load(Ok(None));
        rename_first(&mut editor, "A");
        assert_eq!(editor.begin_save().unwrap().expected_version, None);
    }

    #[test]
    fn test_own_echo_ignored() {
        let mut editor = loaded();
        rename_first(&mut editor, "Mine");
        let outcome = editor.apply_remote(&stored(default_roster(), 5, me()));
        assert_eq!(outcome, RemoteOutcome::OwnEcho);
        assert_eq!(editor.roster().groups[0].name, "Mine");
        assert_eq!(editor.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn test_foreign_update_replaces_state() {
        let mut editor = loaded();
        rename_first(&mut editor, "Mine");

        let mut theirs = default_roster();
        theirs.groups[0].name = "Theirs".into();
        let outcome = editor.apply_remote(&stored(theirs, 1, them()));

        assert_eq!(outcome, RemoteOutcome::Adopted);
        assert_eq!(editor.roster().groups[0].name, "Theirs");
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert!(!editor.is_dirty());
        assert_eq!(editor.base_version(), 1);
    }

    #[test]
    fn test_stale_foreign_update_ignored() {
        let mut editor = Editor::new(DocumentKey::main(), me());
        editor.finish_load(Ok(Some(stored(default_roster(), 4, them()))));

        let mut old = default_roster();
        old.groups.clear();
        assert_eq!(editor.apply_remote(&stored(old, 4, them())), RemoteOutcome::Stale);
        assert_eq!(editor.roster().groups.len(), 6);
    }

    #[test]
    fn test_foreign_update_during_save_then_conflict() {
        let mut editor = loaded();
        rename_first(&mut editor, "Mine");
        editor.begin_save().unwrap();

        editor.apply_remote(&stored(default_roster(), 1, them()));
        editor.finish_save(&Err(StoreError::VersionConflict {
            key: DocumentKey::main(),
            expected: 0,
            actual: 1,
        }));

        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.roster(), &default_roster());
        assert!(editor.begin_save().is_none());
    }

    #[test]
    fn test_conflict_from_own_other_session_resyncs() {
        let mut editor = loaded();
        rename_first(&mut editor, "Second tab");
        editor.begin_save().unwrap();

        // The first tab's write arrives as our own echo and is skipped.
        let mut first_tab = default_roster();
        first_tab.groups[0].name = "First tab".into();
        let winner = stored(first_tab, 1, me());
        assert_eq!(editor.apply_remote(&winner), RemoteOutcome::OwnEcho);
        editor.finish_save(&Err(StoreError::VersionConflict {
            key: DocumentKey::main(),
            expected: 0,
            actual: 1,
        }));
        assert_eq!(editor.status(), SaveStatus::Error);

        assert!(editor.resync(Some(winner)));
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.base_version(), 1);
        assert_eq!(editor.roster().groups[0].name, "First tab");
        assert!(editor.begin_save().is_none());

        rename_first(&mut editor, "Later");
        assert_eq!(editor.begin_save().unwrap().expected_version, Some(1));
    }

    #[test]
    fn test_resync_ignores_missing_or_stale_document() {
        let mut editor = Editor::new(DocumentKey::main(), me());
        editor.finish_load(Ok(Some(stored(default_roster(), 3, them()))));
        rename_first(&mut editor, "Mine");

        assert!(!editor.resync(None));
        assert!(!editor.resync(Some(stored(default_roster(), 3, them()))));
        assert_eq!(editor.roster().groups[0].name, "Mine");
        assert_eq!(editor.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn test_adopted_roster_drops_dangling_assignees() {
        let mut roster = default_roster();
        roster.groups[0].roles[0].assignee = Some(StakeholderId::new());
        let mut editor = loaded();
        editor.apply_remote(&stored(roster, 1, them()));
        assert_eq!(editor.progress().filled, 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(SaveStatus::Saving.label(), "Saving...");
        assert_eq!(SaveStatus::Error.label(), "Save failed");
    }
}
