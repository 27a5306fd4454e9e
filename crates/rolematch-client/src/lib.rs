//! Client side of rolematch: the editor, its autosave loop, sign-in, and
//! export.
//!
//! # Architecture
//!
//! ```text
//! SessionHolder ──SignedIn──▶ EditorHandle::open(store, principal, config)
//!                                  │
//!                 ┌────────────────┼──────────────────┐
//!                 ▼                ▼                  ▼
//!              Editor         Autosave task     Remote listener
//!         (pure state machine) (debounced upsert) (ChangeFeed events)
//! ```
//!
//! [`Editor`] holds the roster and save status and does no I/O. The
//! [`EditorHandle`] wraps it for async use and owns the background tasks.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`EditorHandle`] | Open document: edits, flush, export |
//! | [`Editor`] | Save status and roster state transitions |
//! | [`SessionHolder`] | Signed-in / signed-out gate |
//! | [`SignIn`] | Login link request and redemption |
//! | [`ClientConfig`] | RON config with document key and timings |

mod autosave;
pub mod config;
pub mod constants;
pub mod editor;
pub mod export;
pub mod handle;
mod remote;
pub mod session;
pub mod sign_in;

pub use config::{ClientConfig, ConfigError, ConflictPolicy};
pub use editor::{Editor, RemoteOutcome, SaveStamp, SaveStatus};
pub use export::{
    DirectorySink, ExportError, ExportFile, ExportFormat, ExportSink, export_file, render_csv,
    render_markdown,
};
pub use handle::{Confirm, EditorError, EditorHandle};
pub use session::{SessionGate, SessionHolder};
pub use sign_in::{SignIn, SignInMessage};
