//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Key of the shared document when none is configured.
pub const DEFAULT_DOCUMENT_KEY: &str = "main";

/// Quiet period after the last edit before the roster is written.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(800);

/// How long a transient notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_millis(3000);

/// Where login links land.
pub const DEFAULT_REDIRECT: &str = "http://localhost:5173";

/// Shown after a login link was requested successfully.
pub const LINK_SENT_MESSAGE: &str = "Check your email for the login link!";

/// Base filename of exports; the extension follows the format.
pub const EXPORT_BASENAME: &str = "phase1_role_assignments";

/// Directory name under the platform config and data dirs.
pub const APP_DIR: &str = "rolematch";

/// Config filename inside the config dir.
pub const CONFIG_FILE: &str = "config.ron";

/// Database filename inside the data dir.
pub const DATABASE_FILE: &str = "rolematch.db";

/// Auth state filename inside the data dir.
pub const AUTH_STATE_FILE: &str = "auth.json";

/// Confirmation prompt before a group is deleted.
pub const DELETE_GROUP_PROMPT: &str = "Delete this trio? This cannot be undone.";
