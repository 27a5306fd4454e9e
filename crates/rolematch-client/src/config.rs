//! Client configuration, loaded from `~/.config/rolematch/config.ron`.
//!
//! Every field is optional in the file; anything missing takes the value
//! from [`crate::constants`].
//!
//! ```ron
//! (
//!     document_key: "main",
//!     save_debounce_ms: 800,
//!     conflict_policy: LastWriterWins,
//!     database: Some("/srv/rolematch/rolematch.db"),
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rolematch_types::DocumentKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    APP_DIR, AUTH_STATE_FILE, CONFIG_FILE, DATABASE_FILE, DEFAULT_DOCUMENT_KEY, DEFAULT_REDIRECT,
    NOTICE_TTL, SAVE_DEBOUNCE,
};

/// How the store treats a write based on an outdated version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Reject the write with a version conflict.
    #[default]
    Checked,
    /// Overwrite whatever is stored.
    LastWriterWins,
}

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("no {0} directory available on this platform")]
    NoPlatformDir(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub document_key: String,
    pub save_debounce_ms: u64,
    pub notice_ttl_ms: u64,
    pub redirect_to: String,
    pub conflict_policy: ConflictPolicy,
    /// SQLite file. `None` uses the platform data dir.
    pub database: Option<PathBuf>,
    /// Auth state file. `None` uses the platform data dir.
    pub auth_state: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            document_key: DEFAULT_DOCUMENT_KEY.to_string(),
            save_debounce_ms: SAVE_DEBOUNCE.as_millis() as u64,
            notice_ttl_ms: NOTICE_TTL.as_millis() as u64,
            redirect_to: DEFAULT_REDIRECT.to_string(),
            conflict_policy: ConflictPolicy::default(),
            database: None,
            auth_state: None,
        }
    }
}

/// Default config file path (`~/.config/rolematch/config.ron`).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

fn data_file(name: &str) -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR).join(name))
        .ok_or(ConfigError::NoPlatformDir("data"))
}

impl ClientConfig {
    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults. A file that exists but does not parse
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match config_file_path() {
                Some(p) => p,
                None => {
                    tracing::debug!("no config directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let config = Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::new(self.document_key.clone())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(p) => Ok(p.clone()),
            None => data_file(DATABASE_FILE),
        }
    }

    pub fn auth_state_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.auth_state {
            Some(p) => Ok(p.clone()),
            None => data_file(AUTH_STATE_FILE),
        }
    }
}
