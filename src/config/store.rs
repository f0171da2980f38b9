use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the cc-switch data lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// SQLite provider catalog (the authority).
    /// TOML: `store.database_path`. Default: `~/.cc-switch/cc-switch.db`.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Mirror document read by the desktop companion app.
    /// TOML: `store.mirror_path`. Default: `~/.cc-switch/settings.json`.
    #[serde(default = "default_mirror_path")]
    pub mirror_path: PathBuf,

    /// Lock file shared by every process that may switch providers.
    /// TOML: `store.lock_path`. Default: `~/.cc-switch/provider-switch.lock`.
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    /// Create an empty catalog when the database file is missing.
    /// TOML: `store.create_if_missing`. Default: `false`.
    #[serde(default)]
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            mirror_path: default_mirror_path(),
            lock_path: default_lock_path(),
            create_if_missing: false,
        }
    }
}

impl StoreConfig {
    /// `mode=rw` refuses to create a missing catalog; `mode=rwc` creates it.
    pub fn database_url(&self) -> String {
        let mode = if self.create_if_missing { "rwc" } else { "rw" };
        format!("sqlite://{}?mode={mode}", self.database_path.display())
    }

    pub fn is_available(&self) -> bool {
        self.database_path.is_file()
    }
}

pub(super) fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn cc_switch_dir() -> PathBuf {
    home().join(".cc-switch")
}

fn default_database_path() -> PathBuf {
    cc_switch_dir().join("cc-switch.db")
}

fn default_mirror_path() -> PathBuf {
    cc_switch_dir().join("settings.json")
}

fn default_lock_path() -> PathBuf {
    cc_switch_dir().join("provider-switch.lock")
}
