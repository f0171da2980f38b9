use super::StoreConfig;
use super::store::home;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

/// Switch coordinator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchConfig {
    /// Store C repair attempts after a failed mirror write.
    /// TOML: `switch.repair_max_attempts`. Default: `3`.
    #[serde(default = "default_repair_max_attempts")]
    pub repair_max_attempts: usize,

    /// Delay before and between repair attempts, in milliseconds.
    /// TOML: `switch.repair_delay_ms`. Default: `1000`.
    #[serde(default = "default_repair_delay_ms")]
    pub repair_delay_ms: u64,

    /// Upper bound on waiting for the switch lock. Unset waits forever.
    /// TOML: `switch.lock_timeout_ms`. Default: unset.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,

    /// Per-app_type active config targets. Only app types listed here can be switched.
    /// TOML: `[switch.apps.<app_type>]`. Default: `claude` only.
    #[serde(default = "default_apps")]
    pub apps: BTreeMap<String, AppTypeConfig>,
}

/// One app_type's active config file (Store A) and how to read it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppTypeConfig {
    pub settings_path: PathBuf,

    /// JSON pointer to the endpoint inside `settings_config`.
    #[serde(default = "default_endpoint_pointer")]
    pub endpoint_pointer: String,

    /// Key in the mirror document. Defaults to `currentProvider<AppType>`.
    #[serde(default)]
    pub mirror_key: Option<String>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            repair_max_attempts: default_repair_max_attempts(),
            repair_delay_ms: default_repair_delay_ms(),
            lock_timeout_ms: None,
            apps: default_apps(),
        }
    }
}

impl SwitchConfig {
    pub fn resolve(&self, store: &StoreConfig) -> SwitchResolvedConfig {
        let apps = self
            .apps
            .iter()
            .map(|(app_type, cfg)| {
                let target = AppTarget {
                    settings_path: cfg.settings_path.clone(),
                    endpoint_pointer: cfg.endpoint_pointer.clone(),
                    mirror_key: cfg
                        .mirror_key
                        .clone()
                        .unwrap_or_else(|| mirror_key_for(app_type)),
                };
                (app_type.clone(), target)
            })
            .collect();

        SwitchResolvedConfig {
            database_path: store.database_path.clone(),
            lock_path: store.lock_path.clone(),
            mirror_path: store.mirror_path.clone(),
            lock_timeout: self.lock_timeout_ms.map(Duration::from_millis),
            repair: RepairPolicy {
                max_attempts: self.repair_max_attempts.max(1),
                delay: Duration::from_millis(self.repair_delay_ms),
            },
            apps,
        }
    }
}

/// Effective coordinator settings, with paths and defaults filled in.
#[derive(Debug, Clone)]
pub struct SwitchResolvedConfig {
    pub database_path: PathBuf,
    pub lock_path: PathBuf,
    pub mirror_path: PathBuf,
    pub lock_timeout: Option<Duration>,
    pub repair: RepairPolicy,
    pub apps: BTreeMap<String, AppTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub settings_path: PathBuf,
    pub endpoint_pointer: String,
    pub mirror_key: String,
}

impl AppTarget {
    /// Endpoint string found at `endpoint_pointer`, if any.
    pub fn endpoint_of(&self, settings: &Value) -> Option<String> {
        settings
            .pointer(&self.endpoint_pointer)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

/// `claude` -> `currentProviderClaude`
pub fn mirror_key_for(app_type: &str) -> String {
    let mut chars = app_type.chars();
    match chars.next() {
        Some(first) => format!("currentProvider{}{}", first.to_uppercase(), chars.as_str()),
        None => "currentProvider".to_string(),
    }
}

fn default_repair_max_attempts() -> usize {
    3
}

fn default_repair_delay_ms() -> u64 {
    1000
}

fn default_endpoint_pointer() -> String {
    "/env/ANTHROPIC_BASE_URL".to_string()
}

fn default_apps() -> BTreeMap<String, AppTypeConfig> {
    let mut apps = BTreeMap::new();
    apps.insert(
        "claude".to_string(),
        AppTypeConfig {
            settings_path: home().join(".claude").join("settings.json"),
            endpoint_pointer: default_endpoint_pointer(),
            mirror_key: None,
        },
    );
    apps
}
