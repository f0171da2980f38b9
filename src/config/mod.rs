mod basic;
mod store;
mod switch;

pub use basic::BasicConfig;
pub use store::StoreConfig;
pub use switch::{AppTarget, AppTypeConfig, RepairPolicy, SwitchConfig, SwitchResolvedConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core process configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Locations of the three provider stores and the switch lock (see `store` table).
    #[serde(default)]
    pub store: StoreConfig,

    /// Switch coordinator tuning and per-app targets (see `switch` table).
    #[serde(default)]
    pub switch: SwitchConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {}", DEFAULT_CONFIG_FILE);
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if cfg.basic.switch_key.trim().is_empty() {
            panic!("basic.switch_key must be set and non-empty");
        }
        cfg
    }

    /// Resolves the coordinator's view of the stores: lock, mirror and per-app targets.
    pub fn switch(&self) -> SwitchResolvedConfig {
        self.switch.resolve(&self.store)
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_toml);
