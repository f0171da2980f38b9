use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One provider row. `settings_config` is kept as raw text; it is only parsed
/// when the provider is about to be written to an active config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub app_type: String,
    pub is_current: bool,
    pub settings_config: String,
    pub sort_index: Option<i64>,
}

impl Provider {
    /// Parsed `settings_config`, or `None` when it is not valid JSON.
    pub fn settings(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.settings_config).ok()
    }
}
