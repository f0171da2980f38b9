//! SQL DDL for the provider catalog.
//! The desktop app normally owns this schema; these statements only bootstrap
//! an empty database and are no-ops against an existing one.

/// SQLite schema includes:
/// - `providers` table (one row per (id, app_type); `is_current` marks the active one)
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS providers (
    id TEXT NOT NULL,
    app_type TEXT NOT NULL,
    name TEXT NOT NULL,
    settings_config TEXT NOT NULL, -- JSON object
    is_current BOOLEAN NOT NULL DEFAULT 0,
    sort_index INTEGER NULL,
    PRIMARY KEY (id, app_type)
);

CREATE INDEX IF NOT EXISTS idx_providers_app_type ON providers(app_type);
"#;
