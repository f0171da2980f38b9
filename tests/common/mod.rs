#![allow(dead_code)]

use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchyard::config::{AppTarget, RepairPolicy, SwitchResolvedConfig};
use switchyard::switch::{AtomicFileWriter, ConfigWriter, ReadinessGate, SwitchCoordinator};
use tempfile::TempDir;

pub const CLAUDE: &str = "claude";
pub const MIRROR_KEY: &str = "currentProviderClaude";

/// Delegates to the real atomic writer, recording every call and failing the
/// calls a test asks it to fail.
pub struct RecordingWriter {
    inner: AtomicFileWriter,
    gate: Mutex<Option<ReadinessGate>>,
    writes: Mutex<Vec<PathBuf>>,
    failures: Mutex<Vec<FailRule>>,
    writes_with_gate_open: AtomicUsize,
}

struct FailRule {
    path: PathBuf,
    /// 1-based index of the write to `path` that fails; `None` fails all of them.
    nth: Option<usize>,
}

impl RecordingWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: AtomicFileWriter,
            gate: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            writes_with_gate_open: AtomicUsize::new(0),
        })
    }

    pub fn watch_gate(&self, gate: ReadinessGate) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn fail_always(&self, path: &Path) {
        self.failures.lock().unwrap().push(FailRule {
            path: path.to_path_buf(),
            nth: None,
        });
    }

    pub fn fail_nth(&self, path: &Path, nth: usize) {
        self.failures.lock().unwrap().push(FailRule {
            path: path.to_path_buf(),
            nth: Some(nth),
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Attempted writes, failed ones included.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, path: &Path) -> usize {
        self.writes.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn writes_with_gate_open(&self) -> usize {
        self.writes_with_gate_open.load(Ordering::SeqCst)
    }
}

impl ConfigWriter for RecordingWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            if gate.is_open() {
                self.writes_with_gate_open.fetch_add(1, Ordering::SeqCst);
            }
        }

        let nth = {
            let mut writes = self.writes.lock().unwrap();
            writes.push(path.to_path_buf());
            writes.iter().filter(|p| *p == path).count()
        };

        let fail = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|rule| rule.path == path && rule.nth.is_none_or(|n| n == nth));
        if fail {
            return Err(io::Error::other(format!(
                "injected write failure for {}",
                path.display()
            )));
        }

        self.inner.write(path, contents)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.inner.remove(path)
    }
}

/// A temp directory holding all three stores and the lock file.
pub struct Fixture {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub database_url: String,
    pub database_path: PathBuf,
    pub settings_path: PathBuf,
    pub mirror_path: PathBuf,
    pub lock_path: PathBuf,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let database_path = dir.path().join("cc-switch.db");
        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());

        let opts = SqliteConnectOptions::from_str(&database_url)
            .expect("sqlite url")
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .expect("open sqlite");
        for stmt in switchyard::db::SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if !s.is_empty() {
                sqlx::query(s).execute(&pool).await.expect("schema");
            }
        }

        Self {
            settings_path: dir.path().join("claude").join("settings.json"),
            mirror_path: dir.path().join("cc-switch").join("settings.json"),
            lock_path: dir.path().join("provider-switch.lock"),
            database_path,
            database_url,
            pool,
            dir,
        }
    }

    pub fn config(&self) -> SwitchResolvedConfig {
        let mut apps = BTreeMap::new();
        apps.insert(
            CLAUDE.to_string(),
            AppTarget {
                settings_path: self.settings_path.clone(),
                endpoint_pointer: "/env/ANTHROPIC_BASE_URL".to_string(),
                mirror_key: MIRROR_KEY.to_string(),
            },
        );
        SwitchResolvedConfig {
            database_path: self.database_path.clone(),
            lock_path: self.lock_path.clone(),
            mirror_path: self.mirror_path.clone(),
            lock_timeout: None,
            repair: RepairPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(20),
            },
            apps,
        }
    }

    pub async fn coordinator(&self) -> (SwitchCoordinator, Arc<RecordingWriter>) {
        self.coordinator_with(self.config()).await
    }

    pub async fn coordinator_with(
        &self,
        cfg: SwitchResolvedConfig,
    ) -> (SwitchCoordinator, Arc<RecordingWriter>) {
        let db = switchyard::db::spawn(&self.database_url, false)
            .await
            .expect("spawn db actor");
        let gate = ReadinessGate::new();
        let writer = RecordingWriter::new();
        writer.watch_gate(gate.clone());
        let coordinator = SwitchCoordinator::with_parts(db, cfg, writer.clone(), gate);
        (coordinator, writer)
    }

    pub async fn add_provider(&self, id: &str, name: &str, endpoint: &str, is_current: bool) {
        let settings = json!({
            "env": {
                "ANTHROPIC_BASE_URL": endpoint,
                "ANTHROPIC_AUTH_TOKEN": format!("sk-{id}"),
            }
        });
        self.add_raw_provider(id, name, &settings.to_string(), is_current)
            .await;
    }

    pub async fn add_raw_provider(&self, id: &str, name: &str, settings: &str, is_current: bool) {
        sqlx::query(
            "INSERT INTO providers (id, app_type, name, settings_config, is_current) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(CLAUDE)
        .bind(name)
        .bind(settings)
        .bind(is_current)
        .execute(&self.pool)
        .await
        .expect("insert provider");
    }

    /// Ids flagged current for `claude`, straight from the database.
    pub async fn current_ids(&self) -> Vec<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT id FROM providers WHERE app_type = ? AND is_current = 1 ORDER BY id",
        )
        .bind(CLAUDE)
        .fetch_all(&self.pool)
        .await
        .expect("query current")
    }

    /// Make every catalog update fail until [`Fixture::heal_db`].
    pub async fn break_db(&self) {
        sqlx::query(
            "CREATE TRIGGER IF NOT EXISTS reject_updates BEFORE UPDATE ON providers \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
        )
        .execute(&self.pool)
        .await
        .expect("create trigger");
    }

    pub async fn heal_db(&self) {
        sqlx::query("DROP TRIGGER IF EXISTS reject_updates")
            .execute(&self.pool)
            .await
            .expect("drop trigger");
    }

    pub fn write_settings(&self, value: &Value) {
        write_json(&self.settings_path, value);
    }

    pub fn write_mirror(&self, value: &Value) {
        write_json(&self.mirror_path, value);
    }

    pub fn read_settings(&self) -> Value {
        read_json(&self.settings_path)
    }

    pub fn read_mirror(&self) -> Value {
        read_json(&self.mirror_path)
    }

    pub fn settings_endpoint(&self) -> Option<String> {
        self.read_settings()
            .pointer("/env/ANTHROPIC_BASE_URL")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

/// The two-provider catalog most tests start from: P1 current, P2 standby.
pub async fn seeded() -> Fixture {
    let fx = Fixture::new().await;
    fx.add_provider("p1", "Provider One", "https://one.example", true)
        .await;
    fx.add_provider("p2", "Provider Two", "https://two.example", false)
        .await;
    fx.write_settings(&json!({
        "env": { "ANTHROPIC_BASE_URL": "https://one.example", "ANTHROPIC_AUTH_TOKEN": "sk-p1" }
    }));
    fx.write_mirror(&json!({ "theme": "dark", "currentProviderClaude": "p1" }));
    fx
}
