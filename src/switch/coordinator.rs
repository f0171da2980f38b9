use super::gate::ReadinessGate;
use super::lock::{DualLock, DualLockGuard, LockError};
use super::mirror::{MirrorUpdate, update_mirror};
use super::outcome::{SwitchOutcome, SwitchState};
use super::repair::RepairReport;
use super::writer::{
    AtomicFileWriter, ConfigWriter, remove_off_thread, write_off_thread,
};
use crate::config::{AppTarget, SwitchResolvedConfig};
use crate::db::{DbActorHandle, Provider};
use crate::error::SwitchError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

const REPAIR_EVENTS_CAPACITY: usize = 16;

/// Switches the current provider while keeping the active config file (A),
/// the catalog (B) and the desktop mirror (C) consistent.
///
/// Cheap to clone; all clones share one state machine, one lock and one gate.
#[derive(Clone)]
pub struct SwitchCoordinator {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) db: DbActorHandle,
    pub(super) cfg: SwitchResolvedConfig,
    pub(super) writer: Arc<dyn ConfigWriter>,
    pub(super) lock: DualLock<SwitchState>,
    pub(super) gate: ReadinessGate,
    pub(super) repairs: broadcast::Sender<RepairReport>,
    state_tx: watch::Sender<SwitchState>,
    generation: AtomicU64,
    last_switched_at: Mutex<Option<DateTime<Utc>>>,
}

impl SwitchCoordinator {
    pub fn new(db: DbActorHandle, cfg: SwitchResolvedConfig) -> Self {
        Self::with_parts(db, cfg, Arc::new(AtomicFileWriter), ReadinessGate::new())
    }

    /// Build with an explicit writer and gate (used to observe or inject faults).
    pub fn with_parts(
        db: DbActorHandle,
        cfg: SwitchResolvedConfig,
        writer: Arc<dyn ConfigWriter>,
        gate: ReadinessGate,
    ) -> Self {
        let lock = DualLock::new(SwitchState::Idle, cfg.lock_path.clone(), cfg.lock_timeout);
        let (state_tx, _rx) = watch::channel(SwitchState::Idle);
        let (repairs, _rx) = broadcast::channel(REPAIR_EVENTS_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                db,
                cfg,
                writer,
                lock,
                gate,
                repairs,
                state_tx,
                generation: AtomicU64::new(0),
                last_switched_at: Mutex::new(None),
            }),
        }
    }

    /// Providers of `app_type` ordered by `sort_index`, then `name`.
    ///
    /// Waits while a switch is in flight. Listing is for display only: any
    /// failure is logged and yields an empty list.
    pub async fn list_providers(&self, app_type: &str) -> Vec<Provider> {
        self.inner.gate.wait_open().await;
        match self.inner.db.list_providers(app_type).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(app_type, error = %e, "Failed to list providers");
                Vec::new()
            }
        }
    }

    pub async fn get_current_provider(&self, app_type: &str) -> Option<Provider> {
        self.list_providers(app_type)
            .await
            .into_iter()
            .find(|p| p.is_current)
    }

    /// Make `provider_id` the current provider of `app_type`.
    ///
    /// Never fails as a `Result`: every expected failure is reported through the
    /// outcome. The switch runs on its own task, so dropping this future does not
    /// interrupt a switch (or its rollback) that has already started.
    pub async fn switch_provider(&self, provider_id: &str, app_type: &str) -> SwitchOutcome {
        if self.state() == SwitchState::Degraded {
            return SwitchOutcome::degraded(SwitchError::Degraded);
        }
        // Pooled connections keep an unlinked catalog alive; check the path itself.
        if !self.is_available() {
            warn!(path = %self.database_path().display(), "Provider catalog missing; switch refused");
            return SwitchOutcome::failed(SwitchError::StoreUnavailable(
                self.database_path().to_path_buf(),
            ));
        }

        let tx_id = new_tx_id();
        let span = info_span!("provider_switch", %tx_id, new_provider = %provider_id, %app_type);
        let inner = self.inner.clone();
        let provider_id = provider_id.to_string();
        let app_type = app_type.to_string();

        let task = tokio::spawn(
            async move { inner.run_switch(&provider_id, &app_type).await }.instrument(span),
        );

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Provider switch task did not complete");
                SwitchOutcome::failed(SwitchError::Aborted(e.to_string()))
            }
        }
    }

    /// Last state published by the state machine.
    pub fn state(&self) -> SwitchState {
        *self.inner.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SwitchState> {
        self.inner.state_tx.subscribe()
    }

    /// Bumped once per switch attempt that entered the critical section.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn last_switched_at(&self) -> Option<DateTime<Utc>> {
        *self
            .inner
            .last_switched_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the provider catalog exists on disk.
    pub fn is_available(&self) -> bool {
        self.inner.cfg.database_path.is_file()
    }

    pub fn database_path(&self) -> &Path {
        &self.inner.cfg.database_path
    }

    pub fn readiness(&self) -> ReadinessGate {
        self.inner.gate.clone()
    }

    /// Outcomes of background mirror repairs started after this call.
    pub fn subscribe_repairs(&self) -> broadcast::Receiver<RepairReport> {
        self.inner.repairs.subscribe()
    }

    /// Endpoint of a provider as its app type's target reads it.
    pub fn endpoint_of(&self, provider: &Provider) -> Option<String> {
        let target = self.inner.cfg.apps.get(&provider.app_type)?;
        target.endpoint_of(&provider.settings()?)
    }

    pub(super) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }
}

/// Rollback material for Store A, taken before it is overwritten.
enum Snapshot {
    Present(Vec<u8>),
    Absent,
    Unreadable(io::Error),
}

impl Snapshot {
    async fn take(path: &Path) -> Self {
        match tokio::fs::read(path).await {
            Ok(bytes) => Snapshot::Present(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Snapshot::Absent,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not back up active config");
                Snapshot::Unreadable(e)
            }
        }
    }
}

impl Inner {
    async fn run_switch(self: &Arc<Self>, provider_id: &str, app_type: &str) -> SwitchOutcome {
        let mut guard = match self.lock.acquire().await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Could not acquire provider switch lock");
                return SwitchOutcome::failed(match e {
                    LockError::Timeout(limit) => SwitchError::LockTimeout(limit),
                    LockError::Io(e) => SwitchError::Lock(e),
                });
            }
        };

        // Authoritative check: another task may have latched Degraded while we waited.
        if *guard == SwitchState::Degraded {
            return SwitchOutcome::degraded(SwitchError::Degraded);
        }

        let reopen = self.gate.close();
        self.publish(&mut guard, SwitchState::Switching);

        let outcome = self.switch_locked(provider_id, app_type).await;

        self.publish(&mut guard, outcome.status.into());
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if outcome.is_ok() {
            *self
                .last_switched_at
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());
        }

        match &outcome.error {
            None => info!(
                generation,
                provider_name = outcome.provider_name.as_deref().unwrap_or("-"),
                endpoint = outcome.endpoint.as_deref().unwrap_or("-"),
                "Provider switch complete"
            ),
            Some(e) => warn!(generation, status = ?outcome.status, error = %e, "Provider switch did not complete"),
        }

        drop(reopen);
        drop(guard);
        outcome
    }

    fn publish(&self, guard: &mut DualLockGuard<'_, SwitchState>, state: SwitchState) {
        **guard = state;
        self.state_tx.send_replace(state);
    }

    /// Steps 3-7; runs with the dual lock held and the gate closed.
    async fn switch_locked(self: &Arc<Self>, provider_id: &str, app_type: &str) -> SwitchOutcome {
        let Some(target) = self.cfg.apps.get(app_type) else {
            return SwitchOutcome::failed(SwitchError::UnsupportedAppType(app_type.to_string()));
        };

        let snapshot = Snapshot::take(&target.settings_path).await;

        let provider = match self.db.get_provider(provider_id, app_type).await {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                return SwitchOutcome::failed(SwitchError::NotFound {
                    provider_id: provider_id.to_string(),
                    app_type: app_type.to_string(),
                });
            }
            Err(e) => return SwitchOutcome::failed(SwitchError::Db(e)),
        };

        let settings = match parse_settings(&provider.settings_config) {
            Ok(settings) => settings,
            Err(e) => return SwitchOutcome::failed(e),
        };
        let endpoint = target.endpoint_of(&settings);

        info!(path = %target.settings_path.display(), "Writing active config");
        if let Err(e) = self.write_settings(target, &settings).await {
            error!(error = %e, "Active config write failed; catalog untouched");
            return SwitchOutcome::failed(SwitchError::Io(e));
        }

        info!("Committing current provider to catalog");
        if let Err(db_err) = self.db.set_current(provider_id, app_type).await {
            error!(error = %db_err, "Catalog update failed; restoring active config");
            return match self.restore(&target.settings_path, snapshot).await {
                Ok(()) => {
                    info!("Active config restored");
                    SwitchOutcome::failed(SwitchError::Db(db_err))
                }
                Err(rollback) => {
                    error!(
                        degraded = true,
                        rollback_error = %rollback,
                        "Active config rollback failed; provider switching disabled until manual repair"
                    );
                    SwitchOutcome::degraded(SwitchError::RollbackFailed {
                        db: db_err,
                        rollback,
                    })
                }
            };
        }

        match update_mirror(
            &self.writer,
            &self.cfg.mirror_path,
            &target.mirror_key,
            provider_id,
        )
        .await
        {
            Ok(MirrorUpdate::Written { .. }) => info!("Mirror updated"),
            Ok(MirrorUpdate::Unchanged) => debug!("Mirror already up to date"),
            Ok(MirrorUpdate::Missing) => debug!("No mirror file; skipping"),
            Err(e) => {
                warn!(error = %e, "Mirror update failed; scheduling repair");
                self.schedule_repair(app_type);
            }
        }

        SwitchOutcome::ok(provider.name, endpoint)
    }

    pub(super) async fn write_settings(&self, target: &AppTarget, settings: &Value) -> io::Result<()> {
        write_off_thread(&self.writer, &target.settings_path, switchyard_fs::json_bytes(settings)?).await
    }

    async fn restore(&self, path: &Path, snapshot: Snapshot) -> io::Result<()> {
        match snapshot {
            Snapshot::Present(bytes) => write_off_thread(&self.writer, path, bytes).await,
            Snapshot::Absent => remove_off_thread(&self.writer, path).await,
            Snapshot::Unreadable(e) => Err(io::Error::new(
                e.kind(),
                format!("no backup of the previous active config: {e}"),
            )),
        }
    }
}

/// A provider's `settings_config` must be a JSON object to become an active config.
pub(super) fn parse_settings(raw: &str) -> Result<Value, SwitchError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(SwitchError::InvalidConfig(
            "settings_config is not a JSON object".to_string(),
        )),
        Err(e) => Err(SwitchError::InvalidConfig(e.to_string())),
    }
}

fn new_tx_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
