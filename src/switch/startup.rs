use super::coordinator::{Inner, SwitchCoordinator, parse_settings};
use super::mirror::{MirrorUpdate, update_mirror};
use super::outcome::SwitchState;
use crate::config::AppTarget;
use crate::db::Provider;
use crate::error::SwitchError;
use serde_json::Value;
use std::io;
use tracing::{error, info, warn};

/// What the startup check changed, per app type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// App types whose active config file was rewritten from the catalog.
    pub repaired_settings: Vec<String>,
    /// App types whose mirror entry was rewritten from the catalog.
    pub repaired_mirror: Vec<String>,
    /// Problems that were logged and left uncorrected.
    pub failures: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.repaired_settings.is_empty() && self.repaired_mirror.is_empty() && self.failures.is_empty()
    }
}

impl SwitchCoordinator {
    /// Bring the active config files and the mirror back in line with the catalog.
    ///
    /// Run once before serving. The catalog is never written; every failure is
    /// logged and reported, none of them aborts startup.
    pub async fn startup_consistency_check(&self) -> ConsistencyReport {
        self.inner().startup_check().await
    }
}

impl Inner {
    async fn startup_check(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();

        let guard = match self.lock.acquire().await {
            Ok(guard) => guard,
            Err(e) => {
                error!(error = %e, "Startup consistency check could not take the switch lock");
                report.failures.push(format!("lock: {e}"));
                return report;
            }
        };
        let _closed = self.gate.close();
        let degraded = *guard == SwitchState::Degraded;

        for (app_type, target) in &self.cfg.apps {
            self.check_app(app_type, target, degraded, &mut report).await;
        }

        if report.is_clean() {
            info!("Startup consistency check found no drift");
        } else {
            info!(
                repaired_settings = ?report.repaired_settings,
                repaired_mirror = ?report.repaired_mirror,
                failures = report.failures.len(),
                "Startup consistency check finished"
            );
        }
        report
    }

    async fn check_app(
        &self,
        app_type: &str,
        target: &AppTarget,
        degraded: bool,
        report: &mut ConsistencyReport,
    ) {
        let rows = match self.db.current_providers(app_type).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(app_type, error = %e, "Could not read current provider from catalog");
                report.failures.push(format!("{app_type}: catalog: {e}"));
                return;
            }
        };
        let Some(current) = rows.first() else {
            info!(app_type, "No current provider in catalog; skipping");
            return;
        };
        if rows.len() > 1 {
            warn!(
                app_type,
                count = rows.len(),
                using = %current.id,
                "Catalog has more than one current provider"
            );
        }

        if degraded {
            warn!(app_type, "Coordinator is degraded; not touching active config");
        } else {
            match self.check_settings(app_type, target, current).await {
                Ok(true) => report.repaired_settings.push(app_type.to_string()),
                Ok(false) => {}
                Err(e) => {
                    warn!(app_type, error = %e, "Active config check failed");
                    report.failures.push(format!("{app_type}: settings: {e}"));
                }
            }
        }

        match update_mirror(&self.writer, &self.cfg.mirror_path, &target.mirror_key, &current.id)
            .await
        {
            Ok(MirrorUpdate::Written { previous }) => {
                warn!(
                    app_type,
                    current = ?previous,
                    expected = %current.id,
                    "Mirror drift repaired"
                );
                report.repaired_mirror.push(app_type.to_string());
            }
            Ok(MirrorUpdate::Unchanged) => {}
            Ok(MirrorUpdate::Missing) => info!(app_type, "No mirror file; skipping"),
            Err(e) => {
                warn!(app_type, error = %e, "Mirror check failed");
                report.failures.push(format!("{app_type}: mirror: {e}"));
            }
        }
    }

    /// `Ok(true)` when the active config was rewritten.
    async fn check_settings(
        &self,
        app_type: &str,
        target: &AppTarget,
        current: &Provider,
    ) -> Result<bool, SwitchError> {
        let expected = parse_settings(&current.settings_config)?;

        let raw = match tokio::fs::read(&target.settings_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(app_type, path = %target.settings_path.display(), "No active config file; skipping");
                return Ok(false);
            }
            Err(e) => return Err(SwitchError::Io(e)),
        };

        let expected_endpoint = target.endpoint_of(&expected);
        // Unparseable content counts as drift.
        let current_endpoint = serde_json::from_slice::<Value>(&raw)
            .ok()
            .map(|doc| target.endpoint_of(&doc));
        if current_endpoint.as_ref() == Some(&expected_endpoint) {
            return Ok(false);
        }

        warn!(
            app_type,
            current_url = ?current_endpoint.flatten(),
            expected_url = ?expected_endpoint,
            provider_id = %current.id,
            "Active config drift detected; rewriting from catalog"
        );
        self.write_settings(target, &expected)
            .await
            .map_err(SwitchError::Io)?;
        Ok(true)
    }
}
