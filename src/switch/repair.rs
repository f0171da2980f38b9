use super::coordinator::Inner;
use super::mirror::{MirrorUpdate, update_mirror};
use backon::{ConstantBuilder, Retryable};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{Instrument, error, info, warn};

/// What a background mirror repair ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub app_type: String,
    pub outcome: RepairOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Mirror matches the catalog; `provider_id` is `None` when the catalog has
    /// no current provider or there is no mirror file to fix.
    Repaired {
        attempts: usize,
        provider_id: Option<String>,
    },
    /// Every attempt failed; the mirror stays out of sync until the next switch
    /// or startup check.
    Exhausted { attempts: usize, last_error: String },
}

impl Inner {
    /// Fire-and-forget repair of the mirror entry for `app_type`.
    pub(super) fn schedule_repair(self: &Arc<Self>, app_type: &str) {
        let inner = self.clone();
        let app_type = app_type.to_string();
        tokio::spawn(
            async move {
                let outcome = inner.repair_mirror(&app_type).await;
                // Nobody listening is fine; the result is already logged.
                let _ = inner.repairs.send(RepairReport { app_type, outcome });
            }
            .in_current_span(),
        );
    }

    async fn repair_mirror(&self, app_type: &str) -> RepairOutcome {
        let policy = self.cfg.repair;
        tokio::time::sleep(policy.delay).await;

        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result = (|| async move {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.repair_once(app_type).await
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(policy.delay)
                .with_max_times(policy.max_attempts.saturating_sub(1)),
        )
        .notify(|err: &io::Error, dur: Duration| {
            warn!(
                app_type,
                error = %err,
                retry_in = ?dur,
                max_attempts = policy.max_attempts,
                "Mirror repair attempt failed"
            );
        })
        .await;

        let attempts = counter.load(Ordering::Relaxed);
        match result {
            Ok(provider_id) => {
                info!(
                    app_type,
                    attempts,
                    provider_id = provider_id.as_deref().unwrap_or("-"),
                    "Mirror repaired"
                );
                RepairOutcome::Repaired {
                    attempts,
                    provider_id,
                }
            }
            Err(e) => {
                error!(
                    app_type,
                    attempts,
                    error = %e,
                    "Mirror repair exhausted; mirror left out of sync"
                );
                RepairOutcome::Exhausted {
                    attempts,
                    last_error: e.to_string(),
                }
            }
        }
    }

    /// One attempt, under the dual lock so it cannot interleave with a switch.
    ///
    /// The id written is whatever the catalog says is current *now*, not the id
    /// of the switch that scheduled the repair.
    async fn repair_once(&self, app_type: &str) -> io::Result<Option<String>> {
        let _guard = self.lock.acquire().await?;

        let Some(target) = self.cfg.apps.get(app_type) else {
            return Ok(None);
        };
        let current = self
            .db
            .current_providers(app_type)
            .await
            .map_err(io::Error::other)?;
        let Some(current) = current.into_iter().next() else {
            return Ok(None);
        };

        match update_mirror(&self.writer, &self.cfg.mirror_path, &target.mirror_key, &current.id)
            .await?
        {
            MirrorUpdate::Missing => Ok(None),
            MirrorUpdate::Written { .. } | MirrorUpdate::Unchanged => Ok(Some(current.id)),
        }
    }
}
