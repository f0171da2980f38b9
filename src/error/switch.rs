use super::SwitchyardError;
use axum::http::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Why a provider switch did not end in `Ok`.
///
/// Every variant is reported through a `SwitchOutcome`; `switch_provider` never
/// returns it as an `Err`.
#[derive(Debug, ThisError)]
pub enum SwitchError {
    #[error("Provider {provider_id} not found for app type {app_type}")]
    NotFound {
        provider_id: String,
        app_type: String,
    },

    #[error("App type {0} has no active config target configured")]
    UnsupportedAppType(String),

    #[error("Invalid provider config JSON: {0}")]
    InvalidConfig(String),

    #[error("Failed to write settings: {0}")]
    Io(#[source] std::io::Error),

    #[error("DB update failed: {0}")]
    Db(#[source] SwitchyardError),

    #[error(
        "DB update failed ({db}) and settings rollback failed ({rollback}); manual repair required"
    )]
    RollbackFailed {
        db: SwitchyardError,
        rollback: std::io::Error,
    },

    #[error(
        "Provider switch is disabled due to previous rollback failure. Manual repair required."
    )]
    Degraded,

    #[error("Timed out after {0:?} waiting for the provider switch lock")]
    LockTimeout(Duration),

    #[error("Provider switch lock failed: {0}")]
    Lock(#[source] std::io::Error),

    #[error("Provider database not found at {}", .0.display())]
    StoreUnavailable(PathBuf),

    #[error("Provider switch task aborted: {0}")]
    Aborted(String),
}

impl SwitchError {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            SwitchError::NotFound { .. } => "NOT_FOUND",
            SwitchError::UnsupportedAppType(_) => "UNSUPPORTED_APP_TYPE",
            SwitchError::InvalidConfig(_) => "INVALID_CONFIG",
            SwitchError::Io(_) => "IO_FAILURE",
            SwitchError::Db(_) => "DB_FAILURE",
            SwitchError::RollbackFailed { .. } | SwitchError::Degraded => "DEGRADED",
            SwitchError::LockTimeout(_) => "LOCK_TIMEOUT",
            SwitchError::Lock(_) => "LOCK_FAILURE",
            SwitchError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            SwitchError::Aborted(_) => "ABORTED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SwitchError::NotFound { .. } => StatusCode::NOT_FOUND,
            SwitchError::UnsupportedAppType(_) | SwitchError::InvalidConfig(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SwitchError::LockTimeout(_) => StatusCode::CONFLICT,
            SwitchError::RollbackFailed { .. }
            | SwitchError::Degraded
            | SwitchError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SwitchError::Io(_)
            | SwitchError::Db(_)
            | SwitchError::Lock(_)
            | SwitchError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
