use crate::error::SwitchError;
use serde::Serialize;

/// Coordinator state machine: `Idle -> Switching -> {Ok, Failed, Degraded}`.
///
/// `Degraded` is terminal for the lifetime of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchState {
    Idle,
    Switching,
    Ok,
    Failed,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchStatus {
    Ok,
    Failed,
    Degraded,
}

impl SwitchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchStatus::Ok => "OK",
            SwitchStatus::Failed => "FAILED",
            SwitchStatus::Degraded => "DEGRADED",
        }
    }
}

impl From<SwitchStatus> for SwitchState {
    fn from(status: SwitchStatus) -> Self {
        match status {
            SwitchStatus::Ok => SwitchState::Ok,
            SwitchStatus::Failed => SwitchState::Failed,
            SwitchStatus::Degraded => SwitchState::Degraded,
        }
    }
}

/// Result of one `switch_provider` call.
#[derive(Debug)]
pub struct SwitchOutcome {
    pub status: SwitchStatus,
    pub provider_name: Option<String>,
    pub endpoint: Option<String>,
    pub error: Option<SwitchError>,
}

impl SwitchOutcome {
    pub(crate) fn ok(provider_name: String, endpoint: Option<String>) -> Self {
        Self {
            status: SwitchStatus::Ok,
            provider_name: Some(provider_name),
            endpoint,
            error: None,
        }
    }

    pub(crate) fn failed(error: SwitchError) -> Self {
        Self {
            status: SwitchStatus::Failed,
            provider_name: None,
            endpoint: None,
            error: Some(error),
        }
    }

    pub(crate) fn degraded(error: SwitchError) -> Self {
        Self {
            status: SwitchStatus::Degraded,
            provider_name: None,
            endpoint: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SwitchStatus::Ok
    }
}
