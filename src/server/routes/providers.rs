use crate::db::Provider;
use crate::error::{ApiErrorBody, ApiErrorObject, SwitchyardError};
use crate::server::router::SwitchyardState;
use crate::switch::{SwitchCoordinator, SwitchOutcome, SwitchState, SwitchStatus};
use axum::extract::rejection::JsonRejection;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display shape of a provider. `settings_config` carries credentials and is
/// never sent over the wire.
#[derive(Debug, Serialize)]
pub struct ProviderView {
    pub id: String,
    pub name: String,
    pub app_type: String,
    pub is_current: bool,
    pub endpoint: Option<String>,
    pub sort_index: Option<i64>,
}

impl ProviderView {
    fn new(coordinator: &SwitchCoordinator, provider: Provider) -> Self {
        let endpoint = coordinator.endpoint_of(&provider);
        Self {
            id: provider.id,
            name: provider.name,
            app_type: provider.app_type,
            is_current: provider.is_current,
            endpoint,
            sort_index: provider.sort_index,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    #[serde(alias = "providerId")]
    pub provider_id: String,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub status: SwitchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorObject>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: SwitchState,
    pub generation: u64,
    pub last_switched_at: Option<DateTime<Utc>>,
}

/// GET /v1/providers/{app_type}
pub async fn list_handler(
    State(state): State<SwitchyardState>,
    Path(app_type): Path<String>,
) -> Response {
    let coordinator = &state.coordinator;
    if let Some(resp) = unavailable(coordinator) {
        return resp;
    }
    let providers = coordinator
        .list_providers(&app_type)
        .await
        .into_iter()
        .map(|p| ProviderView::new(coordinator, p))
        .collect::<Vec<_>>();
    Json(providers).into_response()
}

/// GET /v1/providers/{app_type}/current
pub async fn current_handler(
    State(state): State<SwitchyardState>,
    Path(app_type): Path<String>,
) -> Response {
    if let Some(resp) = unavailable(&state.coordinator) {
        return resp;
    }
    match state.coordinator.get_current_provider(&app_type).await {
        Some(provider) => Json(ProviderView::new(&state.coordinator, provider)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "NO_CURRENT_PROVIDER",
            format!("No current provider for app type {app_type}."),
        ),
    }
}

/// POST /v1/providers/{app_type}/switch
pub async fn switch_handler(
    State(state): State<SwitchyardState>,
    Path(app_type): Path<String>,
    payload: Result<Json<SwitchRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Request body must be a JSON object like {\"provider_id\":\"...\"}.".to_string(),
            );
        }
    };

    let provider_id = req.provider_id.trim();
    if provider_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            "provider_id must not be empty.".to_string(),
        );
    }

    let outcome = state
        .coordinator
        .switch_provider(provider_id, &app_type)
        .await;
    switch_response(outcome)
}

/// GET /v1/status
pub async fn status_handler(State(state): State<SwitchyardState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        state: state.coordinator.state(),
        generation: state.coordinator.generation(),
        last_switched_at: state.coordinator.last_switched_at(),
    })
}

/// Listing against a missing catalog would read as "no providers"; say so instead.
fn unavailable(coordinator: &SwitchCoordinator) -> Option<Response> {
    if coordinator.is_available() {
        return None;
    }
    let path = coordinator.database_path().display().to_string();
    Some(SwitchyardError::DatabaseMissing(path).into_response())
}

fn switch_response(outcome: SwitchOutcome) -> Response {
    let status_code = outcome
        .error
        .as_ref()
        .map(|e| e.status_code())
        .unwrap_or(StatusCode::OK);
    let body = SwitchResponse {
        status: outcome.status,
        provider_name: outcome.provider_name,
        endpoint: outcome.endpoint,
        error: outcome.error.map(|e| ApiErrorObject {
            code: e.code().to_string(),
            message: e.to_string(),
            details: None,
        }),
    };
    (status_code, Json(body)).into_response()
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(ApiErrorBody {
            inner: ApiErrorObject {
                code: code.to_string(),
                message,
                details: None,
            },
        }),
    )
        .into_response()
}
