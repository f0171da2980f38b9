use crate::server::router::SwitchyardState;
use axum::{
    Router,
    routing::{get, post},
};

pub mod providers;

pub fn router() -> Router<SwitchyardState> {
    Router::new()
        .route("/v1/status", get(providers::status_handler))
        .route("/v1/providers/{app_type}", get(providers::list_handler))
        .route(
            "/v1/providers/{app_type}/current",
            get(providers::current_handler),
        )
        .route(
            "/v1/providers/{app_type}/switch",
            post(providers::switch_handler),
        )
}
