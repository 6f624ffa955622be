pub mod status;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ApiError;
use crate::server::appstate::AppState;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownHub(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_msg = self.chain_message();
        if status.is_server_error() {
            log::error!("Request failed: {error_msg}");
        } else {
            log::warn!("Request failed: {error_msg}");
        }

        (status, axum::Json(json!({"error": error_msg}))).into_response()
    }
}

pub fn router(appstate: AppState) -> Router<()> {
    Router::new()
        .nest("/api", status::router())
        .with_state(appstate)
}
