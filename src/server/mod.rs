pub mod appstate;
pub mod http;

use axum::extract::Request;
use axum::routing::IntoMakeService;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::routes;
use crate::server::appstate::AppState;

pub fn build_service(appstate: AppState) -> IntoMakeService<NormalizePath<axum::Router>> {
    let normalized = NormalizePathLayer::trim_trailing_slash().layer(routes::router(appstate));

    axum::ServiceExt::<Request>::into_make_service(normalized)
}
