use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use serde::Deserialize;

use cleaner_api::config::AppConfig;
use cleaner_api::issue::IssuesReply;
use cleaner_api::status::{CleanReply, StatusSnapshot};

use crate::error::ApiResult;
use crate::notify::Notifier;
use crate::server::appstate::{AppState, clean_reply};

#[derive(Debug, Default, Deserialize)]
struct CleanQuery {
    #[serde(default)]
    all: bool,
}

async fn get_status(State(state): State<AppState>) -> Json<Vec<StatusSnapshot>> {
    Json(state.snapshots().await)
}

async fn get_hub_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<StatusSnapshot>> {
    Ok(Json(state.get(&name)?.snapshot().await))
}

async fn post_clean(State(state): State<AppState>) -> Json<Vec<CleanReply>> {
    Json(state.clean_everywhere(false).await)
}

async fn post_clean_all(State(state): State<AppState>) -> Json<Vec<CleanReply>> {
    Json(state.clean_everywhere(true).await)
}

async fn post_clean_hub(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<CleanQuery>,
) -> ApiResult<Json<CleanReply>> {
    let coord = state.get(&name)?;
    let res = coord.manual_clean(query.all).await;
    Ok(Json(clean_reply(&name, res)))
}

async fn get_issues(State(state): State<AppState>) -> Json<IssuesReply> {
    Json(state.issues().reply().await)
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.issues().dismiss_notification(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

async fn get_config(State(state): State<AppState>) -> Json<AppConfig> {
    Json((*state.config()).clone())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/status/{name}", get(get_hub_status))
        .route("/clean", post(post_clean))
        .route("/clean_all", post(post_clean_all))
        .route("/clean/{name}", post(post_clean_hub))
        .route("/issues", get(get_issues))
        .route("/notifications/{id}", delete(delete_notification))
        .route("/config", get(get_config))
}
