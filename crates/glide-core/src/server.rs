//! HTTP endpoints the client renderer talks to.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use crate::callback::{CallbackBridge, CallbackError};
use crate::layout::SerializedNode;
use crate::protocol::{CallbackRequest, CallbackResponse, DependencyDescriptor};

pub const LAYOUT_PATH: &str = "/_glide-layout";
pub const DEPENDENCIES_PATH: &str = "/_glide-dependencies";
pub const UPDATE_PATH: &str = "/_glide-update-component";

pub fn router(bridge: Arc<CallbackBridge>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(LAYOUT_PATH, get(layout_handler))
        .route(DEPENDENCIES_PATH, get(dependencies_handler))
        .route(UPDATE_PATH, post(update_handler))
        .with_state(bridge)
}

/// Serve files under `dir` at `url_path` (e.g. `/assets/`).
pub fn with_assets(router: Router, url_path: &str, dir: &Path) -> Router {
    let mount = format!("/{}", url_path.trim_matches('/'));
    if mount == "/" {
        return router.fallback_service(ServeDir::new(dir));
    }
    router.nest_service(&mount, ServeDir::new(dir))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn layout_handler(State(bridge): State<Arc<CallbackBridge>>) -> Json<SerializedNode> {
    Json(bridge.layout().serialize())
}

async fn dependencies_handler(State(bridge): State<Arc<CallbackBridge>>) -> Json<Vec<DependencyDescriptor>> {
    Json(bridge.dependencies())
}

async fn update_handler(
    State(bridge): State<Arc<CallbackBridge>>,
    Json(request): Json<CallbackRequest>,
) -> (StatusCode, Json<CallbackResponse>) {
    let trigger = format!("{}.{}", request.trigger.id, request.trigger.attribute);
    match bridge.handle(request).await {
        Ok(outcome) => {
            let response = CallbackResponse::from(outcome);
            let status = if response.is_failure() { StatusCode::UNPROCESSABLE_ENTITY } else { StatusCode::OK };
            log::debug!("{trigger}: {status}");
            (status, Json(response))
        }
        Err(e) => {
            let status = match e {
                CallbackError::UnknownCallback(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            log::warn!("rejected update from {trigger}: {e}");
            (status, Json(CallbackResponse::Failed { error: e.to_string() }))
        }
    }
}
