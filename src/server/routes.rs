use axum::{Json, extract::State, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;
use tracing::{error, info};

use super::app::AppState;

/// Runs a full crawl and answers with its completion summary.
///
/// The crawl runs on its own task, so a client that disconnects does not
/// cancel it mid-session: the browser is still closed and results persisted.
pub async fn cars_handler(State(state): State<AppState>) -> Response {
    info!("📥 GET /cars: starting crawl");
    let pipeline = state.pipeline.clone();
    let crawl_lock = state.crawl_lock.clone();
    let crawl = tokio::spawn(async move {
        let _guard = crawl_lock.lock_owned().await;
        pipeline.run().await
    });

    match crawl.await {
        Ok(Ok(summary)) => (StatusCode::OK, Json(json!({ "vehicles": summary }))).into_response(),
        Ok(Err(e)) => {
            error!("❌ Crawl request failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{:#}", e) })),
            )
                .into_response()
        }
        Err(e) => {
            error!("❌ Crawl task aborted: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("crawl task failed: {}", e) })),
            )
                .into_response()
        }
    }
}

/// Serves the records persisted by the last successful crawl.
pub async fn detailed_inventory_handler(State(state): State<AppState>) -> Response {
    match state.store.load() {
        Ok(Some(vehicles)) => (StatusCode::OK, Json(json!({ "vehicles": vehicles }))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "File not found" })),
        )
            .into_response(),
        Err(e) => {
            error!("❌ Could not read persisted inventory: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}
