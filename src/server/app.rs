use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes::{cars_handler, detailed_inventory_handler};
use crate::pipeline::InventoryPipeline;
use crate::storage::InventoryStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InventoryPipeline>,
    pub store: InventoryStore,
    // The browser session is exclusive; one crawl at a time.
    pub crawl_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: InventoryPipeline, store: InventoryStore) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            crawl_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/cars", get(cars_handler))
        .route("/car_detailed_inventory", get(detailed_inventory_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
