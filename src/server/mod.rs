pub mod app;
pub mod routes;

pub use app::{AppState, build_app};
