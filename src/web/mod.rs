//! Web server
//!
//! Viewer and editor pages plus the JSON data API.

pub mod error;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::db::Database;

pub use error::{ApiError, ErrorResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    Router::new()
        .route("/", get(handlers::index))
        .route("/edit", get(handlers::edit))
        // the literal route wins over the date parameter
        .route("/api/data/all", get(handlers::get_all_data))
        .route(
            "/api/data/:date",
            get(handlers::get_day_data).post(handlers::replace_day_data),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
