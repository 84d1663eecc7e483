// routes.rs
use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::{header::CONTENT_TYPE, HeaderName, Method};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers;
use crate::AppState;

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 500_000;

pub fn create_routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(handlers::AJAX_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(handlers::index).layer(CompressionLayer::new()))
        .route("/feedback", post(handlers::create_space))
        .route("/s/{slug}", get(handlers::feedback_page))
        .route("/s/{slug}/question", post(handlers::add_question))
        .route("/s/{slug}/answer", post(handlers::add_answer))
        .route("/s/{slug}/events", get(handlers::space_events))
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
