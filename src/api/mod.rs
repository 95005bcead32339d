use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::retriever::Retriever;

pub mod handlers;
pub mod models;

pub fn create_router(retriever: Arc<Retriever>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // the dialog agent posts its form to the root path
        .route("/", post(handlers::search_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(retriever)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
