use axum::{Router, routing::post};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::matcher::PhotoMatcher;
use crate::store::EmbeddingStore;

pub mod handlers;
pub mod models;

pub fn create_router<S: EmbeddingStore>(
    matcher: Arc<PhotoMatcher<S>>,
    static_dir: impl AsRef<Path>,
) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sorting/find", post(handlers::find_handler::<S>))
        .with_state(matcher)
        // Gallery images and reference photos
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
