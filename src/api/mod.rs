mod error;
mod handlers;
mod models;

use crate::media::MediaService;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MediaService>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/extract/{platform}", post(handlers::extract))
        .route("/extract/{platform}/playlist", post(handlers::extract_playlist))
        .route("/download/batch", post(handlers::download_batch))
        .route("/download/{platform}", post(handlers::download))
        .route("/download/{platform}/images", post(handlers::download_images))
        .route("/download/{platform}/playlist", post(handlers::download_playlist));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
