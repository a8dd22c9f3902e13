use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::admin::admin_router;
use super::{images, media, social, transform};
use crate::config::AppSettings;
use crate::media::MediaStorage;
use crate::store::Store;
use crate::transform::GenerativeImageClient;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: MediaStorage,
    pub transformer: GenerativeImageClient,
    /// Public base URL for external access. Used for media URLs.
    pub public_base_url: Option<String>,
    pub settings: AppSettings,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Images
        .route("/images", get(images::list_images))
        .route("/images", post(images::upload_image))
        .route("/my-images", get(images::list_my_images))
        .route("/images/{id}", get(images::get_image_detail))
        .route("/images/{id}", patch(images::update_visibility))
        .route("/images/{id}", delete(images::delete_image))
        // Lineage
        .route(
            "/images/{id}/derivatives",
            get(images::list_image_derivatives),
        )
        .route("/images/{id}/tree", get(images::get_image_tree))
        .route("/images/{id}/provenance", get(images::get_image_provenance))
        // Engagement
        .route("/images/{id}/likes", get(social::get_likes))
        .route("/images/{id}/likes", post(social::toggle_like))
        .route("/images/{id}/comments", get(social::list_comments))
        .route("/images/{id}/comments", post(social::create_comment))
        .route("/comments/{id}", delete(social::delete_comment))
        // Transformation
        .route("/transform-image", post(transform::transform_image))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", api_router())
        .route("/media/{name}", get(media::serve_media))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
