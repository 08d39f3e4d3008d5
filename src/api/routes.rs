use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Movie page
        .route("/movies/:id", get(handlers::get_movie))
        .route("/movies/:id/recommendations", get(handlers::get_recommendations))
        // List membership
        .route("/movies/:id/membership", get(handlers::get_membership))
        .route("/movies/:id/favorite", post(handlers::toggle_favorite))
        .route("/movies/:id/watchlist", post(handlers::toggle_watchlist))
        .route("/view", get(handlers::get_view))
}
