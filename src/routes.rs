use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};
use crate::sink::RecordSink;

/// A loan application is a few hundred bytes; anything near this is not a form.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// API endpoints. The server puts these behind rate limiting.
pub fn api_routes<S: RecordSink>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/v1/predict", post(handlers::predict::<S>))
        .route("/api/v1/schema", get(handlers::schema::<S>))
        .route(
            "/api/v1/applications",
            get(handlers::list_applications::<S>),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Full application: health check plus `api`, with tracing and CORS.
pub fn app<S: RecordSink>(api: Router<Arc<AppState<S>>>, state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
