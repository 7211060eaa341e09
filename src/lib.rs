pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Application routes with request tracing. `users` is taken from the
/// caller so the binary can wrap it in a rate limiter.
pub fn build_router(state: AppState, users: Router<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/users", users)
        .nest("/notes", routes::notes::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Credentialed CORS for the single configured frontend origin.
pub fn cors_layer(frontend_origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(frontend_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true))
}
