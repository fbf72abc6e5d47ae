//! API layer
//!
//! HTTP handlers for:
//! - Users (registration, login, self-service)
//! - Profiles and follow relationships
//! - Metrics (Prometheus)

mod dto;
pub mod metrics;
mod profiles;
mod users;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::authenticate;

/// Create the application router
///
/// Routes are registered with their full paths so the access policy sees
/// the same templates it allowlists; `/metrics` included. Unknown paths
/// fall through to 404 without hitting the policy.
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api", get(health))
        .route("/api/users", post(users::register))
        .route("/api/users/login", post(users::login))
        .route(
            "/api/user",
            get(users::current_user).put(users::update_user),
        )
        .route("/api/profiles/:username", get(profiles::get_profile))
        .route(
            "/api/profiles/:username/follow",
            post(profiles::follow).delete(profiles::unfollow),
        )
        .merge(metrics_router())
        .route_layer(middleware::from_fn_with_state(state, authenticate))
        .route_layer(middleware::from_fn(metrics::track_http_metrics))
}

/// GET /api
async fn health() -> axum::Json<&'static str> {
    axum::Json("OK")
}
