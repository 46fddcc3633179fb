pub mod handlers;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/profiles",
            post(handlers::handle_create_profile).get(handlers::handle_list_profiles),
        )
        .route("/api/v1/profiles/:id/run", post(handlers::handle_run_profile))
        .route(
            "/api/v1/profiles/:id/matches",
            get(handlers::handle_profile_matches),
        )
        .route("/api/v1/profiles/:id/runs", get(handlers::handle_run_history))
        .route("/api/v1/stats", get(handlers::handle_stats))
        .with_state(state)
}
