pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the session-protected progress routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/goals/today", get(rest::list_goals_handler).post(rest::create_goal_handler))
        .route(
            "/api/goals/today/{goal_id}",
            patch(rest::update_goal_handler).delete(rest::delete_goal_handler),
        )
        .route("/api/{kind}/user", get(rest::list_items_handler))
        .route("/api/{kind}/progress", post(rest::post_progress_handler))
        .route("/api/{kind}/{item_id}/progress", get(rest::get_progress_handler))
        .route("/api/{kind}/{item_id}/complete", patch(rest::complete_item_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
