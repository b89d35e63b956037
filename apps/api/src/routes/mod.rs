pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::session::handlers as session;
use crate::skills::handlers as skills;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session API
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/selections",
            get(session::handle_list_selections)
                .post(session::handle_select_skill)
                .delete(session::handle_clear_selections),
        )
        // Skills API
        .route("/api/v1/sessions/:id/extract", post(skills::handle_extract))
        .route("/api/v1/analyze", post(skills::handle_analyze))
        .with_state(state)
}
