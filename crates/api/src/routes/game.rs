//! Route definitions for games and their lifecycle actions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::game;
use crate::state::AppState;

/// Routes mounted at `/games`.
///
/// ```text
/// GET    /                         -> list
/// POST   /                         -> create
/// GET    /{id}                     -> get_by_id
/// PUT    /{id}                     -> update
/// DELETE /{id}                     -> delete
/// GET    /{id}/children            -> list_children
/// POST   /{id}/start_hunting       -> start_hunting
/// POST   /{id}/complete_hunting    -> complete_hunting
/// POST   /{id}/escape_hunting      -> escape_hunting
/// POST   /{id}/pause_hunting       -> pause_hunting
/// POST   /{id}/resume_hunting      -> resume_hunting
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(game::list).post(game::create))
        .route(
            "/{id}",
            get(game::get_by_id).put(game::update).delete(game::delete),
        )
        .route("/{id}/children", get(game::list_children))
        .route("/{id}/start_hunting", post(game::start_hunting))
        .route("/{id}/complete_hunting", post(game::complete_hunting))
        .route("/{id}/escape_hunting", post(game::escape_hunting))
        .route("/{id}/pause_hunting", post(game::pause_hunting))
        .route("/{id}/resume_hunting", post(game::resume_hunting))
}
