//! Route definitions for species.

use axum::routing::get;
use axum::Router;

use crate::handlers::species;
use crate::state::AppState;

/// Routes mounted at `/species`.
///
/// ```text
/// GET    /                  -> list
/// POST   /                  -> create
/// GET    /{id}              -> get_by_id
/// PUT    /{id}              -> update
/// DELETE /{id}              -> delete
/// GET    /{id}/subspecies   -> list_subspecies
/// GET    /{id}/games        -> list_games
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(species::list).post(species::create))
        .route(
            "/{id}",
            get(species::get_by_id)
                .put(species::update)
                .delete(species::delete),
        )
        .route("/{id}/subspecies", get(species::list_subspecies))
        .route("/{id}/games", get(species::list_games))
}
