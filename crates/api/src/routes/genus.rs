//! Route definitions for genera.

use axum::routing::get;
use axum::Router;

use crate::handlers::genus;
use crate::state::AppState;

/// Routes mounted at `/genera`.
///
/// ```text
/// GET    /               -> list
/// POST   /               -> create
/// GET    /{id}           -> get_by_id
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// GET    /{id}/species   -> list_species
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(genus::list).post(genus::create))
        .route(
            "/{id}",
            get(genus::get_by_id)
                .put(genus::update)
                .delete(genus::delete),
        )
        .route("/{id}/species", get(genus::list_species))
}
