pub mod category;
pub mod game;
pub mod genus;
pub mod health;
pub mod species;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /genera                                  list, create
/// /genera/{id}                             get, update, delete
/// /genera/{id}/species                     species of a genus
///
/// /species                                 list (genus_id, parent_species_id, roots_only), create
/// /species/{id}                            get, update, delete
/// /species/{id}/subspecies                 direct children
/// /species/{id}/games                      games bound to the species
///
/// /categories                              list, create
/// /categories/{id}                         get, update, delete
///
/// /games                                   list (see GameListParams), create
/// /games/{id}                              get, update, delete
/// /games/{id}/children                     direct child games
/// /games/{id}/start_hunting                NOT_STARTED -> HUNTING (POST)
/// /games/{id}/complete_hunting             HUNTING -> CAPTURED (POST)
/// /games/{id}/escape_hunting               HUNTING -> ESCAPED (POST)
/// /games/{id}/pause_hunting                HUNTING -> PENDING (POST)
/// /games/{id}/resume_hunting               PENDING -> HUNTING (POST)
///
/// /active_game                             the game currently being hunted
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/genera", genus::router())
        .nest("/species", species::router())
        .nest("/categories", category::router())
        .nest("/games", game::router())
        .route("/active_game", get(handlers::game::active))
}
