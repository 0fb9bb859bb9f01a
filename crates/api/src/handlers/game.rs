//! Handlers for the `/games` resource, the hunt lifecycle actions and
//! `/active_game`.
//!
//! Every game response carries `remaining_secs` and `is_expired`, evaluated
//! at request time.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use hunt_core::error::CoreError;
use hunt_core::hunting::{validate_action, HuntAction};
use hunt_core::rollup::derive_deadline;
use hunt_core::tree::validate_reparent;
use hunt_core::types::DbId;
use hunt_db::models::game::{CreateGame, Game, GameView, UpdateGame};
use hunt_db::repositories::{ActionOutcome, GameCategoryRepo, GameRepo, SpeciesRepo};
use hunt_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::query::GameListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Game", id })
}

fn view(game: Game) -> GameView {
    GameView::at(game, Utc::now())
}

async fn load(pool: &DbPool, id: DbId) -> AppResult<Game> {
    GameRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Ensure the referenced category and parent game exist.
async fn ensure_references(
    pool: &DbPool,
    category_id: Option<DbId>,
    parent_game_id: Option<DbId>,
) -> AppResult<()> {
    if let Some(category_id) = category_id {
        GameCategoryRepo::find_by_id(pool, category_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "GameCategory",
                id: category_id,
            }))?;
    }
    if let Some(parent_id) = parent_game_id {
        load(pool, parent_id).await?;
    }
    Ok(())
}

/// Fields of a parent game that are derived from its children.
fn reject_derived_fields(input: &UpdateGame) -> Result<(), CoreError> {
    let derived = [
        ("estimated_hunting_secs", input.estimated_hunting_secs.is_some()),
        ("actual_hunting_secs", input.actual_hunting_secs.is_some()),
        ("status", input.status.is_some()),
    ];
    match derived.into_iter().find(|(_, set)| *set) {
        Some((field, _)) => Err(CoreError::InvalidField {
            field,
            message: format!("Cannot set {field} directly for a game with child games."),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/games
///
/// Filters: `species_id`, `category_id`, `genus_id`, `parent_game_id`,
/// `roots_only`, `status`, `is_active`, `date`, `from`, `to`.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<GameListParams>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let games: Vec<GameView> = GameRepo::list(&state.pool, &params.into())
        .await?
        .into_iter()
        .map(|game| GameView::at(game, now))
        .collect();
    Ok(Json(DataResponse { data: games }))
}

/// POST /api/v1/games
///
/// A game bound to a parent species is created together with one child
/// game per subspecies, recursively.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateGame>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let template = match input.species_id {
        Some(species_id) => Some(
            SpeciesRepo::find_by_id(&state.pool, species_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "Species",
                    id: species_id,
                }))?,
        ),
        None => None,
    };
    ensure_references(&state.pool, input.category_id, input.parent_game_id).await?;
    if let Some(start) = input.hunt_start_time {
        let estimate = input
            .estimated_hunting_secs
            .or(template.as_ref().map(|t| t.estimated_hunting_secs))
            .unwrap_or(0);
        derive_deadline(start, estimate)?;
    }

    let game = GameRepo::create(&state.pool, &input, template.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view(game) })))
}

/// GET /api/v1/games/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = load(&state.pool, id).await?;
    Ok(Json(DataResponse { data: view(game) }))
}

/// PUT /api/v1/games/{id}
///
/// Status, estimate and actual time are only writable on leaf games. A
/// HUNTING game set to anything but CAPTURED or ESCAPED lands in PENDING.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateGame>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let current = load(&state.pool, id).await?;
    if !current.is_leaf {
        reject_derived_fields(&input)?;
    }
    if let Some(start) = input.hunt_start_time {
        let estimate = input
            .estimated_hunting_secs
            .unwrap_or(current.estimated_hunting_secs);
        derive_deadline(start, estimate)?;
    }

    ensure_references(&state.pool, input.category_id, input.parent_game_id).await?;
    if let Some(parent_id) = input.parent_game_id {
        let subtree = GameRepo::subtree_ids(&state.pool, id).await?;
        validate_reparent("parent_game_id", parent_id, &subtree)?;
    }

    let game = GameRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: view(game) }))
}

/// DELETE /api/v1/games/{id}
///
/// Removes the game with its child games; the parent is re-aggregated.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !GameRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/games/{id}/children
pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load(&state.pool, id).await?;

    let now = Utc::now();
    let children: Vec<GameView> = GameRepo::list_children(&state.pool, id)
        .await?
        .into_iter()
        .map(|game| GameView::at(game, now))
        .collect();
    Ok(Json(DataResponse { data: children }))
}

/// GET /api/v1/active_game
pub async fn active(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let game = GameRepo::find_active(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No game is currently being hunted".into()))?;
    Ok(Json(DataResponse { data: view(game) }))
}

// ---------------------------------------------------------------------------
// Lifecycle actions
// ---------------------------------------------------------------------------

/// Validate and apply `action` to a leaf game.
///
/// The repository re-checks the precondition under a row lock: a game
/// deleted in between is 404, one changed by another request is 409.
async fn run_action(pool: &DbPool, id: DbId, action: HuntAction) -> AppResult<GameView> {
    let game = load(pool, id).await?;
    validate_action(action, game.status, game.is_leaf)?;

    let now = Utc::now();
    match GameRepo::apply_action(pool, id, action, now).await? {
        ActionOutcome::Applied(game) => Ok(GameView::at(game, now)),
        ActionOutcome::NotFound => Err(not_found(id)),
        ActionOutcome::Stale => Err(AppError::Core(CoreError::Conflict(format!(
            "Game {id} changed while the request was processed; reload and retry"
        )))),
    }
}

/// POST /api/v1/games/{id}/start_hunting
pub async fn start_hunting(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = run_action(&state.pool, id, HuntAction::Start).await?;
    Ok(Json(DataResponse { data: game }))
}

/// POST /api/v1/games/{id}/complete_hunting
pub async fn complete_hunting(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = run_action(&state.pool, id, HuntAction::Complete).await?;
    Ok(Json(DataResponse { data: game }))
}

/// POST /api/v1/games/{id}/escape_hunting
pub async fn escape_hunting(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = run_action(&state.pool, id, HuntAction::Escape).await?;
    Ok(Json(DataResponse { data: game }))
}

/// POST /api/v1/games/{id}/pause_hunting
pub async fn pause_hunting(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = run_action(&state.pool, id, HuntAction::Pause).await?;
    Ok(Json(DataResponse { data: game }))
}

/// POST /api/v1/games/{id}/resume_hunting
pub async fn resume_hunting(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let game = run_action(&state.pool, id, HuntAction::Resume).await?;
    Ok(Json(DataResponse { data: game }))
}
