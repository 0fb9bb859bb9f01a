//! Handlers for the `/species` resource.
//!
//! Species form a template tree. A parent's estimate is derived from its
//! subspecies, so only leaf species accept an explicit
//! `estimated_hunting_secs`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use hunt_core::error::CoreError;
use hunt_core::tree::validate_reparent;
use hunt_core::types::DbId;
use hunt_db::models::game::GameView;
use hunt_db::models::species::{CreateSpecies, UpdateSpecies};
use hunt_db::repositories::{GameRepo, GenusRepo, SpeciesRepo};
use hunt_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::query::SpeciesListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Species",
        id,
    })
}

/// Ensure the referenced genus and parent species exist.
async fn ensure_references(
    pool: &DbPool,
    genus_id: Option<DbId>,
    parent_species_id: Option<DbId>,
) -> AppResult<()> {
    if let Some(genus_id) = genus_id {
        GenusRepo::find_by_id(pool, genus_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Genus",
                id: genus_id,
            }))?;
    }
    if let Some(parent_id) = parent_species_id {
        SpeciesRepo::find_by_id(pool, parent_id)
            .await?
            .ok_or_else(|| not_found(parent_id))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/species?genus_id=&parent_species_id=&roots_only=
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SpeciesListParams>,
) -> AppResult<impl IntoResponse> {
    let species = SpeciesRepo::list(&state.pool, &params.into()).await?;
    Ok(Json(DataResponse { data: species }))
}

/// POST /api/v1/species
///
/// New species are leaves; the parent (if any) is re-aggregated.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateSpecies>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ensure_references(&state.pool, input.genus_id, input.parent_species_id).await?;

    let species = SpeciesRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: species })))
}

/// GET /api/v1/species/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let species = SpeciesRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: species }))
}

/// PUT /api/v1/species/{id}
///
/// Rejects an explicit estimate on a parent species and moves that would
/// create a cycle.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSpecies>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let current = SpeciesRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if input.estimated_hunting_secs.is_some() && !current.is_leaf {
        return Err(CoreError::InvalidField {
            field: "estimated_hunting_secs",
            message: "Cannot set hunting time directly for parent species.".into(),
        }
        .into());
    }

    ensure_references(&state.pool, input.genus_id, input.parent_species_id).await?;
    if let Some(parent_id) = input.parent_species_id {
        let subtree = SpeciesRepo::subtree_ids(&state.pool, id).await?;
        validate_reparent("parent_species_id", parent_id, &subtree)?;
    }

    let species = SpeciesRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: species }))
}

/// DELETE /api/v1/species/{id}
///
/// Removes the species subtree and every game instantiated from it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !SpeciesRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/species/{id}/subspecies
pub async fn list_subspecies(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    SpeciesRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let subspecies = SpeciesRepo::list_subspecies(&state.pool, id).await?;
    Ok(Json(DataResponse { data: subspecies }))
}

/// GET /api/v1/species/{id}/games
pub async fn list_games(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    SpeciesRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let now = Utc::now();
    let games: Vec<GameView> = GameRepo::list_by_species(&state.pool, id)
        .await?
        .into_iter()
        .map(|game| GameView::at(game, now))
        .collect();
    Ok(Json(DataResponse { data: games }))
}
