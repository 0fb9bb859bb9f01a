//! Handlers for the `/genera` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hunt_core::error::CoreError;
use hunt_core::types::DbId;
use hunt_db::models::genus::{CreateGenus, UpdateGenus};
use hunt_db::repositories::{GenusRepo, SpeciesRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Genus", id })
}

/// GET /api/v1/genera
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let genera = GenusRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: genera }))
}

/// POST /api/v1/genera
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateGenus>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let genus = GenusRepo::create(&state.pool, &input).await?;
    tracing::info!(genus_id = genus.id, name = %genus.name, "Genus created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: genus })))
}

/// GET /api/v1/genera/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let genus = GenusRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: genus }))
}

/// PUT /api/v1/genera/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateGenus>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let genus = GenusRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: genus }))
}

/// DELETE /api/v1/genera/{id}
///
/// Removes the genus with all of its species and the games bound to them.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !GenusRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(genus_id = id, "Genus deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/genera/{id}/species
pub async fn list_species(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    GenusRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let species = SpeciesRepo::list_by_genus(&state.pool, id).await?;
    Ok(Json(DataResponse { data: species }))
}
