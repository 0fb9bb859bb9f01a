//! Repository for the `game_categories` table.

use hunt_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::{CreateGameCategory, GameCategory, UpdateGameCategory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for game categories.
pub struct GameCategoryRepo;

impl GameCategoryRepo {
    /// Insert a new category, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGameCategory,
    ) -> Result<GameCategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO game_categories (name, description) \
             VALUES ($1, COALESCE($2, '')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GameCategory>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a category by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GameCategory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM game_categories WHERE id = $1");
        sqlx::query_as::<_, GameCategory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all categories ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<GameCategory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM game_categories ORDER BY name, id");
        sqlx::query_as::<_, GameCategory>(&query).fetch_all(pool).await
    }

    /// Update a category. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGameCategory,
    ) -> Result<Option<GameCategory>, sqlx::Error> {
        let query = format!(
            "UPDATE game_categories SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GameCategory>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a category. Games keep existing with their category cleared.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM game_categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
