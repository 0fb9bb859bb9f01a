//! Repository for the `genera` table.

use hunt_core::types::DbId;
use sqlx::PgPool;

use crate::models::genus::{CreateGenus, Genus, UpdateGenus};
use crate::repositories::SpeciesRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for genera.
pub struct GenusRepo;

impl GenusRepo {
    /// Insert a new genus, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateGenus) -> Result<Genus, sqlx::Error> {
        let query = format!(
            "INSERT INTO genera (name, description) \
             VALUES ($1, COALESCE($2, '')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Genus>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a genus by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Genus>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM genera WHERE id = $1");
        sqlx::query_as::<_, Genus>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all genera ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Genus>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM genera ORDER BY name, id");
        sqlx::query_as::<_, Genus>(&query).fetch_all(pool).await
    }

    /// Update a genus. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGenus,
    ) -> Result<Option<Genus>, sqlx::Error> {
        let query = format!(
            "UPDATE genera SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Genus>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a genus together with its species and their games.
    ///
    /// Runs in a transaction: the species subtrees are removed first so the
    /// surviving parents (species and games outside the genus) are
    /// re-aggregated before the genus row goes.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let species_ids: Vec<DbId> =
            sqlx::query_scalar("SELECT id FROM species WHERE genus_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        SpeciesRepo::delete_subtrees(&mut tx, &species_ids).await?;

        let result = sqlx::query("DELETE FROM genera WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
