//! Repository for the `species` table.
//!
//! Every write recomputes the aggregate columns (`is_leaf`,
//! `estimated_hunting_secs`) of the touched species and its ancestors in the
//! same transaction. The ancestor chain is fetched once and walked
//! nearest-first, so each level reads the freshly written level below.

use hunt_core::rollup::rollup_species;
use hunt_core::tree::MAX_TREE_DEPTH;
use hunt_core::types::{DbId, Seconds};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::species::{CreateSpecies, Species, SpeciesFilter, UpdateSpecies};
use crate::repositories::GameRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "s.id, s.title, s.description, s.genus_id, gn.name AS genus_name, \
    s.parent_species_id, s.priority, s.estimated_hunting_secs, s.is_leaf, \
    s.created_at, s.updated_at";

/// Species joined with the genus name.
const FROM: &str = "species s LEFT JOIN genera gn ON gn.id = s.genus_id";

/// The node itself followed by its ancestors, nearest first.
const CHAIN_SQL: &str = "WITH RECURSIVE chain AS ( \
        SELECT id, parent_species_id, 0 AS depth FROM species WHERE id = $1 \
        UNION ALL \
        SELECT s.id, s.parent_species_id, c.depth + 1 \
        FROM species s JOIN chain c ON s.id = c.parent_species_id \
        WHERE c.depth < $2 \
    ) \
    SELECT id FROM chain ORDER BY depth";

/// Every node in the subtrees rooted at the given ids, roots included.
const SUBTREE_SQL: &str = "WITH RECURSIVE sub AS ( \
        SELECT id, 0 AS depth FROM species WHERE id = ANY($1) \
        UNION ALL \
        SELECT s.id, sub.depth + 1 \
        FROM species s JOIN sub ON s.parent_species_id = sub.id \
        WHERE sub.depth < $2 \
    ) \
    SELECT DISTINCT id FROM sub";

/// Provides CRUD operations and aggregate maintenance for species.
pub struct SpeciesRepo;

impl SpeciesRepo {
    /// Insert a new species as a leaf, then refresh its ancestors.
    pub async fn create(pool: &PgPool, input: &CreateSpecies) -> Result<Species, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO species \
                (title, description, genus_id, parent_species_id, priority, \
                 estimated_hunting_secs, is_leaf) \
             VALUES ($1, COALESCE($2, ''), $3, $4, COALESCE($5, 1), COALESCE($6, 0), true) \
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.genus_id)
        .bind(input.parent_species_id)
        .bind(input.priority)
        .bind(input.estimated_hunting_secs)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(parent_id) = input.parent_species_id {
            Self::propagate(&mut tx, parent_id).await?;
        }

        let species = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        tracing::info!(species_id = id, parent_species_id = ?input.parent_species_id, "Species created");
        Ok(species)
    }

    /// Find a species by its ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Species>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE s.id = $1");
        sqlx::query_as::<_, Species>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List species with optional genus / parent filters.
    ///
    /// Ordered by priority (1 first), then title.
    pub async fn list(pool: &PgPool, filter: &SpeciesFilter) -> Result<Vec<Species>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} \
             WHERE ($1::BIGINT IS NULL OR s.genus_id = $1) \
               AND ($2::BIGINT IS NULL OR s.parent_species_id = $2) \
               AND (NOT $3 OR s.parent_species_id IS NULL) \
             ORDER BY s.priority, s.title, s.id"
        );
        sqlx::query_as::<_, Species>(&query)
            .bind(filter.genus_id)
            .bind(filter.parent_species_id)
            .bind(filter.roots_only)
            .fetch_all(pool)
            .await
    }

    /// Direct subspecies of a species.
    pub async fn list_subspecies(pool: &PgPool, id: DbId) -> Result<Vec<Species>, sqlx::Error> {
        let filter = SpeciesFilter {
            parent_species_id: Some(id),
            ..SpeciesFilter::default()
        };
        Self::list(pool, &filter).await
    }

    /// All species belonging to a genus.
    pub async fn list_by_genus(pool: &PgPool, genus_id: DbId) -> Result<Vec<Species>, sqlx::Error> {
        let filter = SpeciesFilter {
            genus_id: Some(genus_id),
            ..SpeciesFilter::default()
        };
        Self::list(pool, &filter).await
    }

    /// IDs of a species and all of its descendants.
    pub async fn subtree_ids<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(SUBTREE_SQL)
            .bind(&[id][..])
            .bind(MAX_TREE_DEPTH)
            .fetch_all(executor)
            .await
    }

    /// Update a species. Only non-`None` fields are applied.
    ///
    /// Refreshes the species and its ancestors; when the species moved to a
    /// new parent, the former parent chain is refreshed as well. Returns
    /// `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSpecies,
    ) -> Result<Option<Species>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous_parent: Option<Option<DbId>> =
            sqlx::query_scalar("SELECT parent_species_id FROM species WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous_parent) = previous_parent else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE species SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                genus_id = COALESCE($4, genus_id), \
                parent_species_id = COALESCE($5, parent_species_id), \
                priority = COALESCE($6, priority), \
                estimated_hunting_secs = COALESCE($7, estimated_hunting_secs) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.genus_id)
        .bind(input.parent_species_id)
        .bind(input.priority)
        .bind(input.estimated_hunting_secs)
        .execute(&mut *tx)
        .await?;

        Self::propagate(&mut tx, id).await?;

        let moved = input.parent_species_id.is_some() && input.parent_species_id != previous_parent;
        if let (true, Some(old_parent)) = (moved, previous_parent) {
            tracing::info!(species_id = id, old_parent, new_parent = ?input.parent_species_id, "Species re-parented");
            Self::propagate(&mut tx, old_parent).await?;
        }

        let species = Self::find_by_id(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(species)
    }

    /// Delete a species and its subtree, then refresh the surviving parent.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let deleted = Self::delete_subtrees(&mut tx, &[id]).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Delete the subtrees rooted at `root_ids` inside an open transaction.
    ///
    /// Games bound to any removed species go with them (including their own
    /// child games). Afterwards the species parents and game parents that
    /// survive are re-aggregated. Returns the number of species removed.
    pub(crate) async fn delete_subtrees(
        conn: &mut PgConnection,
        root_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if root_ids.is_empty() {
            return Ok(0);
        }

        let doomed: Vec<DbId> = sqlx::query_scalar(SUBTREE_SQL)
            .bind(root_ids)
            .bind(MAX_TREE_DEPTH)
            .fetch_all(&mut *conn)
            .await?;
        if doomed.is_empty() {
            return Ok(0);
        }

        let surviving_parents: Vec<DbId> = sqlx::query_scalar(
            "SELECT DISTINCT parent_species_id FROM species \
             WHERE id = ANY($1) \
               AND parent_species_id IS NOT NULL \
               AND NOT (parent_species_id = ANY($1))",
        )
        .bind(&doomed)
        .fetch_all(&mut *conn)
        .await?;

        let game_parents = GameRepo::parents_outside_species(&mut *conn, &doomed).await?;

        let result = sqlx::query("DELETE FROM species WHERE id = ANY($1)")
            .bind(&doomed)
            .execute(&mut *conn)
            .await?;

        for parent_id in surviving_parents {
            Self::propagate(&mut *conn, parent_id).await?;
        }
        for game_id in game_parents {
            GameRepo::propagate(&mut *conn, game_id).await?;
        }

        tracing::info!(
            removed = result.rows_affected(),
            roots = ?root_ids,
            "Species subtrees deleted"
        );
        Ok(result.rows_affected())
    }

    /// Recompute `start_id` and each of its ancestors, nearest first.
    ///
    /// The walk stops early once an ancestor's aggregate is unchanged, since
    /// everything above it would be recomputed from identical inputs.
    async fn propagate(conn: &mut PgConnection, start_id: DbId) -> Result<(), sqlx::Error> {
        let chain: Vec<DbId> = sqlx::query_scalar(CHAIN_SQL)
            .bind(start_id)
            .bind(MAX_TREE_DEPTH)
            .fetch_all(&mut *conn)
            .await?;

        for id in chain {
            let current: Option<(Seconds, bool)> = sqlx::query_as(
                "SELECT estimated_hunting_secs, is_leaf FROM species WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            let Some((own_secs, was_leaf)) = current else {
                continue;
            };

            let children_secs: Vec<Seconds> = sqlx::query_scalar(
                "SELECT estimated_hunting_secs FROM species WHERE parent_species_id = $1",
            )
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

            let next = rollup_species(own_secs, &children_secs);
            let unchanged = next.is_leaf == was_leaf && next.estimated_hunting_secs == own_secs;
            if unchanged {
                if id != start_id {
                    break;
                }
                continue;
            }

            sqlx::query(
                "UPDATE species SET is_leaf = $2, estimated_hunting_secs = $3 WHERE id = $1",
            )
            .bind(id)
            .bind(next.is_leaf)
            .bind(next.estimated_hunting_secs)
            .execute(&mut *conn)
            .await?;

            tracing::debug!(
                species_id = id,
                is_leaf = next.is_leaf,
                estimated_hunting_secs = next.estimated_hunting_secs,
                "Species aggregate refreshed"
            );
        }
        Ok(())
    }
}
