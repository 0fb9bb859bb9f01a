//! Repository for the `games` table.
//!
//! Every write runs in one transaction that also:
//! - recomputes the written game and its ancestors bottom-up
//!   ([`rollup_game`]), one ancestor chain fetched up front;
//! - deactivates any other active game when the written game becomes the
//!   active hunt, and re-aggregates the parents of the games it displaced.
//!
//! The partial unique index `uq_games_single_active` backs the single active
//! game rule: a concurrent activation fails instead of committing.

use std::collections::HashMap;

use chrono::Utc;
use hunt_core::hunting::{resolve_requested_status, GameStatus, HuntAction};
use hunt_core::rollup::{derive_deadline, elapsed_secs, rollup_game, ChildGame, GameState};
use hunt_core::tree::{descendants_top_down, TemplateNode, MAX_TREE_DEPTH};
use hunt_core::types::{DbId, Seconds, Timestamp};
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};

use crate::models::game::{CreateGame, Game, GameChildRow, GameFilter, UpdateGame};
use crate::models::species::Species;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "g.id, g.title, g.description, g.species_id, s.title AS species_title, \
    g.category_id, g.parent_game_id, g.hunt_start_time, g.estimated_hunting_secs, \
    g.actual_hunting_secs, g.status, g.priority, g.is_active, g.is_leaf, g.deadline, \
    g.created_at, g.updated_at";

/// Games joined with their species title.
const FROM: &str = "games g LEFT JOIN species s ON s.id = g.species_id";

/// The node itself followed by its ancestors, nearest first.
const CHAIN_SQL: &str = "WITH RECURSIVE chain AS ( \
        SELECT id, parent_game_id, 0 AS depth FROM games WHERE id = $1 \
        UNION ALL \
        SELECT g.id, g.parent_game_id, c.depth + 1 \
        FROM games g JOIN chain c ON g.id = c.parent_game_id \
        WHERE c.depth < $2 \
    ) \
    SELECT id FROM chain ORDER BY depth";

/// A species template row used when materializing a game tree.
#[derive(Debug, Clone, FromRow)]
struct TemplateRow {
    id: DbId,
    parent_species_id: Option<DbId>,
    title: String,
    description: String,
    priority: i32,
    estimated_hunting_secs: Seconds,
    is_leaf: bool,
}

/// Column values for a freshly inserted game.
struct NewGame<'a> {
    title: &'a str,
    description: &'a str,
    species_id: Option<DbId>,
    category_id: Option<DbId>,
    parent_game_id: Option<DbId>,
    hunt_start_time: Timestamp,
    estimated_hunting_secs: Seconds,
    priority: i32,
    status: GameStatus,
    is_leaf: bool,
    deadline: Option<Timestamp>,
}

/// Outcome of recomputing a single game.
#[derive(Debug, Default)]
struct Refresh {
    changed: bool,
    /// Parents of games that lost their active flag to this one.
    displaced_parents: Vec<DbId>,
}

/// Result of [`GameRepo::apply_action`].
#[derive(Debug)]
pub enum ActionOutcome {
    Applied(Game),
    /// The game no longer exists.
    NotFound,
    /// The game is no longer a leaf in the action's required status.
    Stale,
}

/// Provides CRUD operations, lifecycle actions and tree maintenance for games.
pub struct GameRepo;

impl GameRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find a game by its ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Game>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE g.id = $1");
        sqlx::query_as::<_, Game>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List games matching every set filter.
    ///
    /// Ordered by start time, then priority (1 first).
    pub async fn list(pool: &PgPool, filter: &GameFilter) -> Result<Vec<Game>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} \
             WHERE ($1::BIGINT IS NULL OR g.species_id = $1) \
               AND ($2::BIGINT IS NULL OR g.category_id = $2) \
               AND ($3::BIGINT IS NULL OR s.genus_id = $3) \
               AND ($4::BIGINT IS NULL OR g.parent_game_id = $4) \
               AND (NOT $5 OR g.parent_game_id IS NULL) \
               AND ($6::TEXT IS NULL OR g.status = $6) \
               AND ($7::BOOL IS NULL OR g.is_active = $7) \
               AND ($8::TIMESTAMPTZ IS NULL OR g.hunt_start_time >= $8) \
               AND ($9::TIMESTAMPTZ IS NULL OR g.hunt_start_time < $9) \
             ORDER BY g.hunt_start_time, g.priority, g.id"
        );
        sqlx::query_as::<_, Game>(&query)
            .bind(filter.species_id)
            .bind(filter.category_id)
            .bind(filter.genus_id)
            .bind(filter.parent_game_id)
            .bind(filter.roots_only)
            .bind(filter.status.map(GameStatus::as_str))
            .bind(filter.is_active)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(pool)
            .await
    }

    /// Direct child games of a game.
    pub async fn list_children(pool: &PgPool, id: DbId) -> Result<Vec<Game>, sqlx::Error> {
        let filter = GameFilter {
            parent_game_id: Some(id),
            ..GameFilter::default()
        };
        Self::list(pool, &filter).await
    }

    /// Games instantiated from a species.
    pub async fn list_by_species(pool: &PgPool, species_id: DbId) -> Result<Vec<Game>, sqlx::Error> {
        let filter = GameFilter {
            species_id: Some(species_id),
            ..GameFilter::default()
        };
        Self::list(pool, &filter).await
    }

    /// The leaf game currently being hunted, if any.
    pub async fn find_active(pool: &PgPool) -> Result<Option<Game>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE g.is_active AND g.is_leaf");
        sqlx::query_as::<_, Game>(&query).fetch_optional(pool).await
    }

    /// IDs of a game and all of its descendants.
    pub async fn subtree_ids<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "WITH RECURSIVE sub AS ( \
                SELECT id, 0 AS depth FROM games WHERE id = $1 \
                UNION ALL \
                SELECT g.id, sub.depth + 1 \
                FROM games g JOIN sub ON g.parent_game_id = sub.id \
                WHERE sub.depth < $2 \
             ) \
             SELECT id FROM sub",
        )
        .bind(id)
        .bind(MAX_TREE_DEPTH)
        .fetch_all(executor)
        .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new game, materializing the species subtree when `template`
    /// is a non-leaf species.
    ///
    /// Missing title, description, priority and estimate fall back to the
    /// template's values. Every materialized child starts NOT_STARTED at the
    /// root's `hunt_start_time`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGame,
        template: Option<&Species>,
    ) -> Result<Game, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let hunt_start_time = input.hunt_start_time.unwrap_or_else(Utc::now);
        let title = input
            .title
            .as_deref()
            .or(template.map(|t| t.title.as_str()))
            .unwrap_or_default();
        let description = input
            .description
            .as_deref()
            .or(template.map(|t| t.description.as_str()))
            .unwrap_or_default();

        let new_game = NewGame {
            title,
            description,
            species_id: template.map(|t| t.id),
            category_id: input.category_id,
            parent_game_id: input.parent_game_id,
            hunt_start_time,
            estimated_hunting_secs: input
                .estimated_hunting_secs
                .or(template.map(|t| t.estimated_hunting_secs))
                .unwrap_or(0),
            priority: input
                .priority
                .or(template.map(|t| t.priority))
                .unwrap_or(1),
            status: input.status.unwrap_or_default(),
            is_leaf: true,
            deadline: input.deadline,
        };
        let id = Self::insert(&mut tx, &new_game).await?;

        if let Some(species) = template.filter(|t| !t.is_leaf) {
            Self::instantiate_subtree(&mut tx, id, species.id, hunt_start_time).await?;
        }

        Self::propagate(&mut tx, id).await?;

        let game = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        tracing::info!(
            game_id = id,
            species_id = ?game.species_id,
            parent_game_id = ?game.parent_game_id,
            is_leaf = game.is_leaf,
            "Game created"
        );
        Ok(game)
    }

    /// Update a game. Only non-`None` fields are applied.
    ///
    /// A requested status goes through [`resolve_requested_status`]. The game
    /// and its ancestors are re-aggregated; a move to a new parent refreshes
    /// the former parent chain too. Returns `None` if the game does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGame,
    ) -> Result<Option<Game>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(current) = Self::lock(&mut tx, id).await? else {
            return Ok(None);
        };

        let status = input
            .status
            .map(|requested| resolve_requested_status(current.status, requested));
        if let (Some(requested), Some(resolved)) = (input.status, status) {
            if requested != resolved {
                tracing::info!(
                    game_id = id,
                    %requested,
                    %resolved,
                    "Interrupted hunt parked as pending"
                );
            }
        }

        sqlx::query(
            "UPDATE games SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                category_id = COALESCE($4, category_id), \
                parent_game_id = COALESCE($5, parent_game_id), \
                hunt_start_time = COALESCE($6, hunt_start_time), \
                estimated_hunting_secs = COALESCE($7, estimated_hunting_secs), \
                actual_hunting_secs = COALESCE($8, actual_hunting_secs), \
                priority = COALESCE($9, priority), \
                status = COALESCE($10, status), \
                is_active = is_active AND COALESCE($10, status) = 'HUNTING', \
                deadline = COALESCE($11, deadline) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.parent_game_id)
        .bind(input.hunt_start_time)
        .bind(input.estimated_hunting_secs)
        .bind(input.actual_hunting_secs)
        .bind(input.priority)
        .bind(status.map(GameStatus::as_str))
        .bind(input.deadline)
        .execute(&mut *tx)
        .await?;

        Self::propagate(&mut tx, id).await?;

        let moved = input.parent_game_id.is_some() && input.parent_game_id != current.parent_game_id;
        if let (true, Some(old_parent)) = (moved, current.parent_game_id) {
            tracing::info!(game_id = id, old_parent, new_parent = ?input.parent_game_id, "Game re-parented");
            Self::propagate(&mut tx, old_parent).await?;
        }

        let game = Self::find_by_id(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(game)
    }

    /// Apply an explicit lifecycle action at `now`.
    ///
    /// The precondition (leaf, in the required status) is checked once the
    /// row is locked.
    pub async fn apply_action(
        pool: &PgPool,
        id: DbId,
        action: HuntAction,
        now: Timestamp,
    ) -> Result<ActionOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(current) = Self::lock(&mut tx, id).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if !current.is_leaf || current.status != action.required_status() {
            return Ok(ActionOutcome::Stale);
        }

        let target = action.target_status();
        let hunt_start_time = if action == HuntAction::Start {
            now
        } else {
            current.hunt_start_time
        };
        let actual_hunting_secs = if action.records_actual_time() {
            Some(elapsed_secs(current.hunt_start_time, now))
        } else {
            current.actual_hunting_secs
        };

        sqlx::query(
            "UPDATE games SET \
                status = $2, \
                is_active = is_active AND $2 = 'HUNTING', \
                hunt_start_time = $3, \
                actual_hunting_secs = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(target.as_str())
        .bind(hunt_start_time)
        .bind(actual_hunting_secs)
        .execute(&mut *tx)
        .await?;

        Self::propagate(&mut tx, id).await?;

        let game = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        tracing::info!(
            game_id = id,
            from = %current.status,
            to = %target,
            ?actual_hunting_secs,
            "Game status changed"
        );
        Ok(ActionOutcome::Applied(game))
    }

    /// Delete a game and its subtree, then refresh the surviving parent.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let parent: Option<Option<DbId>> =
            sqlx::query_scalar("DELETE FROM games WHERE id = $1 RETURNING parent_game_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(parent) = parent else {
            return Ok(false);
        };

        if let Some(parent_id) = parent {
            Self::propagate(&mut tx, parent_id).await?;
        }

        tx.commit().await?;
        tracing::info!(game_id = id, parent_game_id = ?parent, "Game deleted");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Tree maintenance
    // -----------------------------------------------------------------------

    /// Parents of games that will disappear with the given species, limited
    /// to parents that themselves survive.
    pub(crate) async fn parents_outside_species(
        conn: &mut PgConnection,
        species_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "WITH RECURSIVE doomed AS ( \
                SELECT id, parent_game_id FROM games WHERE species_id = ANY($1) \
                UNION \
                SELECT g.id, g.parent_game_id FROM games g JOIN doomed d ON g.parent_game_id = d.id \
             ) \
             SELECT DISTINCT parent_game_id FROM doomed \
             WHERE parent_game_id IS NOT NULL \
               AND parent_game_id NOT IN (SELECT id FROM doomed)",
        )
        .bind(species_ids)
        .fetch_all(&mut *conn)
        .await
    }

    /// Recompute `start_id` and each of its ancestors, nearest first.
    ///
    /// Parents of games displaced from the active slot are queued and walked
    /// the same way. An ancestor whose derived columns did not change ends
    /// its chain early.
    pub(crate) async fn propagate(conn: &mut PgConnection, start_id: DbId) -> Result<(), sqlx::Error> {
        let mut pending = vec![start_id];

        while let Some(node_id) = pending.pop() {
            let chain: Vec<DbId> = sqlx::query_scalar(CHAIN_SQL)
                .bind(node_id)
                .bind(MAX_TREE_DEPTH)
                .fetch_all(&mut *conn)
                .await?;

            for (depth, id) in chain.into_iter().enumerate() {
                let refresh = Self::refresh(&mut *conn, id).await?;
                pending.extend(refresh.displaced_parents);
                if depth > 0 && !refresh.changed {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Recompute one game's derived columns from its direct children.
    async fn refresh(conn: &mut PgConnection, id: DbId) -> Result<Refresh, sqlx::Error> {
        let Some(game) = Self::lock(&mut *conn, id).await? else {
            return Ok(Refresh::default());
        };

        let children: Vec<ChildGame> = sqlx::query_as::<_, GameChildRow>(
            "SELECT status, estimated_hunting_secs, actual_hunting_secs \
             FROM games WHERE parent_game_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ChildGame::from)
        .collect();

        let current = game.state();
        let next = rollup_game(&current, &children);

        let displaced_parents = if next.is_active {
            Self::deactivate_others(&mut *conn, id).await?
        } else {
            Vec::new()
        };

        let changed = next != current;
        if changed {
            Self::write_state(&mut *conn, id, &next).await?;
            tracing::debug!(
                game_id = id,
                status = %next.status,
                is_leaf = next.is_leaf,
                is_active = next.is_active,
                estimated_hunting_secs = next.estimated_hunting_secs,
                "Game aggregate refreshed"
            );
        }

        Ok(Refresh {
            changed,
            displaced_parents,
        })
    }

    /// Park every other active game as PENDING, returning their parents.
    async fn deactivate_others(
        conn: &mut PgConnection,
        active_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let displaced: Vec<(DbId, Option<DbId>)> = sqlx::query_as(
            "UPDATE games SET is_active = false, status = 'PENDING' \
             WHERE is_active AND id <> $1 \
             RETURNING id, parent_game_id",
        )
        .bind(active_id)
        .fetch_all(&mut *conn)
        .await?;

        for (game_id, _) in &displaced {
            tracing::info!(game_id, active_game_id = active_id, "Active game displaced");
        }
        Ok(displaced.into_iter().filter_map(|(_, parent)| parent).collect())
    }

    async fn write_state(
        conn: &mut PgConnection,
        id: DbId,
        state: &GameState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE games SET \
                status = $2, \
                is_leaf = $3, \
                is_active = $4, \
                estimated_hunting_secs = $5, \
                actual_hunting_secs = $6, \
                deadline = $7 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(state.status.as_str())
        .bind(state.is_leaf)
        .bind(state.is_active)
        .bind(state.estimated_hunting_secs)
        .bind(state.actual_hunting_secs)
        .bind(state.deadline)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Read a game with its row locked for the rest of the transaction.
    async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Option<Game>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE g.id = $1 FOR UPDATE OF g");
        sqlx::query_as::<_, Game>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn insert(conn: &mut PgConnection, game: &NewGame<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO games \
                (title, description, species_id, category_id, parent_game_id, \
                 hunt_start_time, estimated_hunting_secs, priority, status, is_leaf, deadline) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id",
        )
        .bind(game.title)
        .bind(game.description)
        .bind(game.species_id)
        .bind(game.category_id)
        .bind(game.parent_game_id)
        .bind(game.hunt_start_time)
        .bind(game.estimated_hunting_secs)
        .bind(game.priority)
        .bind(game.status.as_str())
        .bind(game.is_leaf)
        .bind(game.deadline)
        .fetch_one(&mut *conn)
        .await
    }

    /// Insert one child game per descendant of `species_id`, top-down, under
    /// the game `root_game_id`.
    async fn instantiate_subtree(
        conn: &mut PgConnection,
        root_game_id: DbId,
        species_id: DbId,
        hunt_start_time: Timestamp,
    ) -> Result<(), sqlx::Error> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "WITH RECURSIVE sub AS ( \
                SELECT id, 0 AS depth FROM species WHERE id = $1 \
                UNION ALL \
                SELECT s.id, sub.depth + 1 \
                FROM species s JOIN sub ON s.parent_species_id = sub.id \
                WHERE sub.depth < $2 \
             ) \
             SELECT sp.id, sp.parent_species_id, sp.title, sp.description, sp.priority, \
                    sp.estimated_hunting_secs, sp.is_leaf \
             FROM sub JOIN species sp ON sp.id = sub.id \
             ORDER BY sp.priority, sp.id",
        )
        .bind(species_id)
        .bind(MAX_TREE_DEPTH)
        .fetch_all(&mut *conn)
        .await?;

        let nodes: Vec<TemplateNode> = rows
            .iter()
            .map(|row| TemplateNode {
                id: row.id,
                parent_id: row.parent_species_id,
            })
            .collect();
        let templates: HashMap<DbId, &TemplateRow> = rows.iter().map(|row| (row.id, row)).collect();

        let mut game_for_species: HashMap<DbId, DbId> = HashMap::from([(species_id, root_game_id)]);
        for node in descendants_top_down(species_id, &nodes) {
            let (Some(template), Some(parent_species_id)) = (templates.get(&node.id), node.parent_id)
            else {
                continue;
            };
            let Some(&parent_game_id) = game_for_species.get(&parent_species_id) else {
                continue;
            };

            let child = NewGame {
                title: &template.title,
                description: &template.description,
                species_id: Some(template.id),
                category_id: None,
                parent_game_id: Some(parent_game_id),
                hunt_start_time,
                estimated_hunting_secs: template.estimated_hunting_secs,
                priority: template.priority,
                status: GameStatus::NotStarted,
                is_leaf: template.is_leaf,
                deadline: derive_deadline(hunt_start_time, template.estimated_hunting_secs).ok(),
            };
            let game_id = Self::insert(&mut *conn, &child).await?;
            game_for_species.insert(template.id, game_id);
        }

        tracing::debug!(
            root_game_id,
            species_id,
            created = game_for_species.len() - 1,
            "Game tree materialized from species"
        );
        Ok(())
    }
}
