//! Game entity model and DTOs.
//!
//! A game is one tracked occurrence of a hunt. Games form a tree through
//! `parent_game_id`; derived columns (`is_leaf`, `is_active`, parent status
//! and time sums, `deadline`) are maintained by
//! [`GameRepo`](crate::repositories::GameRepo) on every write.

use hunt_core::hunting::GameStatus;
use hunt_core::rollup::{is_expired, remaining_secs, ChildGame, GameState};
use hunt_core::types::{DbId, Seconds, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `games` table joined with its species title.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Game {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub species_id: Option<DbId>,
    pub species_title: Option<String>,
    pub category_id: Option<DbId>,
    pub parent_game_id: Option<DbId>,
    pub hunt_start_time: Timestamp,
    pub estimated_hunting_secs: Seconds,
    pub actual_hunting_secs: Option<Seconds>,
    #[sqlx(try_from = "String")]
    pub status: GameStatus,
    pub priority: i32,
    pub is_active: bool,
    pub is_leaf: bool,
    pub deadline: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Game {
    /// The derived columns as seen by the roll-up rules.
    pub fn state(&self) -> GameState {
        GameState {
            status: self.status,
            is_leaf: self.is_leaf,
            is_active: self.is_active,
            estimated_hunting_secs: self.estimated_hunting_secs,
            actual_hunting_secs: self.actual_hunting_secs,
            hunt_start_time: self.hunt_start_time,
            deadline: self.deadline,
        }
    }
}

/// Child columns read while aggregating a parent game.
#[derive(Debug, Clone, FromRow)]
pub struct GameChildRow {
    #[sqlx(try_from = "String")]
    pub status: GameStatus,
    pub estimated_hunting_secs: Seconds,
    pub actual_hunting_secs: Option<Seconds>,
}

impl From<GameChildRow> for ChildGame {
    fn from(row: GameChildRow) -> Self {
        ChildGame {
            status: row.status,
            estimated_hunting_secs: row.estimated_hunting_secs,
            actual_hunting_secs: row.actual_hunting_secs,
        }
    }
}

/// API representation of a game with its time-relative fields.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: Game,
    pub remaining_secs: Option<Seconds>,
    pub is_expired: bool,
}

impl GameView {
    /// Evaluate the time-relative fields against `now`.
    pub fn at(game: Game, now: Timestamp) -> Self {
        let remaining_secs = remaining_secs(game.deadline, now);
        let is_expired = is_expired(game.deadline, now);
        Self {
            game,
            remaining_secs,
            is_expired,
        }
    }
}

/// DTO for creating a new game.
///
/// When `species_id` is set, missing presentation fields and the estimate
/// are copied from the species, and a non-leaf species materializes one
/// child game per subspecies.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateGame {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub species_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub parent_game_id: Option<DbId>,
    pub hunt_start_time: Option<Timestamp>,
    #[validate(range(min = 0, max = 315_360_000))]
    pub estimated_hunting_secs: Option<Seconds>,
    #[validate(range(min = 1))]
    pub priority: Option<i32>,
    pub status: Option<GameStatus>,
    pub deadline: Option<Timestamp>,
}

/// DTO for updating an existing game. All fields optional.
///
/// `status` passes through
/// [`resolve_requested_status`](hunt_core::hunting::resolve_requested_status);
/// time estimates are only accepted for leaf games.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGame {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<DbId>,
    pub parent_game_id: Option<DbId>,
    pub hunt_start_time: Option<Timestamp>,
    #[validate(range(min = 0, max = 315_360_000))]
    pub estimated_hunting_secs: Option<Seconds>,
    #[validate(range(min = 0, max = 315_360_000))]
    pub actual_hunting_secs: Option<Seconds>,
    #[validate(range(min = 1))]
    pub priority: Option<i32>,
    pub status: Option<GameStatus>,
    pub deadline: Option<Timestamp>,
}

/// Optional filters for game listings.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub species_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub genus_id: Option<DbId>,
    pub parent_game_id: Option<DbId>,
    pub roots_only: bool,
    pub status: Option<GameStatus>,
    pub is_active: Option<bool>,
    /// Inclusive lower bound on `hunt_start_time`.
    pub from: Option<Timestamp>,
    /// Exclusive upper bound on `hunt_start_time`.
    pub to: Option<Timestamp>,
}
