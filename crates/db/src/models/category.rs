//! Game category model and DTOs.
//!
//! Categories label standalone games that are not instantiated from a
//! species template.

use hunt_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `game_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GameCategory {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGameCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating an existing category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateGameCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}
