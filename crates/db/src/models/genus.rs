//! Genus entity model and DTOs.

use hunt_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `genera` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Genus {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new genus.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGenus {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating an existing genus. All fields optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateGenus {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}
