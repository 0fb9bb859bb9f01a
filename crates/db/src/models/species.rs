//! Species entity model and DTOs.
//!
//! A species is a reusable hunt template. Leaf species carry their own
//! estimate; a parent's estimate is the sum of its subspecies and is
//! maintained by [`SpeciesRepo`](crate::repositories::SpeciesRepo).

use hunt_core::types::{DbId, Seconds, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `species` table joined with its genus name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Species {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub genus_id: Option<DbId>,
    pub genus_name: Option<String>,
    pub parent_species_id: Option<DbId>,
    pub priority: i32,
    pub estimated_hunting_secs: Seconds,
    pub is_leaf: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new species.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSpecies {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub genus_id: Option<DbId>,
    pub parent_species_id: Option<DbId>,
    #[validate(range(min = 1))]
    pub priority: Option<i32>,
    #[validate(range(min = 0, max = 315_360_000))]
    pub estimated_hunting_secs: Option<Seconds>,
}

/// DTO for updating an existing species. All fields optional.
///
/// `estimated_hunting_secs` is only accepted for leaf species.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSpecies {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub genus_id: Option<DbId>,
    pub parent_species_id: Option<DbId>,
    #[validate(range(min = 1))]
    pub priority: Option<i32>,
    #[validate(range(min = 0, max = 315_360_000))]
    pub estimated_hunting_secs: Option<Seconds>,
}

/// Optional filters for species listings.
#[derive(Debug, Clone, Default)]
pub struct SpeciesFilter {
    pub genus_id: Option<DbId>,
    pub parent_species_id: Option<DbId>,
    pub roots_only: bool,
}
