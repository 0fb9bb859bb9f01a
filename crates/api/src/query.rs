//! Shared query parameter types for API handlers.

use chrono::{Days, NaiveDate};
use hunt_core::hunting::GameStatus;
use hunt_core::types::{DbId, Timestamp};
use hunt_db::models::game::GameFilter;
use hunt_db::models::species::SpeciesFilter;
use serde::Deserialize;

/// Query parameters for `GET /species`.
#[derive(Debug, Default, Deserialize)]
pub struct SpeciesListParams {
    pub genus_id: Option<DbId>,
    pub parent_species_id: Option<DbId>,
    #[serde(default)]
    pub roots_only: bool,
}

impl From<SpeciesListParams> for SpeciesFilter {
    fn from(params: SpeciesListParams) -> Self {
        SpeciesFilter {
            genus_id: params.genus_id,
            parent_species_id: params.parent_species_id,
            roots_only: params.roots_only,
        }
    }
}

/// Query parameters for `GET /games`.
///
/// `date` selects one UTC calendar day of `hunt_start_time`; `from` / `to`
/// bound the window explicitly and narrow it further when combined with
/// `date`.
#[derive(Debug, Default, Deserialize)]
pub struct GameListParams {
    pub species_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub genus_id: Option<DbId>,
    pub parent_game_id: Option<DbId>,
    #[serde(default)]
    pub roots_only: bool,
    pub status: Option<GameStatus>,
    pub is_active: Option<bool>,
    pub date: Option<NaiveDate>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl From<GameListParams> for GameFilter {
    fn from(params: GameListParams) -> Self {
        let (day_start, day_end) = match params.date {
            Some(date) => day_bounds(date),
            None => (None, None),
        };

        GameFilter {
            species_id: params.species_id,
            category_id: params.category_id,
            genus_id: params.genus_id,
            parent_game_id: params.parent_game_id,
            roots_only: params.roots_only,
            status: params.status,
            is_active: params.is_active,
            from: day_start.max(params.from),
            to: narrower_end(day_end, params.to),
        }
    }
}

/// `[midnight, next midnight)` of a UTC calendar day.
fn day_bounds(date: NaiveDate) -> (Option<Timestamp>, Option<Timestamp>) {
    let start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let end = date
        .checked_add_days(Days::new(1))
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    (start, end)
}

fn narrower_end(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
