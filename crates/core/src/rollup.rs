//! Bottom-up aggregation rules for species and games.
//!
//! Each function recomputes one node from the current values of its direct
//! children. Callers walk the ancestor chain nearest-first and feed every
//! level the freshly written values of the level below.

use chrono::Duration;

use crate::error::CoreError;
use crate::hunting::{aggregate_status, GameStatus};
use crate::types::{Seconds, Timestamp};

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// Aggregated columns of a species row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesRollup {
    pub is_leaf: bool,
    pub estimated_hunting_secs: Seconds,
}

/// Recompute a species from its children's estimates.
///
/// A leaf keeps `own_secs` untouched, including a species that just lost its
/// last child.
pub fn rollup_species(own_secs: Seconds, children_secs: &[Seconds]) -> SpeciesRollup {
    if children_secs.is_empty() {
        return SpeciesRollup {
            is_leaf: true,
            estimated_hunting_secs: own_secs,
        };
    }

    SpeciesRollup {
        is_leaf: false,
        estimated_hunting_secs: children_secs.iter().sum(),
    }
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

/// The derived columns of a game row, as read before and written after a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub status: GameStatus,
    pub is_leaf: bool,
    pub is_active: bool,
    pub estimated_hunting_secs: Seconds,
    pub actual_hunting_secs: Option<Seconds>,
    pub hunt_start_time: Timestamp,
    pub deadline: Option<Timestamp>,
}

/// The child columns a parent game aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildGame {
    pub status: GameStatus,
    pub estimated_hunting_secs: Seconds,
    pub actual_hunting_secs: Option<Seconds>,
}

/// Recompute a game from its direct children.
///
/// - `is_leaf` follows whether any child exists.
/// - A parent's estimate and actual time are the sums over its children and
///   its status is [`aggregate_status`] of theirs.
/// - A former parent that lost its last child keeps a derived HUNTING only
///   as PENDING: it becomes active through its own status, never through
///   the status its children left behind.
/// - Only a HUNTING leaf is active.
/// - An unset deadline is derived from the start time plus the estimate; it
///   stays unset when that falls outside the representable range.
pub fn rollup_game(state: &GameState, children: &[ChildGame]) -> GameState {
    let mut next = state.clone();
    next.is_leaf = children.is_empty();

    if !state.is_leaf && next.is_leaf && next.status == GameStatus::Hunting {
        next.status = GameStatus::Pending;
    }

    if !next.is_leaf {
        next.estimated_hunting_secs = children.iter().map(|c| c.estimated_hunting_secs).sum();
        next.actual_hunting_secs = sum_actual(children);
        let statuses: Vec<GameStatus> = children.iter().map(|c| c.status).collect();
        if let Some(status) = aggregate_status(&statuses) {
            next.status = status;
        }
    }

    next.is_active = next.is_leaf && next.status == GameStatus::Hunting;

    if next.deadline.is_none() {
        next.deadline = derive_deadline(next.hunt_start_time, next.estimated_hunting_secs).ok();
    }

    next
}

/// Sum of recorded actual times; `None` while no child has recorded one.
fn sum_actual(children: &[ChildGame]) -> Option<Seconds> {
    children
        .iter()
        .filter_map(|c| c.actual_hunting_secs)
        .fold(None, |acc, secs| Some(acc.unwrap_or(0) + secs))
}

/// Deadline of a hunt started at `start` that is expected to take `secs`.
///
/// Fails on `hunt_start_time` when the deadline would be out of range.
pub fn derive_deadline(start: Timestamp, secs: Seconds) -> Result<Timestamp, CoreError> {
    Duration::try_seconds(secs)
        .and_then(|estimate| start.checked_add_signed(estimate))
        .ok_or_else(|| CoreError::InvalidField {
            field: "hunt_start_time",
            message: format!(
                "A hunt starting at {start} with an estimate of {secs}s ends past the latest \
                 supported date"
            ),
        })
}

/// Whole seconds elapsed between `start` and `now`, never negative.
pub fn elapsed_secs(start: Timestamp, now: Timestamp) -> Seconds {
    (now - start).num_seconds().max(0)
}

/// Seconds left before `deadline`, floored at zero.
pub fn remaining_secs(deadline: Option<Timestamp>, now: Timestamp) -> Option<Seconds> {
    deadline.map(|d| (d - now).num_seconds().max(0))
}

/// A game is expired once `now` is past its deadline.
pub fn is_expired(deadline: Option<Timestamp>, now: Timestamp) -> bool {
    deadline.is_some_and(|d| now > d)
}
