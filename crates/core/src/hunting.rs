//! Game status state machine and status aggregation.
//!
//! ```text
//! NOT_STARTED --start--> HUNTING --complete--> CAPTURED
//!                         |  ^  \--escape----> ESCAPED
//!                   pause |  | resume
//!                         v  |
//!                        PENDING
//! ```
//!
//! CAPTURED and ESCAPED are terminal for the node itself but still feed the
//! aggregated status of its parent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a game. Stored as its SCREAMING_SNAKE_CASE name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    NotStarted,
    Hunting,
    Pending,
    Captured,
    Escaped,
}

impl GameStatus {
    /// All statuses, in declaration order.
    pub const ALL: [GameStatus; 5] = [
        GameStatus::NotStarted,
        GameStatus::Hunting,
        GameStatus::Pending,
        GameStatus::Captured,
        GameStatus::Escaped,
    ];

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Hunting => "HUNTING",
            Self::Pending => "PENDING",
            Self::Captured => "CAPTURED",
            Self::Escaped => "ESCAPED",
        }
    }

    /// CAPTURED and ESCAPED end a hunt.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Captured | Self::Escaped)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown game status '{s}'. Expected one of: NOT_STARTED, HUNTING, \
                     PENDING, CAPTURED, ESCAPED"
                ))
            })
    }
}

impl TryFrom<String> for GameStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Derive a parent's status from its direct children.
///
/// Precedence, first match wins: any HUNTING, any ESCAPED, all CAPTURED,
/// any PENDING, otherwise NOT_STARTED. Returns `None` for a node without
/// children since a leaf carries its own status.
pub fn aggregate_status(children: &[GameStatus]) -> Option<GameStatus> {
    if children.is_empty() {
        return None;
    }

    let any = |wanted: GameStatus| children.iter().any(|s| *s == wanted);

    let status = if any(GameStatus::Hunting) {
        GameStatus::Hunting
    } else if any(GameStatus::Escaped) {
        GameStatus::Escaped
    } else if children.iter().all(|s| *s == GameStatus::Captured) {
        GameStatus::Captured
    } else if any(GameStatus::Pending) {
        GameStatus::Pending
    } else {
        GameStatus::NotStarted
    };
    Some(status)
}

/// Resolve a status written directly through an update.
///
/// Leaving HUNTING for anything other than CAPTURED or ESCAPED lands in
/// PENDING so an in-progress hunt is never silently reset.
pub fn resolve_requested_status(current: GameStatus, requested: GameStatus) -> GameStatus {
    if current == GameStatus::Hunting
        && requested != GameStatus::Hunting
        && !requested.is_terminal()
    {
        GameStatus::Pending
    } else {
        requested
    }
}

// ---------------------------------------------------------------------------
// Explicit actions
// ---------------------------------------------------------------------------

/// An explicit lifecycle action on a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntAction {
    Start,
    Complete,
    Escape,
    Pause,
    Resume,
}

impl HuntAction {
    /// The only status this action may be applied from.
    pub fn required_status(self) -> GameStatus {
        match self {
            Self::Start => GameStatus::NotStarted,
            Self::Complete | Self::Escape | Self::Pause => GameStatus::Hunting,
            Self::Resume => GameStatus::Pending,
        }
    }

    /// The status the game holds once the action succeeds.
    pub fn target_status(self) -> GameStatus {
        match self {
            Self::Start | Self::Resume => GameStatus::Hunting,
            Self::Complete => GameStatus::Captured,
            Self::Escape => GameStatus::Escaped,
            Self::Pause => GameStatus::Pending,
        }
    }

    /// Whether the action closes the hunt and records the elapsed time.
    pub fn records_actual_time(self) -> bool {
        matches!(self, Self::Complete | Self::Escape)
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Escape => "escape",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

/// Check that `action` may be applied to a game in `current` status.
///
/// Only leaf games can be acted on: a parent's status is derived from its
/// children and would be overwritten on the next propagation.
pub fn validate_action(
    action: HuntAction,
    current: GameStatus,
    is_leaf: bool,
) -> Result<GameStatus, CoreError> {
    if !is_leaf {
        return Err(CoreError::InvalidStateTransition(format!(
            "Cannot {} a game that has child games; act on a leaf game instead",
            action.verb()
        )));
    }

    let required = action.required_status();
    if current != required {
        return Err(CoreError::InvalidStateTransition(format!(
            "Cannot {} a game in status {current}; it must be {required}",
            action.verb()
        )));
    }

    Ok(action.target_status())
}
