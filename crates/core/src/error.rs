use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A validation failure attributable to a single input field.
    #[error("Validation failed on {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// A lifecycle action was requested from a status that does not allow it.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
