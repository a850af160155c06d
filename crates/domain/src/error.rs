//! Domain error taxonomy shared by every engine in this crate.

use thiserror::Error;

/// The closed error taxonomy for the scheduling and EVV engines.
///
/// Validation/NotFound/Permission/Conflict are surfaced to callers as-is.
/// Transport failures are never propagated out of the submission engine;
/// they are captured as a retryable submission state instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        DomainError::Permission(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        DomainError::Transport(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = DomainError::not_found("Visit", "abc-123");
        assert_eq!(err.to_string(), "Visit not found: abc-123");
    }

    #[test]
    fn constructors_produce_expected_variants() {
        assert!(matches!(
            DomainError::validation("bad"),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            DomainError::permission("nope"),
            DomainError::Permission(_)
        ));
        assert!(matches!(
            DomainError::conflict("overlap"),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            DomainError::transport("timeout"),
            DomainError::Transport(_)
        ));
    }
}
