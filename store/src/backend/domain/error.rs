use shared::ApplicationStatus;
use thiserror::Error;

/// Failure of a store command or query.
///
/// The first five variants are input errors. They are raised before anything
/// is written, so a failed mutation leaves the store untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("referenced {entity} {id} does not exist")]
    Referential { entity: &'static str, id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{field} {value:?} is already taken")]
    Duplicate { field: &'static str, value: String },

    #[error("application cannot move from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The task running a write panicked or was cancelled by the runtime
    #[error("write operation {0} was aborted")]
    Aborted(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "validation",
            StoreError::Referential { .. } => "referential",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Duplicate { .. } => "duplicate",
            StoreError::InvalidTransition { .. } => "invalid_transition",
            StoreError::Database(_) => "database",
            StoreError::Aborted(_) => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = StoreError::validation("age_to", "must not be below age_from");
        assert_eq!(err.to_string(), "invalid age_to: must not be below age_from");
        assert_eq!(err.kind(), "validation");

        let err = StoreError::InvalidTransition {
            from: ApplicationStatus::Approved,
            to: ApplicationStatus::Rejected,
        };
        assert_eq!(err.to_string(), "application cannot move from APPROVED to REJECTED");

        let err = StoreError::Duplicate {
            field: "phone",
            value: "89001234567".to_string(),
        };
        assert_eq!(err.kind(), "duplicate");
        assert!(err.to_string().contains("\"89001234567\""));
    }
}
