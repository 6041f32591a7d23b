//! Persistence layer error types

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Item not found
    #[error("Item not found: {entity_type} with identifier '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Row rejected by a uniqueness or foreign key constraint
    #[error("Constraint violation on {entity_type}: {reason}")]
    Conflict { entity_type: String, reason: String },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error from SQLx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn not_found(entity_type: &str, identifier: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            identifier: identifier.to_string(),
        }
    }

    /// Classify a failed write: uniqueness and foreign key violations become
    /// `Conflict`, anything else stays a database error.
    pub(crate) fn on_write(entity_type: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Self::Conflict {
                    entity_type: entity_type.to_string(),
                    reason: db.message().to_string(),
                }
            }
            _ => Self::Database(err),
        }
    }

    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PersistenceError::not_found("form", "abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PersistenceError::Conflict {
                entity_type: "submission".to_string(),
                reason: "unknown form".to_string(),
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PersistenceError::Migration("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_non_constraint_write_errors_stay_database_errors() {
        let err = PersistenceError::on_write("form", sqlx::Error::RowNotFound);
        assert!(matches!(err, PersistenceError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
