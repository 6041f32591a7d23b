use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::FieldErrors;
use crate::persistence::PersistenceError;

/// Outcome of a rejected form or submission operation
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request shape is wrong (missing ids, bad paging, malformed definitions)
    #[error("{0}")]
    InvalidInput(String),

    /// Submission payload failed the form's validation schema
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Persistence(PersistenceError),
}

impl From<PersistenceError> for ServiceError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity_type, .. } if entity_type == "form" => {
                Self::NotFound("Form not found".to_string())
            }
            PersistenceError::NotFound { entity_type, .. } if entity_type == "submission" => {
                Self::NotFound("Submission not found".to_string())
            }
            other => Self::Persistence(other),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Persistence(e) => e.status_code(),
        }
    }

    /// Message safe to show to API clients; internal details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(message) | Self::NotFound(message) => message.clone(),
            Self::Validation(_) => "Validation failed".to_string(),
            Self::Persistence(PersistenceError::Conflict { .. }) => "Conflict".to_string(),
            Self::Persistence(PersistenceError::NotFound { .. }) => "Not found".to_string(),
            Self::Internal(_) | Self::Persistence(_) => "Internal server error".to_string(),
        }
    }
}
