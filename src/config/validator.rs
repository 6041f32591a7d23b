use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingSettings, PaginationSettings, RateLimitConfig, ServerSettings, Settings};
use crate::persistence::{DatabaseBackend, PersistenceConfig};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section, reporting all problems at once
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(&settings.server, &mut errors);
        Self::validate_database(&settings.database, &mut errors);
        Self::validate_pagination(&settings.pagination, &mut errors);
        if let Some(rate_limit) = &settings.rate_limit {
            Self::validate_rate_limit(rate_limit, &mut errors);
        }
        Self::validate_logging(&settings.logging, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings, errors: &mut Vec<ValidationError>) {
        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(invalid("server.port", "Port must be greater than 0"));
        }
    }

    fn validate_database(database: &PersistenceConfig, errors: &mut Vec<ValidationError>) {
        if database.url.is_empty() {
            errors.push(ValidationError::MissingField("database.url".to_string()));
        } else if let Err(e) = DatabaseBackend::from_url(&database.url) {
            errors.push(invalid("database.url", e.to_string()));
        }

        if database.max_connections == 0 {
            errors.push(invalid(
                "database.max_connections",
                "Pool needs at least one connection",
            ));
        }
    }

    fn validate_pagination(pagination: &PaginationSettings, errors: &mut Vec<ValidationError>) {
        if pagination.max_limit == 0 {
            errors.push(invalid("pagination.max_limit", "Must be greater than 0"));
        }

        for (field, value) in [
            ("pagination.forms_default_limit", pagination.forms_default_limit),
            (
                "pagination.submissions_default_limit",
                pagination.submissions_default_limit,
            ),
        ] {
            if value == 0 || value > pagination.max_limit {
                errors.push(invalid(
                    field,
                    format!("Must be between 1 and max_limit ({})", pagination.max_limit),
                ));
            }
        }
    }

    fn validate_rate_limit(rate_limit: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
        if !rate_limit.enabled {
            return;
        }
        if rate_limit.requests_per_second == 0 {
            errors.push(invalid(
                "rate_limit.requests_per_second",
                "Must be greater than 0",
            ));
        }
        if rate_limit.burst_size == 0 {
            errors.push(invalid("rate_limit.burst_size", "Must be greater than 0"));
        }
    }

    fn validate_logging(logging: &LoggingSettings, errors: &mut Vec<ValidationError>) {
        if let Err(e) = EnvFilter::try_new(&logging.level) {
            errors.push(invalid("logging.level", e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let result = ConfigValidator::validate(&Settings::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_collects_every_error() {
        let mut settings = Settings::default();
        settings.server.host = String::new();
        settings.database.url = "redis://localhost".to_string();
        settings.pagination.forms_default_limit = 500;
        settings.rate_limit = Some(RateLimitConfig {
            enabled: true,
            requests_per_second: 0,
            burst_size: 10,
        });

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(errors.len(), 4, "{:?}", messages);
        assert!(messages.iter().any(|m| m.contains("server.host")));
        assert!(messages.iter().any(|m| m.contains("database.url")));
        assert!(messages.iter().any(|m| m.contains("forms_default_limit")));
        assert!(messages.iter().any(|m| m.contains("requests_per_second")));
    }

    #[test]
    fn test_disabled_rate_limit_is_not_checked() {
        let mut settings = Settings::default();
        settings.rate_limit = Some(RateLimitConfig {
            enabled: false,
            requests_per_second: 0,
            burst_size: 0,
        });

        assert!(ConfigValidator::validate(&settings).is_ok());
    }
}
