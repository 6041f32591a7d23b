use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;

use crate::cli::Cli;
use crate::persistence::PersistenceConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: PersistenceConfig,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Page sizes used by the list endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationSettings {
    /// `GET /api/forms` page size when no limit is given
    pub forms_default_limit: u32,
    /// `GET /api/submissions` page size when no limit is given
    pub submissions_default_limit: u32,
    /// Upper bound applied to any requested limit
    pub max_limit: u32,
    /// Submissions embedded in a single form lookup
    pub recent_submissions: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            forms_default_limit: 10,
            submissions_default_limit: 50,
            max_limit: 100,
            recent_submissions: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: PersistenceConfig::default(),
            pagination: PaginationSettings::default(),
            rate_limit: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load `<root>/formsmith.{toml,yaml,json}` if present, otherwise defaults
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let settings = Self::load(&Path::new(root).join("formsmith"))?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let defaults = ServerSettings::default();
        let s = Config::builder()
            .add_source(File::from(path).required(false))
            .set_default("server.host", defaults.host)?
            .set_default("server.port", i64::from(defaults.port))?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.database_url {
            self.database.url = url.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.url, "sqlite://formsmith.db");
        assert_eq!(settings.pagination.forms_default_limit, 10);
        assert_eq!(settings.pagination.submissions_default_limit, 50);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.rate_limit.is_none());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formsmith.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 4000

[database]
url = "sqlite://from-file.db"
"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "formsmith",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "5000",
            "--log-level",
            "debug",
        ]);
        let settings = Settings::new_with_cli(&cli).unwrap();

        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.database.url, "sqlite://from-file.db");
        assert_eq!(settings.logging.level, "debug");
    }
}
