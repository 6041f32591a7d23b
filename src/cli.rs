use clap::Parser;
use std::path::PathBuf;

/// Formsmith - form builder backend with validated submissions
#[derive(Parser, Debug, Clone)]
#[command(name = "formsmith", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FORMSMITH_CONFIG", default_value = "formsmith.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "FORMSMITH_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "FORMSMITH_PORT")]
    pub port: Option<u16>,

    /// Database connection URL (sqlite://, postgres:// or mysql://)
    #[arg(long, env = "FORMSMITH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level filter used when RUST_LOG is unset (e.g. "info", "formsmith=debug")
    #[arg(long, env = "FORMSMITH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["formsmith"]);
        assert_eq!(cli.config, PathBuf::from("formsmith.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.database_url.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "formsmith",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--database-url",
            "postgres://forms:secret@db/forms",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host, Some("0.0.0.0".to_string()));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(
            cli.database_url.as_deref(),
            Some("postgres://forms:secret@db/forms")
        );
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_rejects_bad_port() {
        assert!(Cli::try_parse_from(["formsmith", "--port", "http"]).is_err());
    }
}
