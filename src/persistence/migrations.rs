//! Database migrations for the persistence layer

use crate::persistence::error::PersistenceError;
use crate::persistence::pool::{ConnectionPool, DatabaseBackend};
use sqlx::Row;

/// Forms and their submissions
const MIGRATION_001_INITIAL: &str = r#"
-- Form definitions, fields and settings are JSON documents
CREATE TABLE IF NOT EXISTS forms (
    id VARCHAR(64) PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    fields TEXT NOT NULL,
    settings TEXT,
    created_at VARCHAR(32) NOT NULL,
    updated_at VARCHAR(32) NOT NULL
);

-- Submissions reference their form and go away with it
CREATE TABLE IF NOT EXISTS submissions (
    id VARCHAR(64) PRIMARY KEY,
    form_id VARCHAR(64) NOT NULL,
    data TEXT NOT NULL,
    submitted_at VARCHAR(32) NOT NULL,
    ip_address TEXT,
    FOREIGN KEY (form_id) REFERENCES forms(id) ON DELETE CASCADE
);

-- MySQL has no CREATE INDEX IF NOT EXISTS; the tracking table guards reruns
CREATE INDEX idx_forms_created ON forms(created_at);
CREATE INDEX idx_submissions_form ON submissions(form_id);
CREATE INDEX idx_submissions_form_time ON submissions(form_id, submitted_at);
"#;

/// Tracking table DDL; only the key column differs between backends
fn migrations_table_sql(backend: DatabaseBackend) -> String {
    let id = match backend {
        DatabaseBackend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        DatabaseBackend::Postgres => "id BIGSERIAL PRIMARY KEY",
        DatabaseBackend::Mysql => "id BIGINT AUTO_INCREMENT PRIMARY KEY",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS _formsmith_migrations (\n    {},\n    \
         name VARCHAR(255) NOT NULL UNIQUE,\n    \
         applied_at VARCHAR(64) NOT NULL,\n    \
         checksum VARCHAR(64) NOT NULL\n)",
        id
    )
}

/// Migration definition
struct Migration {
    name: &'static str,
    sql: &'static str,
    checksum: &'static str,
}

/// Get all migrations in order
fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        name: "001_forms_and_submissions",
        sql: MIGRATION_001_INITIAL,
        checksum: "v1",
    }]
}

/// Split a migration script into executable statements, dropping comment lines
fn statements(sql: &str) -> impl Iterator<Item = String> + '_ {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
}

/// Migration runner for the persistence layer
pub struct MigrationRunner {
    pool: ConnectionPool,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations
    pub async fn migrate_up(&self) -> Result<MigrationResult, PersistenceError> {
        let mut applied = 0;
        let mut skipped = 0;

        self.ensure_migrations_table().await?;

        for migration in get_migrations() {
            if self.is_migration_applied(migration.name).await? {
                tracing::debug!("Migration '{}' already applied, skipping", migration.name);
                skipped += 1;
                continue;
            }

            tracing::info!("Applying migration: {}", migration.name);

            for statement in statements(migration.sql) {
                sqlx::query(&statement)
                    .execute(self.pool.pool())
                    .await
                    .map_err(|e| {
                        PersistenceError::Migration(format!(
                            "Failed to execute migration '{}': {}",
                            migration.name, e
                        ))
                    })?;
            }

            self.record_migration(migration.name, migration.checksum)
                .await?;

            tracing::info!("Migration '{}' applied", migration.name);
            applied += 1;
        }

        Ok(MigrationResult { applied, skipped })
    }

    /// Get migration status
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, PersistenceError> {
        self.ensure_migrations_table().await?;

        let mut statuses = Vec::new();
        for migration in get_migrations() {
            let applied_at = self.get_migration_applied_at(migration.name).await?;
            statuses.push(MigrationStatus {
                name: migration.name.to_string(),
                applied: applied_at.is_some(),
                applied_at,
            });
        }

        Ok(statuses)
    }

    /// Ensure the migrations tracking table exists
    async fn ensure_migrations_table(&self) -> Result<(), PersistenceError> {
        let sql = migrations_table_sql(self.pool.backend());

        sqlx::query(&sql)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to create migrations table: {}", e))
            })?;

        Ok(())
    }

    /// Check if a migration has been applied
    async fn is_migration_applied(&self, name: &str) -> Result<bool, PersistenceError> {
        let row = sqlx::query(&self.pool.sql(
            "SELECT COUNT(*) as count FROM _formsmith_migrations WHERE name = ?",
        ))
            .bind(name)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to check migration status: {}", e))
            })?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    /// Get when a migration was applied
    async fn get_migration_applied_at(
        &self,
        name: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query(&self.pool.sql(
            "SELECT applied_at FROM _formsmith_migrations WHERE name = ?",
        ))
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to get migration applied_at: {}", e))
            })?;

        row.map(|row| row.try_get("applied_at"))
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Record a migration as applied
    async fn record_migration(&self, name: &str, checksum: &str) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(&self.pool.sql(
            "INSERT INTO _formsmith_migrations (name, applied_at, checksum) VALUES (?, ?, ?)",
        ))
            .bind(name)
            .bind(&now)
            .bind(checksum)
            .execute(self.pool.pool())
            .await
            .map_err(|e| PersistenceError::Migration(format!("Failed to record migration: {}", e)))?;

        Ok(())
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Number of migrations applied
    pub applied: usize,
    /// Number of migrations skipped (already applied)
    pub skipped: usize,
}

/// Status of a single migration
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub name: String,
    pub applied: bool,
    pub applied_at: Option<String>,
}
