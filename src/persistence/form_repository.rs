//! Repository for form definitions

use async_trait::async_trait;
use sqlx::Row;

use crate::domain::{Form, FormSummary};
use crate::persistence::error::PersistenceError;
use crate::persistence::models::{encode_time, form_from_row, summary_from_row};
use crate::persistence::pool::ConnectionPool;

const FORM_COLUMNS: &str = "id, title, description, fields, settings, created_at, updated_at";

/// Repository trait for form operations
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Insert a new form
    async fn create(&self, form: &Form) -> Result<Form, PersistenceError>;

    /// Get a form by ID
    async fn get(&self, id: &str) -> Result<Option<Form>, PersistenceError>;

    /// Whether a form with this ID exists
    async fn exists(&self, id: &str) -> Result<bool, PersistenceError>;

    /// List forms newest first, with their submission counts
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<FormSummary>, PersistenceError>;

    /// Count all forms
    async fn count(&self) -> Result<u64, PersistenceError>;

    /// Overwrite a stored form with `form`
    async fn update(&self, form: &Form) -> Result<Form, PersistenceError>;

    /// Delete a form and its submissions
    async fn delete(&self, id: &str) -> Result<bool, PersistenceError>;
}

/// SQLx-based implementation of FormRepository
pub struct SqlxFormRepository {
    pool: ConnectionPool,
}

impl SqlxFormRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FormRepository for SqlxFormRepository {
    async fn create(&self, form: &Form) -> Result<Form, PersistenceError> {
        let fields = serde_json::to_string(&form.fields)?;
        let settings = form
            .settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let sql = format!(
            "INSERT INTO forms ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            FORM_COLUMNS
        );
        sqlx::query(&self.pool.sql(&sql))
        .bind(&form.id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(&fields)
        .bind(&settings)
        .bind(encode_time(&form.created_at))
        .bind(encode_time(&form.updated_at))
        .execute(self.pool.pool())
        .await
        .map_err(|e| PersistenceError::on_write("form", e))?;

        tracing::debug!(form_id = %form.id, "form created");
        Ok(form.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Form>, PersistenceError> {
        let sql = format!("SELECT {} FROM forms WHERE id = ?", FORM_COLUMNS);
        let row = sqlx::query(&self.pool.sql(&sql))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(form_from_row).transpose()
    }

    async fn exists(&self, id: &str) -> Result<bool, PersistenceError> {
        let row = sqlx::query(&self.pool.sql("SELECT COUNT(*) as count FROM forms WHERE id = ?"))
            .bind(id)
            .fetch_one(self.pool.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<FormSummary>, PersistenceError> {
        let rows = sqlx::query(&self.pool.sql(
            "SELECT f.id, f.title, f.description, f.created_at, f.updated_at, \
             (SELECT COUNT(*) FROM submissions s WHERE s.form_id = f.id) AS submission_count \
             FROM forms f ORDER BY f.created_at DESC LIMIT ? OFFSET ?",
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn count(&self) -> Result<u64, PersistenceError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM forms")
            .fetch_one(self.pool.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, form: &Form) -> Result<Form, PersistenceError> {
        let fields = serde_json::to_string(&form.fields)?;
        let settings = form
            .settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(&self.pool.sql(
            "UPDATE forms SET title = ?, description = ?, fields = ?, settings = ?, updated_at = ? WHERE id = ?",
        ))
        .bind(&form.title)
        .bind(&form.description)
        .bind(&fields)
        .bind(&settings)
        .bind(encode_time(&form.updated_at))
        .bind(&form.id)
        .execute(self.pool.pool())
        .await
        .map_err(|e| PersistenceError::on_write("form", e))?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("form", &form.id));
        }

        Ok(form.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        // Submissions are removed explicitly rather than through ON DELETE
        // CASCADE, so the outcome does not depend on backend FK enforcement.
        let mut tx = self.pool.pool().begin().await?;

        let removed_submissions = sqlx::query(&self.pool.sql("DELETE FROM submissions WHERE form_id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed = sqlx::query(&self.pool.sql("DELETE FROM forms WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        if removed {
            tracing::debug!(form_id = %id, removed_submissions, "form deleted");
        }
        Ok(removed)
    }
}
