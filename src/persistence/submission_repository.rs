//! Repository for form submissions
//!
//! Submissions are append-only: there is no update, and they are removed only
//! together with their form.

use async_trait::async_trait;
use sqlx::Row;

use crate::domain::Submission;
use crate::persistence::error::PersistenceError;
use crate::persistence::models::{encode_time, submission_from_row};
use crate::persistence::pool::ConnectionPool;

/// Repository trait for submission operations
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Store a submission; fails with NotFound when its form does not exist
    /// and with Conflict when the form disappears mid-insert
    async fn create(&self, submission: &Submission) -> Result<Submission, PersistenceError>;

    /// Get a submission by ID
    async fn get(&self, id: &str) -> Result<Option<Submission>, PersistenceError>;

    /// List a form's submissions, most recent first
    async fn list(
        &self,
        form_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Submission>, PersistenceError>;

    /// Count a form's submissions
    async fn count(&self, form_id: &str) -> Result<u64, PersistenceError>;

    /// The `n` most recent submissions of a form
    async fn recent(&self, form_id: &str, n: u32) -> Result<Vec<Submission>, PersistenceError> {
        self.list(form_id, n, 0).await
    }
}

/// SQLx-based implementation of SubmissionRepository
pub struct SqlxSubmissionRepository {
    pool: ConnectionPool,
}

impl SqlxSubmissionRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for SqlxSubmissionRepository {
    async fn create(&self, submission: &Submission) -> Result<Submission, PersistenceError> {
        let data = serde_json::to_string(&submission.data)?;
        let mut tx = self.pool.pool().begin().await?;

        let row = sqlx::query(&self.pool.sql("SELECT COUNT(*) as count FROM forms WHERE id = ?"))
            .bind(&submission.form_id)
            .fetch_one(&mut *tx)
            .await?;
        let count: i64 = row.try_get("count")?;
        if count == 0 {
            return Err(PersistenceError::not_found("form", &submission.form_id));
        }

        sqlx::query(&self.pool.sql(
            "INSERT INTO submissions (id, form_id, data, submitted_at, ip_address) VALUES (?, ?, ?, ?, ?)",
        ))
        .bind(&submission.id)
        .bind(&submission.form_id)
        .bind(&data)
        .bind(encode_time(&submission.submitted_at))
        .bind(&submission.ip_address)
        .execute(&mut *tx)
        .await
        .map_err(|e| PersistenceError::on_write("submission", e))?;

        tx.commit().await?;
        Ok(submission.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Submission>, PersistenceError> {
        let row = sqlx::query(&self.pool.sql(
            "SELECT id, form_id, data, submitted_at, ip_address FROM submissions WHERE id = ?",
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        row.as_ref().map(submission_from_row).transpose()
    }

    async fn list(
        &self,
        form_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Submission>, PersistenceError> {
        let rows = sqlx::query(&self.pool.sql(
            "SELECT id, form_id, data, submitted_at, ip_address FROM submissions \
             WHERE form_id = ? ORDER BY submitted_at DESC LIMIT ? OFFSET ?",
        ))
        .bind(form_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter().map(submission_from_row).collect()
    }

    async fn count(&self, form_id: &str) -> Result<u64, PersistenceError> {
        let row = sqlx::query(&self.pool.sql(
            "SELECT COUNT(*) as count FROM submissions WHERE form_id = ?",
        ))
            .bind(form_id)
            .fetch_one(self.pool.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}
