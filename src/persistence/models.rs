//! Row decoding and column encoding shared by the repositories

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::domain::{Field, Form, FormSummary, Submission};
use crate::persistence::error::PersistenceError;

/// Fixed-width RFC 3339 so that text ordering matches time ordering
pub(crate) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Serialization(format!("invalid timestamp '{}': {}", raw, e)))
}

fn decode_json(row: &AnyRow, column: &str) -> Result<Option<Value>, PersistenceError> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.as_deref().map(serde_json::from_str::<Value>).transpose()?)
}

pub(crate) fn form_from_row(row: &AnyRow) -> Result<Form, PersistenceError> {
    let fields_raw: String = row.try_get("fields")?;
    let fields: Vec<Field> = serde_json::from_str(&fields_raw)?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Form {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        fields,
        settings: decode_json(row, "settings")?,
        created_at: decode_time(&created_at)?,
        updated_at: decode_time(&updated_at)?,
    })
}

pub(crate) fn summary_from_row(row: &AnyRow) -> Result<FormSummary, PersistenceError> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let submission_count: i64 = row.try_get("submission_count")?;

    Ok(FormSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: decode_time(&created_at)?,
        updated_at: decode_time(&updated_at)?,
        submission_count: submission_count.max(0) as u64,
    })
}

pub(crate) fn submission_from_row(row: &AnyRow) -> Result<Submission, PersistenceError> {
    let submitted_at: String = row.try_get("submitted_at")?;

    Ok(Submission {
        id: row.try_get("id")?,
        form_id: row.try_get("form_id")?,
        data: decode_json(row, "data")?.unwrap_or(Value::Null),
        submitted_at: decode_time(&submitted_at)?,
        ip_address: row.try_get("ip_address")?,
    })
}
