use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod field;
pub mod schema;

pub use field::{Field, FieldKind, DEFAULT_CHOICE_OPTIONS, FIELD_TYPES};
pub use schema::{FieldErrors, FormSchema, SchemaError};

/// Current time at the precision the datastore keeps (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A form definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    /// Free-form presentation settings, stored as given
    pub settings: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    pub fn new(input: NewForm) -> Self {
        let now = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            fields: input.fields,
            settings: input.settings,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&mut self, patch: FormPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(fields) = patch.fields {
            self.fields = fields;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        self.updated_at = now();
    }
}

/// Input for creating a form
#[derive(Debug, Clone)]
pub struct NewForm {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    pub settings: Option<Value>,
}

/// Partial update of a form; `None` leaves a value unchanged and
/// `Some(None)` clears an optional one
#[derive(Debug, Clone, Default)]
pub struct FormPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub fields: Option<Vec<Field>>,
    pub settings: Option<Option<Value>>,
}

/// Row of the forms listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submission_count: u64,
}

/// One respondent's answers, keyed by field id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    pub data: Value,
    pub submitted_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl Submission {
    pub fn new(form_id: impl Into<String>, data: Value, ip_address: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            data,
            submitted_at: now(),
            ip_address,
        }
    }
}

/// A form together with its most recent submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormWithSubmissions {
    #[serde(flatten)]
    pub form: Form,
    pub submissions: Vec<Submission>,
}

/// A submission together with the form it answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionWithForm {
    #[serde(flatten)]
    pub submission: Submission,
    pub form: Form,
}

/// Pagination metadata attached to list results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub has_more: bool,
}

impl PageMeta {
    pub fn new(total: u64, limit: u32, offset: u32) -> Self {
        Self {
            total,
            has_more: u64::from(offset) + u64::from(limit) < total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPage {
    pub forms: Vec<FormSummary>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPage {
    pub submissions: Vec<Submission>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_meta_has_more() {
        assert!(PageMeta::new(25, 10, 10).has_more);
        assert!(!PageMeta::new(20, 10, 10).has_more);
        assert!(!PageMeta::new(0, 50, 0).has_more);
    }

    #[test]
    fn test_page_serializes_flat() {
        let page = SubmissionPage {
            submissions: vec![],
            meta: PageMeta::new(0, 50, 0),
        };
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({ "submissions": [], "total": 0, "hasMore": false })
        );
    }

    #[test]
    fn test_apply_patch_keeps_unset_values() {
        let mut form = Form::new(NewForm {
            title: "Survey".to_string(),
            description: Some("Tell us".to_string()),
            fields: vec![],
            settings: None,
        });
        let created = form.created_at;

        form.apply(FormPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        });

        assert_eq!(form.title, "Renamed");
        assert_eq!(form.description.as_deref(), Some("Tell us"));
        assert_eq!(form.created_at, created);
        assert!(form.updated_at >= created);
    }

    #[test]
    fn test_apply_patch_clears_optional_values() {
        let mut form = Form::new(NewForm {
            title: "Survey".to_string(),
            description: Some("Tell us".to_string()),
            fields: vec![],
            settings: Some(json!({ "theme": "dark" })),
        });

        form.apply(FormPatch {
            description: Some(None),
            settings: Some(None),
            ..Default::default()
        });

        assert_eq!(form.title, "Survey");
        assert!(form.description.is_none());
        assert!(form.settings.is_none());
    }
}
