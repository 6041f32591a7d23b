//! Form and submission use cases.
//!
//! Handlers hand raw request bodies to [`FormService`], which checks their
//! shape, enforces each form's validation schema on submissions and reports
//! every outcome as a [`ServiceError`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::error::ServiceError;
use crate::config::PaginationSettings;
use crate::domain::{
    Field, Form, FormPage, FormPatch, FormSchema, FormWithSubmissions, NewForm, PageMeta,
    Submission, SubmissionPage, SubmissionWithForm,
};
use crate::persistence::{FormRepository, SubmissionRepository};

/// `limit` / `offset` exactly as received in a query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit.to_string()),
            offset: Some(offset.to_string()),
        }
    }

    /// Resolve to `(limit, offset)`, clamping the limit to `max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> Result<(u32, u32), ServiceError> {
        let limit = parse_bound(self.limit.as_deref(), i64::from(default_limit))?;
        let offset = parse_bound(self.offset.as_deref(), 0)?;
        if limit < 1 || offset < 0 {
            return Err(invalid_page());
        }
        let limit = limit.min(i64::from(max_limit)) as u32;
        let offset = u32::try_from(offset).map_err(|_| invalid_page())?;
        Ok((limit, offset))
    }
}

fn parse_bound(raw: Option<&str>, default: i64) -> Result<i64, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| invalid_page()),
    }
}

fn invalid_page() -> ServiceError {
    ServiceError::InvalidInput("Invalid limit or offset".to_string())
}

/// Query of `GET /api/submissions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListQuery {
    pub form_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SubmissionListQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit.clone(),
            offset: self.offset.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Value>,
    pub settings: Option<Value>,
}

/// Absent keys leave a value unchanged; an explicit `null` clears
/// `description` or `settings`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub fields: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub settings: Option<Option<Value>>,
}

/// Only called for keys that are present, so `null` becomes `Some(None)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub form_id: Option<String>,
    pub data: Option<Value>,
    pub ip_address: Option<String>,
}

/// Compiled schema of a form plus the initial values of an empty response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchemaView {
    pub form_id: String,
    #[serde(flatten)]
    pub schema: FormSchema,
    pub defaults: Map<String, Value>,
}

pub struct FormService {
    forms: Arc<dyn FormRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    pagination: PaginationSettings,
}

impl FormService {
    pub fn new(
        forms: Arc<dyn FormRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        pagination: PaginationSettings,
    ) -> Self {
        Self {
            forms,
            submissions,
            pagination,
        }
    }

    pub async fn list_forms(&self, page: &PageQuery) -> Result<FormPage, ServiceError> {
        let (limit, offset) =
            page.resolve(self.pagination.forms_default_limit, self.pagination.max_limit)?;

        let forms = self.forms.list(limit, offset).await?;
        let total = self.forms.count().await?;

        Ok(FormPage {
            forms,
            meta: PageMeta::new(total, limit, offset),
        })
    }

    pub async fn create_form(&self, request: CreateFormRequest) -> Result<Form, ServiceError> {
        let title = request.title.filter(|t| !t.trim().is_empty());
        let fields = request.fields.filter(Value::is_array);
        let (Some(title), Some(fields)) = (title, fields) else {
            return Err(ServiceError::InvalidInput(
                "Title and fields are required".to_string(),
            ));
        };

        let form = Form::new(NewForm {
            title,
            description: request.description,
            fields: parse_fields(fields)?,
            settings: parse_settings(request.settings)?,
        });

        let form = self.forms.create(&form).await?;
        info!(form_id = %form.id, fields = form.fields.len(), "Form created");
        Ok(form)
    }

    pub async fn get_form(&self, id: &str) -> Result<FormWithSubmissions, ServiceError> {
        let form = self.require_form(id).await?;
        let submissions = self
            .submissions
            .recent(id, self.pagination.recent_submissions)
            .await?;

        Ok(FormWithSubmissions { form, submissions })
    }

    pub async fn update_form(
        &self,
        id: &str,
        request: UpdateFormRequest,
    ) -> Result<Form, ServiceError> {
        if request.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::InvalidInput(
                "Title must be at least 1 character".to_string(),
            ));
        }

        let fields = match request.fields {
            None => None,
            Some(fields) if fields.is_array() => Some(parse_fields(fields)?),
            Some(_) => {
                return Err(ServiceError::InvalidInput(
                    "Fields must be an array".to_string(),
                ))
            }
        };

        let patch = FormPatch {
            title: request.title,
            description: request.description,
            fields,
            settings: request.settings.map(parse_settings).transpose()?,
        };

        let mut form = self.require_form(id).await?;
        form.apply(patch);
        Ok(self.forms.update(&form).await?)
    }

    pub async fn delete_form(&self, id: &str) -> Result<(), ServiceError> {
        if !self.forms.delete(id).await? {
            return Err(form_not_found());
        }
        info!(form_id = %id, "Form deleted");
        Ok(())
    }

    pub async fn form_schema(&self, id: &str) -> Result<FormSchemaView, ServiceError> {
        let form = self.require_form(id).await?;
        let schema = compile_stored(&form)?;

        Ok(FormSchemaView {
            defaults: schema.default_values(),
            form_id: form.id,
            schema,
        })
    }

    pub async fn list_submissions(
        &self,
        query: &SubmissionListQuery,
    ) -> Result<SubmissionPage, ServiceError> {
        let form_id = query
            .form_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::InvalidInput("Form ID is required".to_string()))?;
        let (limit, offset) = query.page().resolve(
            self.pagination.submissions_default_limit,
            self.pagination.max_limit,
        )?;

        let submissions = self.submissions.list(form_id, limit, offset).await?;
        let total = self.submissions.count(form_id).await?;

        Ok(SubmissionPage {
            submissions,
            meta: PageMeta::new(total, limit, offset),
        })
    }

    /// Validate and store a submission.
    ///
    /// `fallback_ip` is recorded when the body carries no `ipAddress`.
    pub async fn create_submission(
        &self,
        request: CreateSubmissionRequest,
        fallback_ip: Option<String>,
    ) -> Result<Submission, ServiceError> {
        let form_id = request.form_id.filter(|id| !id.is_empty());
        let data = request.data.filter(|d| !d.is_null());
        let (Some(form_id), Some(data)) = (form_id, data) else {
            return Err(ServiceError::InvalidInput(
                "Form ID and data are required".to_string(),
            ));
        };
        let Value::Object(payload) = data else {
            return Err(ServiceError::InvalidInput(
                "Submission data must be an object".to_string(),
            ));
        };

        let form = self.require_form(&form_id).await?;
        let schema = compile_stored(&form)?;
        let cleaned = schema.validate(&payload).map_err(|errors| {
            warn!(form_id = %form_id, invalid_fields = errors.len(), "Submission rejected");
            ServiceError::Validation(errors)
        })?;

        let submission = Submission::new(
            form_id,
            Value::Object(cleaned),
            request.ip_address.or(fallback_ip),
        );
        Ok(self.submissions.create(&submission).await?)
    }

    pub async fn get_submission(
        &self,
        form_id: &str,
        submission_id: &str,
    ) -> Result<SubmissionWithForm, ServiceError> {
        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .filter(|s| s.form_id == form_id)
            .ok_or_else(|| ServiceError::NotFound("Submission not found".to_string()))?;
        let form = self.require_form(form_id).await?;

        Ok(SubmissionWithForm { submission, form })
    }

    async fn require_form(&self, id: &str) -> Result<Form, ServiceError> {
        self.forms.get(id).await?.ok_or_else(form_not_found)
    }
}

fn form_not_found() -> ServiceError {
    ServiceError::NotFound("Form not found".to_string())
}

fn parse_fields(fields: Value) -> Result<Vec<Field>, ServiceError> {
    let fields: Vec<Field> = serde_json::from_value(fields)
        .map_err(|e| ServiceError::InvalidInput(format!("Invalid field definition: {}", e)))?;
    FormSchema::compile(&fields).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
    Ok(fields)
}

fn parse_settings(settings: Option<Value>) -> Result<Option<Value>, ServiceError> {
    match settings {
        None | Some(Value::Null) => Ok(None),
        Some(settings @ Value::Object(_)) => Ok(Some(settings)),
        Some(_) => Err(ServiceError::InvalidInput(
            "Settings must be an object".to_string(),
        )),
    }
}

/// Stored definitions were checked on write, so a failure here is a server fault.
fn compile_stored(form: &Form) -> Result<FormSchema, ServiceError> {
    FormSchema::compile(&form.fields).map_err(|e| {
        ServiceError::Internal(format!("stored form {} has an invalid schema: {}", form.id, e))
    })
}
