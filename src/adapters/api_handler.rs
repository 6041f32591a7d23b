//! REST API handlers for forms and submissions
//!
//! Every response uses the same envelope: `{ "success": true, "data": ... }`
//! on success and `{ "success": false, "error": ..., "details"?: ... }` on
//! failure, where `details` maps field ids to validation messages.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::metrics_handler::MetricsCollector;
use crate::application::{
    CreateFormRequest, CreateSubmissionRequest, FormService, PageQuery, ServiceError,
    SubmissionListQuery, UpdateFormRequest,
};
use crate::domain::FieldErrors;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<FormService>,
    pub metrics: Arc<MetricsCollector>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            details: None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut body = ApiResponse::<()>::error(self.public_message());
        if let ServiceError::Validation(errors) = self {
            body.details = Some(errors);
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ServiceError>;

fn respond<T: Serialize>(status: StatusCode, data: T) -> ApiResult {
    Ok((status, Json(ApiResponse::success(data))).into_response())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        ServiceError::InvalidInput("Invalid request body".to_string())
    })
}

/// First address of `X-Forwarded-For`, if the header is present
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
}

// ============================================================================
// Forms
// ============================================================================

pub async fn list_forms(State(state): State<ApiState>, Query(page): Query<PageQuery>) -> ApiResult {
    respond(StatusCode::OK, state.service.list_forms(&page).await?)
}

pub async fn create_form(
    State(state): State<ApiState>,
    payload: Result<Json<CreateFormRequest>, JsonRejection>,
) -> ApiResult {
    let form = state.service.create_form(body(payload)?).await?;
    state.metrics.forms_created.inc();
    respond(StatusCode::CREATED, form)
}

pub async fn get_form(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    respond(StatusCode::OK, state.service.get_form(&id).await?)
}

pub async fn update_form(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateFormRequest>, JsonRejection>,
) -> ApiResult {
    respond(StatusCode::OK, state.service.update_form(&id, body(payload)?).await?)
}

pub async fn delete_form(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    state.service.delete_form(&id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok())).into_response())
}

pub async fn get_form_schema(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    respond(StatusCode::OK, state.service.form_schema(&id).await?)
}

// ============================================================================
// Submissions
// ============================================================================

pub async fn list_submissions(
    State(state): State<ApiState>,
    Query(query): Query<SubmissionListQuery>,
) -> ApiResult {
    respond(StatusCode::OK, state.service.list_submissions(&query).await?)
}

pub async fn create_submission(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> ApiResult {
    let request = body(payload)?;
    let result = state
        .service
        .create_submission(request, forwarded_for(&headers))
        .await;

    let outcome = match &result {
        Ok(_) => "accepted",
        Err(ServiceError::Validation(_)) => "rejected",
        Err(_) => "error",
    };
    state.metrics.record_submission(outcome);

    respond(StatusCode::CREATED, result?)
}

pub async fn get_submission(
    State(state): State<ApiState>,
    Path((form_id, submission_id)): Path<(String, String)>,
) -> ApiResult {
    respond(
        StatusCode::OK,
        state.service.get_submission(&form_id, &submission_id).await?,
    )
}
