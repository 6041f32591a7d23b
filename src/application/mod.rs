//! Use cases sitting between the HTTP adapters and the persistence layer.

pub mod error;
pub mod form_service;

pub use error::ServiceError;
pub use form_service::{
    CreateFormRequest, CreateSubmissionRequest, FormSchemaView, FormService, PageQuery,
    SubmissionListQuery, UpdateFormRequest,
};
