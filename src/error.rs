use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use tracing::{error, warn};

use crate::model::employee::MissingRecordId;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Employee not found")]
    NotFound,

    #[error("Employee with employee_id '{0}' already exists.")]
    Conflict(String),

    #[error("Something went wrong, Contact with system admin")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(employee_id) => ApiError::Conflict(employee_id),
            other => {
                error!(error = %other, "Employee store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<MissingRecordId> for ApiError {
    fn from(err: MissingRecordId) -> Self {
        error!(error = %err, "Stored employee is malformed");
        ApiError::Internal
    }
}

// -------------------- Extractor error handlers --------------------

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "Rejected request body");
    ApiError::Validation(format!("Invalid request body: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "Rejected query string");
    ApiError::Validation(format!("Invalid query parameters: {}", err)).into()
}
