use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::domain::post::ACCEPTED_EXTENSIONS;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("post not found: {0}")]
    PostNotFound(String),
    #[error("unsupported image type: {0}")]
    UnsupportedImageType(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("classification failed: {0}")]
    ClassificationFailed(String),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::PostNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::UnsupportedImageType(_) | DomainError::InvalidUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::ClassificationFailed(_) => StatusCode::BAD_GATEWAY,
            DomainError::Storage(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let details = match self {
            DomainError::PostNotFound(resource) => Some(json!({ "resource": resource })),
            DomainError::UnsupportedImageType(_) => {
                Some(json!({ "accepted": ACCEPTED_EXTENSIONS }))
            }
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
