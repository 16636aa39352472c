use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::completion::CompletionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Ip,
    Email,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid JSON body")]
    MalformedBody(String),

    #[error("Missing calories or foods input")]
    MissingInput,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("rate limited")]
    RateLimited(LimitScope),

    #[error("Error generating meal plan")]
    Upstream(#[from] CompletionError),
}

/// Failure envelope: `{ message, error? }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::MalformedBody(_) | AppError::MissingInput | AppError::InvalidEmail => {
                StatusCode::BAD_REQUEST
            }
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let message = match self {
            AppError::RateLimited(LimitScope::Ip) => {
                "Too many requests, please try again later.".to_string()
            }
            AppError::RateLimited(LimitScope::Email) => "Daily meal plan limit reached".to_string(),
            other => other.to_string(),
        };
        let error = match self {
            AppError::MalformedBody(detail) => Some(detail.clone()),
            AppError::Upstream(e) => Some(e.to_string()),
            _ => None,
        };
        ErrorBody { message, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut res = (self.status(), Json(self.body())).into_response();
        if matches!(self, AppError::MethodNotAllowed) {
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        res
    }
}
