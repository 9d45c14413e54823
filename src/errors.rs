use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::{self, ContentType}, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Request-level failures returned to the HTTP caller.
#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    InvalidJson(String),
    ForbiddenOrigin,
    MethodNotAllowed,
    DuplicateSubmission { retry_after: u64 },
    RateLimited { retry_after: u64 },
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::InvalidJson(msg) => write!(f, "Invalid JSON: {}", msg),
            AppError::ForbiddenOrigin => write!(f, "Origin not allowed"),
            AppError::MethodNotAllowed => write!(f, "Only POST requests are allowed"),
            AppError::DuplicateSubmission { .. } => {
                write!(f, "This submission has been received too many times")
            }
            AppError::RateLimited { .. } => write!(f, "Too many requests from this IP"),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ValidationError(errors) => serde_json::json!({
                "error": "Validation failed",
                "message": "Invalid form data",
                "details": errors
            }),
            AppError::InvalidJson(_) => serde_json::json!({
                "error": "Invalid JSON",
                "message": "Request body must be valid JSON"
            }),
            AppError::ForbiddenOrigin => serde_json::json!({
                "error": "Forbidden",
                "message": self.to_string()
            }),
            AppError::MethodNotAllowed => serde_json::json!({
                "error": "Method not allowed",
                "message": self.to_string()
            }),
            AppError::DuplicateSubmission { retry_after } => serde_json::json!({
                "error": "Too many requests",
                "message": self.to_string(),
                "retryAfter": retry_after
            }),
            AppError::RateLimited { retry_after } => serde_json::json!({
                "error": "Rate limit exceeded",
                "message": self.to_string(),
                "retryAfter": retry_after
            }),
            // Internal details stay in the logs.
            AppError::InternalError(_) => serde_json::json!({
                "error": "Internal server error",
                "message": "An error occurred while processing your submission"
            }),
        };

        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());

        if let AppError::DuplicateSubmission { retry_after } | AppError::RateLimited { retry_after } = self {
            response.insert_header((header::RETRY_AFTER, retry_after.to_string()));
        }

        response.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::DuplicateSubmission { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Failures of the backing key-value store.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum StoreError {
    #[display("Store connection failed: {_0}")]
    Connection(String),

    #[display("Store operation failed: {_0}")]
    Operation(String),

    #[display("Malformed record at {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Operation(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<deadpool_redis::CreatePoolError> for StoreError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum EmailError {
    #[display("Email template error: {_0}")]
    Template(String),

    #[display("Email delivery failed: {_0}")]
    Delivery(String),

    #[display("Mail relay rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[display("Invalid mail relay configuration: {_0}")]
    Configuration(String),
}

impl std::error::Error for EmailError {}

impl From<minijinja::Error> for EmailError {
    fn from(err: minijinja::Error) -> Self {
        EmailError::Template(err.to_string())
    }
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Delivery(err.to_string())
    }
}

/// One entry of a validation report. `field` is the submitted key, or
/// [`FieldError::ROOT`] when the problem concerns the submission as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub const ROOT: &'static str = "root";

    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        FieldError::new(Self::ROOT, message)
    }
}
