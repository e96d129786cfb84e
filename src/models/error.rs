use serde::Serialize;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    DuplicateError(String),
    DatabaseError(mongodb::error::Error),
    ValidationError(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    /// Payment gateway failure, carrying the `error_type` reported to the client.
    PaymentError { error_type: String, message: String },
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::DuplicateError(msg) => write!(f, "Duplicate error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Not authorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::PaymentError { message, .. } => write!(f, "Payment error: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::DuplicateError(_) => "DUPLICATE_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::PaymentError { .. } => "PAYMENT_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DuplicateError(_) => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PaymentError { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Database details stay in the logs
        let message = match self {
            ApiError::DatabaseError(_) => "Internal server error".to_string(),
            ApiError::PaymentError { message, .. } => message.clone(),
            _ => self.to_string(),
        };
        let error_type = match self {
            ApiError::PaymentError { error_type, .. } => Some(error_type.clone()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            code: self.code().to_string(),
            message,
            error_type,
        })
    }
}
