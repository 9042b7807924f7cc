// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::JwtError;
use crate::identity::IdentityError;
use crate::request::{Entity, Operation, PipelineError, Violations};
use crate::storage::StorageError;

/// Generic message for failures whose cause stays server-side
pub const GENERIC_FAILURE: &str = "Something went wrong";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        violations: Violations,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { violations, .. } = self {
            response["violations"] = json!(violations);
        }

        response
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, violations: Violations) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            violations,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MalformedBody(msg) => {
                tracing::debug!("Malformed request body: {}", msg);
                ApiError::invalid_json("Invalid JSON body")
            }
            PipelineError::Forbidden { .. } => ApiError::forbidden("Don't have Permission"),
            PipelineError::Validation(violations) => {
                ApiError::validation_error("Validation failed", violations)
            }
            PipelineError::NotFound { entity, .. } => match entity {
                Entity::Category => ApiError::not_found("Not Found Category"),
                Entity::Product => ApiError::not_found("Not Found Product"),
            },
            PipelineError::InvalidInput(msg) => ApiError::bad_request(msg),
            PipelineError::Identity { operation, source } => identity_error(operation, source),
            PipelineError::Store(e) => {
                // Don't expose backend failures to clients
                tracing::error!("Store error: {}", e);
                ApiError::internal_server_error(GENERIC_FAILURE)
            }
            PipelineError::Storage(e) => {
                tracing::error!("Object storage error: {}", e);
                ApiError::internal_server_error(GENERIC_FAILURE)
            }
        }
    }
}

fn identity_error(operation: Operation, source: IdentityError) -> ApiError {
    match source {
        IdentityError::UserNotFound(_) if operation == Operation::ConfirmSignUp => {
            ApiError::bad_request("Incorrect username")
        }
        IdentityError::UserNotFound(_) | IdentityError::NotAuthorized => {
            ApiError::unauthorized("Incorrect username or password")
        }
        IdentityError::CodeMismatch | IdentityError::ExpiredCode => {
            ApiError::unauthorized("Your code is invalid")
        }
        IdentityError::UserNotConfirmed(_) => ApiError::unauthorized("Your account is not verified!"),
        IdentityError::UsernameExists(_) => ApiError::unauthorized("Your username is already exists"),
        IdentityError::Unavailable(msg) => {
            tracing::error!("Identity provider error during {:?}: {}", operation, msg);
            ApiError::internal_server_error(GENERIC_FAILURE)
        }
    }
}

// Signed storage requests bypass the pipeline
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ApiError::not_found("Not Found Object"),
            StorageError::InvalidSignature | StorageError::Expired { .. } => {
                ApiError::forbidden("Invalid or expired signature")
            }
            StorageError::InvalidUrl(msg) | StorageError::Backend(msg) => {
                tracing::error!("Object storage error: {}", msg);
                ApiError::internal_server_error(GENERIC_FAILURE)
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(msg) => {
                tracing::debug!("Rejected token: {}", msg);
                ApiError::unauthorized("Invalid token")
            }
            other => {
                tracing::error!("Token verification unavailable: {}", other);
                ApiError::internal_server_error(GENERIC_FAILURE)
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
