// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::TokenError;
use crate::database::StoreError;
use crate::services::{GithubError, PostError, ProfileError, UserError};
use crate::validation::{FieldError, FieldErrors};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        errors: Vec<FieldError>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body. `errors` lists per-field failures and
    /// is empty for everything but validation errors.
    pub fn to_json(&self) -> Value {
        let errors = match self {
            ApiError::ValidationError { errors, .. } => json!(errors),
            _ => json!([]),
        };

        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code(),
            "errors": errors
        })
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, errors: FieldErrors) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            errors: errors.errors().to_vec(),
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

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

fn validation(errors: FieldErrors) -> ApiError {
    let message = errors
        .errors()
        .first()
        .map(|e| e.msg.clone())
        .unwrap_or_else(|| "Validation failed".to_string());
    ApiError::validation_error(message, errors)
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(format!("Not found: {}", what)),
            StoreError::Contention { .. } => {
                tracing::warn!("Store contention: {}", err);
                ApiError::conflict("The resource is being modified concurrently, please retry")
            }
            StoreError::UniqueViolation { .. } => {
                tracing::warn!("Unexpected unique violation: {}", err);
                ApiError::conflict("Resource already exists")
            }
            StoreError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error("Server Error")
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Malformed => ApiError::unauthorized("Token is not valid"),
            other => {
                tracing::error!("Token error: {}", other);
                ApiError::internal_server_error("Server Error")
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(errors) => validation(errors),
            UserError::AlreadyExists => {
                validation(FieldErrors::single("email", "User already exists"))
            }
            UserError::InvalidCredentials => ApiError::unauthorized("Invalid Credentials"),
            UserError::NotFound => ApiError::not_found("User not found"),
            UserError::Token(e) => e.into(),
            UserError::Store(e) => e.into(),
            UserError::Password(e) => {
                tracing::error!("Password error: {}", e);
                ApiError::internal_server_error("Server Error")
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation(errors) => validation(errors),
            ProfileError::NotFound
            | ProfileError::ExperienceNotFound
            | ProfileError::EducationNotFound => ApiError::not_found(err.to_string()),
            ProfileError::Store(e) => e.into(),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Validation(errors) => validation(errors),
            PostError::NotFound | PostError::CommentNotFound | PostError::UserNotFound => {
                ApiError::not_found(err.to_string())
            }
            PostError::Forbidden => ApiError::forbidden(err.to_string()),
            PostError::AlreadyLiked | PostError::NotLiked => ApiError::bad_request(err.to_string()),
            PostError::Store(e) => e.into(),
        }
    }
}

impl From<GithubError> for ApiError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::InvalidUsername | GithubError::NotFound => {
                ApiError::not_found("No GitHub profile found")
            }
            other => {
                tracing::error!("GitHub lookup failed: {}", other);
                ApiError::bad_gateway("GitHub is unavailable")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_body_lists_field_errors() {
        let mut errors = FieldErrors::new();
        errors.push("name", "Name is required");
        errors.push("email", "Please include a valid email");
        let err: ApiError = UserError::Validation(errors).into();

        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "Name is required");
        assert_eq!(body["errors"][1]["field"], "email");
        assert_eq!(body["errors"][1]["msg"], "Please include a valid email");
    }

    #[test]
    fn duplicate_email_is_a_field_error() {
        let err: ApiError = UserError::AlreadyExists.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["errors"][0]["msg"], "User already exists");
    }

    #[test]
    fn status_mapping() {
        let cases: Vec<(ApiError, u16)> = vec![
            (UserError::InvalidCredentials.into(), 401),
            (TokenError::Expired.into(), 401),
            (PostError::Forbidden.into(), 403),
            (PostError::AlreadyLiked.into(), 400),
            (PostError::NotLiked.into(), 400),
            (PostError::CommentNotFound.into(), 404),
            (ProfileError::NotFound.into(), 404),
            (GithubError::NotFound.into(), 404),
            (GithubError::Upstream(reqwest::StatusCode::BAD_GATEWAY).into(), 502),
            (
                StoreError::Contention {
                    collection: "posts".into(),
                    id: uuid::Uuid::nil(),
                }
                .into(),
                409,
            ),
            (TokenError::Signing("x".into()).into(), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn non_validation_errors_have_empty_error_list() {
        let body = ApiError::not_found("Post not found").to_json();
        assert_eq!(body["error"], "Post not found");
        assert_eq!(body["errors"], json!([]));
    }
}
