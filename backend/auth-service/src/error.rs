use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("No verification code found")]
    OtpNotFound,

    #[error("Verification code has expired")]
    OtpExpired,

    #[error("Verification code is incorrect")]
    OtpMismatch,

    #[error("Verification code has already been used")]
    OtpAlreadyConsumed,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("OAuth sign-in is not configured")]
    OauthUnavailable,

    #[error("OAuth sign-in failed: {0}")]
    Oauth(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code carried in every error body.
    /// Clients branch on these, so they never change.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Database(_) | AuthError::Redis(_) => "internal_error",
            AuthError::Validation(_) => "validation_error",
            AuthError::Conflict(_) => "conflict",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::EmailNotVerified => "email_not_verified",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Forbidden => "forbidden",
            AuthError::NotFound(_) => "not_found",
            AuthError::OtpNotFound => "otp_not_found",
            AuthError::OtpExpired => "otp_expired",
            AuthError::OtpMismatch => "otp_mismatch",
            AuthError::OtpAlreadyConsumed => "otp_already_consumed",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::RateLimited => "rate_limited",
            AuthError::OauthUnavailable => "oauth_unavailable",
            AuthError::Oauth(_) => "oauth_failed",
            AuthError::Email(_) | AuthError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error_code: String,
    message: String,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Database(_) | AuthError::Redis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::OtpNotFound
            | AuthError::OtpExpired
            | AuthError::OtpMismatch
            | AuthError::OtpAlreadyConsumed => StatusCode::BAD_REQUEST,
            AuthError::TokenInvalid | AuthError::TokenExpired | AuthError::TokenRevoked => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::OauthUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Oauth(_) => StatusCode::UNAUTHORIZED,
            AuthError::Email(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        // Internal failures keep their detail in the logs, not the body.
        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status_code).json(ErrorResponse {
            error_code: self.error_code().to_string(),
            message,
        })
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::Validation(errors.to_string())
    }
}

impl From<lettre::error::Error> for AuthError {
    fn from(error: lettre::error::Error) -> Self {
        AuthError::Email(error.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AuthError {
    fn from(error: lettre::transport::smtp::Error) -> Self {
        AuthError::Email(error.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        AuthError::Oauth(error.to_string())
    }
}

/// Map a unique-constraint violation to Conflict, leaving every other
/// database error untouched. Registration races resolve through this:
/// the losing insert surfaces as 409.
pub fn conflict_on_unique(err: sqlx::Error, what: &str) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(what.to_string())
        }
        _ => AuthError::Database(err),
    }
}
