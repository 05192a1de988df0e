/// Password reset and change handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetVerifyRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetCompleteRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(equal = 6))]
    pub code: String,

    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/v1/auth/passwords/reset
///
/// Accepted regardless of whether the address is registered.
pub async fn request_password_reset(
    state: web::Data<AppState>,
    payload: web::Json<ResetRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    state
        .auth
        .request_password_reset(payload.email.trim())
        .await?;

    Ok(HttpResponse::Accepted().json(MessageResponse {
        message: "If the address is registered, a reset code has been sent.".to_string(),
    }))
}

/// POST /api/v1/auth/passwords/reset/verify
pub async fn verify_password_reset(
    state: web::Data<AppState>,
    payload: web::Json<ResetVerifyRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    state
        .auth
        .verify_password_reset(payload.email.trim(), payload.code.trim())
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Code is valid".to_string(),
    }))
}

/// POST /api/v1/auth/passwords/reset/complete
pub async fn complete_password_reset(
    state: web::Data<AppState>,
    payload: web::Json<ResetCompleteRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    state
        .auth
        .complete_password_reset(
            payload.email.trim(),
            payload.code.trim(),
            &payload.new_password,
        )
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password has been reset. Sign in with your new password.".to_string(),
    }))
}

/// POST /api/v1/auth/passwords/change
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    state
        .auth
        .change_password(
            user.user_id,
            user.session_id,
            &payload.old_password,
            &payload.new_password,
        )
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password changed. Other sessions have been signed out.".to_string(),
    }))
}
