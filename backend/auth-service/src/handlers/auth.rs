/// Registration, verification and session handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::metrics;
use crate::middleware::AuthenticatedUser;
use crate::models::UserResponse;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/v1/auth/register
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    let user = state
        .auth
        .register(
            payload.username.trim(),
            payload.email.trim(),
            &payload.password,
        )
        .await?;

    metrics::inc_registrations();

    Ok(HttpResponse::Created().json(RegisterResponse {
        id: user.id,
        email: user.email,
        message: "Account created. Check your inbox for the verification code.".to_string(),
    }))
}

/// POST /api/v1/auth/verification
pub async fn verify_email(
    state: web::Data<AppState>,
    payload: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    let user = state
        .auth
        .verify_email(payload.email.trim(), payload.code.trim())
        .await?;

    metrics::inc_verifications();

    Ok(HttpResponse::Ok().json(VerifyEmailResponse {
        message: "Email verified".to_string(),
        user,
    }))
}

/// POST /api/v1/auth/verification/resend
pub async fn resend_verification(
    state: web::Data<AppState>,
    payload: web::Json<ResendVerificationRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    state.auth.resend_verification(payload.email.trim()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "If the address is registered and unverified, a new code has been sent."
            .to_string(),
    }))
}

/// POST /api/v1/auth/token
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let pair = state
        .auth
        .login(
            payload.username.trim(),
            &payload.password,
            payload.device_id.as_deref(),
        )
        .await?;

    metrics::inc_logins();

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /api/v1/auth/token/refresh
pub async fn refresh_token(
    state: web::Data<AppState>,
    payload: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    let pair = state.auth.refresh(payload.refresh_token.trim()).await?;

    metrics::inc_token_refreshes();

    Ok(HttpResponse::Ok().json(pair))
}

/// GET /api/v1/auth/me
pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let account = state.auth.me(user.user_id).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    state: web::Data<AppState>,
    payload: web::Json<LogoutRequest>,
) -> Result<HttpResponse> {
    state.auth.logout(payload.refresh_token.trim()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/auth/logout/all
pub async fn logout_all(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    state.auth.logout_all(user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
