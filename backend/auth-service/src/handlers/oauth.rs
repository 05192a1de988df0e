/// Google OAuth sign-in handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/v1/auth/google
///
/// Redirects the browser to Google's consent screen.
pub async fn google_login(state: web::Data<AppState>) -> Result<HttpResponse> {
    let url = state.auth.google_login_url().await?;

    Ok(HttpResponse::TemporaryRedirect()
        .append_header(("Location", url))
        .finish())
}

/// GET /api/v1/auth/google/callback
pub async fn google_callback(
    state: web::Data<AppState>,
    query: web::Query<GoogleCallbackQuery>,
) -> Result<HttpResponse> {
    if let Some(provider_error) = &query.error {
        return Err(AuthError::Oauth(format!(
            "provider returned {provider_error}"
        )));
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AuthError::Oauth("missing authorization code".to_string()))?;
    let oauth_state = query
        .state
        .as_deref()
        .ok_or_else(|| AuthError::Oauth("missing state parameter".to_string()))?;

    let pair = state.auth.google_callback(code, oauth_state).await?;

    metrics::inc_logins();

    Ok(HttpResponse::Ok().json(pair))
}
