/// Bearer token authentication for protected routes
///
/// Handlers take an `AuthenticatedUser` argument to require a valid
/// access token; extraction failures surface as the usual error body.
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Role;
use crate::AppState;

/// Identity established from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AuthError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AuthError::Internal("application state not configured".to_string()))?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Unauthorized)?;

    let claims = state.auth.tokens().validate_access(token)?;

    Ok(AuthenticatedUser {
        user_id: claims.user_id()?,
        session_id: claims.session_id()?,
        role: claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_user_is_cloneable() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role: Role::User,
        };
        let copy = user.clone();
        assert_eq!(copy.user_id, user.user_id);
        assert_eq!(copy.session_id, user.session_id);
    }
}
