/// Stateless access tokens, HS256-signed.
///
/// Only access tokens are JWTs. Refresh tokens are opaque random values
/// tracked in the database, so revocation applies to them alone; an access
/// token stays valid until its short expiry.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Account role at issue time
    pub role: Role,
    /// Session ID, stable across refresh rotations
    pub sid: String,
    /// Unique token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Always "access"
    pub token_type: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid)
    }

    pub fn session_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sid).map_err(|_| AuthError::TokenInvalid)
    }
}

/// Sign a new access token for a user session.
pub fn encode_access_token(
    secret: &str,
    user_id: Uuid,
    role: Role,
    session_id: Uuid,
    ttl_secs: i64,
) -> Result<String> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        role,
        sid: session_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        token_type: "access".to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {}", e)))
}

/// Validate signature and expiry, returning the claims.
/// Expired tokens and tampered tokens fail with distinct errors.
pub fn validate_access_token(secret: &str, token: &str) -> Result<AccessClaims> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;

    if data.claims.token_type != "access" {
        return Err(AuthError::TokenInvalid);
    }

    Ok(data.claims)
}
